//! Text Analysis
//!
//! Deterministic, network-free heuristics over already-fetched text
//! (search snippets, model output). Nothing here touches the language
//! model or any provider.
//!
//! Salience ranking, used by both [`summarize`] and [`extract_key_points`],
//! scores each sentence as `0.6 * keyword_density + 0.4 * position`, where
//! keyword density is how strongly the sentence's content words recur across
//! the whole text, and position favours earlier sentences. Ties keep
//! document order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::error::AnalysisError;

const DENSITY_WEIGHT: f32 = 0.6;
const POSITION_WEIGHT: f32 = 0.4;

/// Characters before a chunk boundary searched for a sentence end
const BOUNDARY_WINDOW: usize = 100;

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "however", "i", "if", "in", "into", "is", "it", "its", "may", "more",
    "most", "no", "not", "of", "on", "or", "our", "over", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "under", "up", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "why", "will", "with", "would", "you", "your",
];

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?\n]+[.!?]*").expect("valid sentence regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s.,!?;:\-()]").expect("valid symbol regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
    })
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("valid url regex"))
}

// =============================================================================
// SENTENCES AND SALIENCE
// =============================================================================

/// Split text into trimmed sentences, dropping fragments with fewer than two
/// letters and leading list bullets.
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_re()
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|s| s.chars().filter(|c| c.is_alphabetic()).count() >= 2)
        .collect()
}

/// Lowercased words of three or more characters that are not stopwords
pub(crate) fn content_words(sentence: &str) -> impl Iterator<Item = String> + '_ {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

/// Sentence indices ordered by descending salience, ties by document order.
fn rank_sentences(sentences: &[String]) -> Vec<usize> {
    let mut frequency: HashMap<String, usize> = HashMap::new();
    for sentence in sentences {
        for word in content_words(sentence) {
            *frequency.entry(word).or_insert(0) += 1;
        }
    }

    let densities: Vec<f32> = sentences
        .iter()
        .map(|sentence| {
            let total = sentence.split_whitespace().count().max(1);
            let weight: usize = content_words(sentence)
                .map(|w| frequency.get(&w).copied().unwrap_or(0))
                .sum();
            weight as f32 / total as f32
        })
        .collect();
    let max_density = densities.iter().copied().fold(0.0_f32, f32::max);

    let n = sentences.len() as f32;
    let scores: Vec<f32> = densities
        .iter()
        .enumerate()
        .map(|(idx, density)| {
            let density = if max_density > 0.0 {
                density / max_density
            } else {
                0.0
            };
            let position = 1.0 - idx as f32 / n;
            DENSITY_WEIGHT * density + POSITION_WEIGHT * position
        })
        .collect();

    let mut order: Vec<usize> = (0..sentences.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

// =============================================================================
// KEY POINTS AND SUMMARY
// =============================================================================

/// At most `max_points` sentences, most salient first.
///
/// Case-insensitive duplicates are dropped. Blank text yields nothing.
pub fn extract_key_points(text: &str, max_points: usize) -> Vec<String> {
    if max_points == 0 {
        return Vec::new();
    }

    let sentences = split_sentences(text);
    let mut seen = HashSet::new();
    rank_sentences(&sentences)
        .into_iter()
        .map(|idx| sentences[idx].clone())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(max_points)
        .collect()
}

/// Extractive summary of at most `target_length` characters.
///
/// Text that already fits is returned whitespace-normalized. Otherwise the
/// most salient sentences that fit are kept in document order; if not even
/// one fits, the text is cut at a word boundary and marked with `...`.
/// Targets too short for the marker get a bare character cut.
pub fn summarize(text: &str, target_length: usize) -> Result<String, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let normalized = normalize_whitespace(text);
    if normalized.chars().count() <= target_length {
        return Ok(normalized);
    }

    let sentences = split_sentences(&normalized);
    let mut selected = Vec::new();
    let mut used = 0;
    for idx in rank_sentences(&sentences) {
        let len = sentences[idx].chars().count();
        let needed = if selected.is_empty() { len } else { len + 1 };
        if used + needed <= target_length {
            used += needed;
            selected.push(idx);
        }
    }

    if selected.is_empty() {
        return Ok(truncate_at_word(&normalized, target_length));
    }

    selected.sort_unstable();
    Ok(selected
        .into_iter()
        .map(|idx| sentences[idx].as_str())
        .collect::<Vec<_>>()
        .join(" "))
}

fn truncate_at_word(text: &str, target_length: usize) -> String {
    if target_length <= 3 {
        return text.chars().take(target_length).collect();
    }
    let budget = target_length - 3;
    let cut: String = text.chars().take(budget).collect();
    let cut = match cut.rfind(' ') {
        Some(pos) if pos > 0 => cut[..pos].trim_end().to_string(),
        _ => cut,
    };
    format!("{}...", cut)
}

fn normalize_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text.trim(), " ").into_owned()
}

// =============================================================================
// CLEANING AND CHUNKING
// =============================================================================

/// Collapse whitespace and strip symbols other than basic punctuation.
pub fn clean_text(text: &str) -> String {
    let collapsed = whitespace_re().replace_all(text, " ");
    symbol_re().replace_all(&collapsed, "").trim().to_string()
}

/// Split text into chunks of at most `chunk_size` characters overlapping by
/// `overlap` characters.
///
/// A chunk that is not the last one ends at the latest sentence terminator
/// within its final 100 characters, when there is one.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(1);
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }
    let overlap = overlap.min(chunk_size - 1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());

        if end < chars.len() {
            let window_start = end.saturating_sub(BOUNDARY_WINDOW).max(start);
            if let Some(pos) = (window_start..end)
                .rev()
                .find(|&i| matches!(chars[i], '.' | '!' | '?'))
            {
                if pos > start {
                    end = pos + 1;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

// =============================================================================
// SENTIMENT
// =============================================================================

const POSITIVE: &[&str] = &[
    "advantage", "beneficial", "benefit", "benefits", "best", "better", "breakthrough",
    "effective", "efficient", "excellent", "fast", "gain", "gains", "good", "great", "growth",
    "happy", "improve", "improved", "improvement", "innovative", "love", "positive", "promising",
    "reliable", "robust", "safe", "strong", "success", "successful", "win",
];

const NEGATIVE: &[&str] = &[
    "bad", "concern", "concerns", "crisis", "dangerous", "decline", "fail", "failed", "failure",
    "harm", "harmful", "hate", "issue", "issues", "loss", "negative", "poor", "problem",
    "problems", "risk", "risks", "sad", "slow", "terrible", "threat", "unreliable", "unsafe",
    "weak", "worse", "worst",
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "without", "hardly", "isn't", "doesn't", "don't", "didn't", "wasn't",
    "aren't", "cannot", "won't",
];

/// Negations reach this many words ahead
const NEGATION_SCOPE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// In `[0, 1]`
    pub confidence: f32,
}

/// Lexicon-based sentiment with simple negation handling.
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let words: Vec<String> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    if words.is_empty() {
        return Sentiment {
            label: SentimentLabel::Neutral,
            confidence: 0.0,
        };
    }

    let mut positive = 0u32;
    let mut negative = 0u32;
    for (idx, word) in words.iter().enumerate() {
        let is_positive = POSITIVE.contains(&word.as_str());
        let is_negative = NEGATIVE.contains(&word.as_str());
        if !is_positive && !is_negative {
            continue;
        }

        let negated = words[idx.saturating_sub(NEGATION_SCOPE)..idx]
            .iter()
            .any(|w| NEGATIONS.contains(&w.as_str()));
        if is_positive != negated {
            positive += 1;
        } else {
            negative += 1;
        }
    }

    let hits = positive + negative;
    if hits == 0 {
        return Sentiment {
            label: SentimentLabel::Neutral,
            confidence: 0.5,
        };
    }

    let polarity = (positive as f32 - negative as f32) / hits as f32;
    let (label, confidence) = if polarity > 0.2 {
        (SentimentLabel::Positive, 0.5 + 0.5 * polarity)
    } else if polarity < -0.2 {
        (SentimentLabel::Negative, 0.5 + 0.5 * polarity.abs())
    } else {
        (SentimentLabel::Neutral, 1.0 - polarity.abs())
    };

    Sentiment {
        label,
        confidence: confidence.clamp(0.0, 1.0),
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
}

const TITLES: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "sir"];

const PERSON_VERBS: &[&str] = &[
    "said", "says", "argued", "argues", "wrote", "writes", "explained", "told", "believes",
];

const ORG_SUFFIXES: &[&str] = &[
    "inc", "corp", "corporation", "ltd", "llc", "company", "university", "institute",
    "foundation", "association", "agency", "group", "labs", "technologies", "systems", "bank",
    "council", "committee", "department", "ministry", "organization", "organisation",
];

const NON_ORG_ACRONYMS: &[&str] = &[
    "AI", "API", "CEO", "CTO", "CPU", "GPU", "HTML", "HTTP", "JSON", "LLM", "ML", "OK", "PDF",
    "PhD", "SQL", "TV", "URL", "USD",
];

const LOCATION_SUFFIXES: &[&str] = &[
    "city", "county", "river", "mountain", "mountains", "lake", "island", "islands", "ocean",
    "sea", "valley", "street", "state", "province", "republic", "kingdom", "bay",
];

const LOCATIONS: &[&str] = &[
    "africa", "america", "asia", "australia", "berlin", "beijing", "brazil", "california",
    "canada", "china", "europe", "france", "germany", "india", "italy", "japan", "korea",
    "london", "mexico", "moscow", "new york", "paris", "russia", "san francisco", "seoul",
    "spain", "sydney", "tokyo", "uk", "united kingdom", "united states", "usa", "washington",
];

const LOCATION_PREPOSITIONS: &[&str] = &["in", "near", "across", "throughout"];

const CONNECTORS: &[&str] = &["of", "and", "de"];

struct Token<'a> {
    word: &'a str,
    /// Followed by punctuation that ends a name run
    breaks: bool,
    /// First word of a sentence
    initial: bool,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut initial = true;
    for raw in text.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '&');
        if word.is_empty() {
            continue;
        }
        let ends_sentence =
            raw.ends_with(['.', '!', '?']) && !TITLES.contains(&word.to_lowercase().as_str());
        let breaks = ends_sentence || raw.ends_with([',', ';', ':', ')', '"', '\'']);
        tokens.push(Token {
            word,
            breaks,
            initial,
        });
        initial = ends_sentence;
    }
    tokens
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_uppercase())
}

fn is_acronym(word: &str) -> bool {
    let len = word.chars().count();
    (2..=6).contains(&len)
        && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && word.chars().any(|c| c.is_ascii_uppercase())
}

/// Named entities found by capitalization heuristics, plus e-mail addresses
/// and URLs (typed `other`).
///
/// Surface forms that differ only by case collapse when their type matches;
/// first appearance wins.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut seen: HashSet<(String, EntityType)> = HashSet::new();
    let mut push = |text: String, kind: EntityType| {
        if seen.insert((text.to_lowercase(), kind)) {
            entities.push(Entity { text, kind });
        }
    };

    for m in url_re().find_iter(text).chain(email_re().find_iter(text)) {
        push(
            m.as_str().trim_end_matches(['.', ',', ')']).to_string(),
            EntityType::Other,
        );
    }
    let prose = email_re().replace_all(&url_re().replace_all(text, " "), " ").into_owned();

    let tokens = tokenize(&prose);
    let mut i = 0;
    while i < tokens.len() {
        if !is_capitalized(tokens[i].word) {
            i += 1;
            continue;
        }

        let start = i;
        let mut end = i + 1;
        if !tokens[i].breaks {
            while end < tokens.len() {
                let word = tokens[end].word;
                let joins = is_capitalized(word)
                    || (CONNECTORS.contains(&word)
                        && !tokens[end].breaks
                        && tokens.get(end + 1).is_some_and(|t| is_capitalized(t.word)));
                if !joins {
                    break;
                }
                end += 1;
                if tokens[end - 1].breaks {
                    break;
                }
            }
        }
        i = end;

        let mut words: Vec<&str> = tokens[start..end].iter().map(|t| t.word).collect();
        let mut initial = tokens[start].initial;

        let mut titled = false;
        while let Some(first) = words.first() {
            let lower = first.to_lowercase();
            if TITLES.contains(&lower.as_str()) {
                titled = true;
                words.remove(0);
            } else if STOPWORDS.contains(&lower.as_str()) {
                words.remove(0);
                initial = false;
            } else {
                break;
            }
        }
        if words.is_empty() || (words.len() == 1 && NON_ORG_ACRONYMS.contains(&words[0])) {
            continue;
        }

        let previous = start
            .checked_sub(1)
            .map(|p| tokens[p].word.to_lowercase())
            .unwrap_or_default();
        let next = tokens
            .get(end)
            .map(|t| t.word.to_lowercase())
            .unwrap_or_default();

        let kind = classify(&words, titled, &previous, &next);
        // a lone capitalized sentence opener is usually just a word
        if kind == EntityType::Other && initial && words.len() == 1 {
            continue;
        }
        push(words.join(" "), kind);
    }

    entities
}

fn classify(words: &[&str], titled: bool, previous: &str, next: &str) -> EntityType {
    let phrase = words.join(" ").to_lowercase();
    let last = words.last().map(|w| w.to_lowercase()).unwrap_or_default();

    if titled {
        return EntityType::Person;
    }
    if ORG_SUFFIXES.contains(&last.as_str()) {
        return EntityType::Organization;
    }
    if words.len() == 1 && is_acronym(words[0]) {
        if LOCATIONS.contains(&phrase.as_str()) {
            return EntityType::Location;
        }
        return EntityType::Organization;
    }
    if LOCATIONS.contains(&phrase.as_str())
        || LOCATION_SUFFIXES.contains(&last.as_str())
        || LOCATION_PREPOSITIONS.contains(&previous)
    {
        return EntityType::Location;
    }
    if PERSON_VERBS.contains(&next) && words.len() >= 2 {
        return EntityType::Person;
    }
    EntityType::Other
}
