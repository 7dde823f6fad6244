//! Prompt templates for the model-backed workflow nodes
//!
//! Search results are rendered as a numbered list with URLs so the model can
//! cite them.

use chrono::Utc;

use crate::state::{ResearchState, SearchResult};

/// Prompt templates for the research workflow
pub struct ResearchPrompts;

impl ResearchPrompts {
    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Interpret the gathered search results.
    pub fn analysis(state: &ResearchState) -> String {
        format!(
            r#"For context, today's date is {date}.

## Research question
{query}

## Search results
{results}

## Key points so far
{insights}

Analyze these results. Identify the main findings, where sources agree or
disagree, and what remains uncertain. Cite sources by URL."#,
            date = Self::current_date(),
            query = state.query,
            results = format_results(&state.search_results),
            insights = format_list(&state.key_insights),
        )
    }

    /// Turn the analysis into the final answer.
    pub fn synthesis(state: &ResearchState) -> String {
        format!(
            r#"## Research question
{query}

## Analysis
{analysis}

## Sources
{sources}

Write a clear, well-structured answer to the research question based on the
analysis above. Open with a short overview, then cover the key findings.
Reference the sources by URL. Do not introduce claims the analysis does not
support."#,
            query = state.query,
            analysis = state.analysis_text(),
            sources = format_list(&state.sources),
        )
    }

    /// Ask for one follow-up search query.
    pub fn refinement(state: &ResearchState) -> String {
        format!(
            r#"## Research question
{query}

## Queries already searched
{executed}

## Key points so far
{insights}

Suggest ONE new web search query that would fill the biggest gap in what is
known so far. Reply with the query only, on a single line."#,
            query = state.query,
            executed = format_list(&state.executed_queries),
            insights = format_list(&state.key_insights),
        )
    }
}

fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "(no results)".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. **{}**\n   URL: {}\n   {}", i + 1, r.title, r.url, r.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Depth, ProviderKind, StateFragment};

    fn state_with_result() -> ResearchState {
        ResearchState::new("rust safety", Depth::Basic).merge(
            StateFragment::new().with_search_results(vec![SearchResult::new(
                "Rust",
                "https://rust-lang.org",
                "Memory safety without GC.",
                ProviderKind::Tavily,
                0,
            )]),
        )
    }

    #[test]
    fn test_analysis_prompt_lists_results() {
        let prompt = ResearchPrompts::analysis(&state_with_result());
        assert!(prompt.contains("rust safety"));
        assert!(prompt.contains("1. **Rust**"));
        assert!(prompt.contains("URL: https://rust-lang.org"));
    }

    #[test]
    fn test_synthesis_prompt_lists_sources() {
        let prompt = ResearchPrompts::synthesis(&state_with_result());
        assert!(prompt.contains("- https://rust-lang.org"));
    }

    #[test]
    fn test_empty_sections() {
        let state = ResearchState::new("q", Depth::Basic);
        assert!(ResearchPrompts::analysis(&state).contains("(no results)"));
        assert!(ResearchPrompts::refinement(&state).contains("(none)"));
    }
}
