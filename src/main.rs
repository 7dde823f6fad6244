//! # AI Research Workflow CLI
//!
//! Runs one research query through the workflow and prints the result.
//!
//! ```bash
//! cargo run -- --depth deep "How does Rust prevent data races?"
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ai_research_workflow::{Config, ResearchOutcome, ResearchStatus, WorkflowEngine};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "ai-research-workflow",
    version,
    about = "Research a topic through a search, analysis and synthesis workflow",
    long_about = r#"
AI Research Workflow

Runs a query through a small research graph:
  1. Analyze the query
  2. Search the web (Tavily, Serper, DuckDuckGo with fallback)
  3. Analyze and synthesize the results with a local LLM
  4. Validate the answer and suggest follow-up questions

PREREQUISITES:
  1. Install Ollama: https://ollama.ai
  2. Pull a model: ollama pull llama3.2
  3. Start Ollama: ollama serve
  4. Optional: set TAVILY_API_KEY and/or SERPER_API_KEY

EXAMPLES:
  ai-research-workflow "What are the latest developments in Rust async?"
  ai-research-workflow --depth deep "Compare tokio and smol"
  ai-research-workflow --json --depth basic "Rust web frameworks"
"#
)]
struct Args {
    #[arg(help = "The topic to research", value_name = "QUERY")]
    query: String,

    #[arg(
        short = 'd',
        long = "depth",
        help = "Research depth: basic, standard or deep",
        default_value = "standard"
    )]
    depth: String,

    #[arg(
        short = 'm',
        long = "model",
        help = "Ollama model to use",
        env = "OLLAMA_MODEL"
    )]
    model: Option<String>,

    #[arg(long = "json", help = "Print the full result as JSON")]
    json: bool,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    verbose: bool,
}

// =============================================================================
// MAIN
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }

    init_logging(args.verbose || config.debug, &config.log_level)?;
    config.validate()?;

    info!(
        model = %config.model,
        host = %config.ollama_host,
        providers = ?config.enabled_providers(),
        "Configuration loaded"
    );

    let engine = WorkflowEngine::from_config(&config);
    let outcome = engine.research_topic(&args.query, &args.depth).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_report(&outcome);
    }

    if outcome.status == ResearchStatus::Failed {
        let message = outcome
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        error!(error = %message, "Research failed");

        if message.to_lowercase().contains("connection refused") {
            eprintln!("\nTip: make sure Ollama is running:\n   ollama serve");
        } else if message.contains("not found") {
            eprintln!("\nTip: make sure the model is installed:\n   ollama pull {}", config.model);
        }

        anyhow::bail!("research failed: {}", message);
    }

    Ok(())
}

fn print_report(outcome: &ResearchOutcome) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("RESEARCH RESULTS ({})", outcome.status);
    println!("{}\n", rule);

    if !outcome.analysis.is_empty() {
        println!("{}\n", outcome.analysis);
    }

    print_section("Key insights", &outcome.key_insights);
    print_section("Sources", &outcome.sources);
    print_section("Follow-up questions", &outcome.follow_up_questions);
    print_section("Notes", &outcome.notes);

    if let Some(error) = &outcome.error {
        println!("Error: {}\n", error);
    }

    println!(
        "Run {} | {} steps | {:.1}s",
        outcome.run_id,
        outcome.iterations,
        (outcome.finished_at - outcome.started_at).num_milliseconds() as f64 / 1000.0
    );
    println!("{}", rule);
}

fn print_section(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  - {}", item);
    }
    println!();
}

// =============================================================================
// LOGGING
// =============================================================================
/// `RUST_LOG` wins when set; otherwise `--verbose` picks DEBUG over the
/// configured level.
fn init_logging(verbose: bool, default_level: &str) -> Result<()> {
    let fallback = if verbose { "debug" } else { default_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
