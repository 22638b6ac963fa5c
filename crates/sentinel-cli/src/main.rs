//! Command-line interface for sentinel

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use sentinel_engine::prompts::PromptLibrary;
use sentinel_engine::{
    AnalyzeOutcome, AnalyzeRequest, ConversationTurn, EntityResolver, Holding, LiveMarketData, Orchestrator,
    SentinelConfig, new_trace_id,
};
use sentinel_llm::providers::OpenAIProvider;
use sentinel_utils::LogFormat;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(about = "Multi-analyst stock research from the command line", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer one query and print the JSON response
    Ask {
        /// Free-text question, e.g. "analyze NVDA"
        #[arg(required = true)]
        query: Vec<String>,

        /// Analyze this ticker regardless of what the query mentions
        #[arg(long)]
        ticker: Option<String>,

        /// JSON file with a list of holdings
        #[arg(long)]
        portfolio: Option<PathBuf>,

        /// Print server-push events as they happen
        #[arg(long)]
        stream: bool,

        /// Free-text supervisor output instead of a JSON decision
        #[arg(long)]
        legacy: bool,
    },

    /// Show how a query would be routed
    Resolve {
        #[arg(required = true)]
        query: Vec<String>,

        #[arg(long)]
        portfolio: Option<PathBuf>,

        /// Deterministic matchers only, no model fallback
        #[arg(long)]
        offline: bool,
    },

    /// Interactive session that keeps conversation history
    Chat {
        #[arg(long)]
        portfolio: Option<PathBuf>,
    },
}

fn load_portfolio(path: Option<&Path>) -> anyhow::Result<Vec<Holding>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing holdings in {}", path.display()))
}

fn orchestrator(legacy: bool) -> anyhow::Result<Orchestrator> {
    let mut config = SentinelConfig::from_env()?;
    if legacy {
        config.enable_structured_outputs = false;
    }
    let data = Arc::new(LiveMarketData::new(&config)?);
    let provider = Arc::new(OpenAIProvider::from_env()?);
    Ok(Orchestrator::new(provider, data, config)?)
}

async fn ask(request: AnalyzeRequest, stream: bool, legacy: bool) -> anyhow::Result<()> {
    let orchestrator = Arc::new(orchestrator(legacy)?);
    let trace_id = new_trace_id();
    info!(trace_id = %trace_id, "request started");

    if stream {
        let mut events = Box::pin(orchestrator.analyze_stream(request, trace_id));
        let mut stdout = tokio::io::stdout();
        while let Some(event) = events.next().await {
            stdout.write_all(event.to_sse()?.as_bytes()).await?;
            stdout.flush().await?;
        }
        return Ok(());
    }

    let outcome = orchestrator.analyze(&request, &trace_id).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn resolve(query: &str, holdings: &[Holding], offline: bool) -> anyhow::Result<()> {
    let resolution = if offline {
        EntityResolver::new(None, Arc::new(PromptLibrary::new()?))?
            .resolve(query, holdings)
            .await
    } else {
        orchestrator(false)?.resolver().resolve(query, holdings).await
    };
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

/// Text shown for one answer in the chat session
fn render(outcome: &AnalyzeOutcome) -> String {
    match outcome {
        AnalyzeOutcome::Holdings(h) => format!(
            "{} ({}): {} shares @ ${:.2}, value ${:.2}, P&L ${:.2} ({:.2}%)",
            h.company_name,
            h.ticker,
            h.shares_held,
            h.current_price,
            h.total_value,
            h.unrealized_pl_dollars,
            h.unrealized_pl_percent
        ),
        AnalyzeOutcome::Analysis(r) => match (&r.ticker, &r.recommendation) {
            (Some(ticker), Some(action)) => format!(
                "{ticker}: {action} ({})\n\n{}",
                r.confidence.as_deref().unwrap_or("N/A"),
                r.synthesis
            ),
            _ => r.synthesis.clone(),
        },
    }
}

async fn chat(holdings: Vec<Holding>) -> anyhow::Result<()> {
    let orchestrator = orchestrator(false)?;
    let mut history: Vec<ConversationTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Sentinel chat. Type 'exit' to quit.");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        let request = AnalyzeRequest::new(query)
            .with_portfolio(holdings.clone())
            .with_history(history.clone());
        let outcome = orchestrator.analyze(&request, &new_trace_id()).await;
        let answer = render(&outcome);
        println!("{answer}\n");

        history.push(ConversationTurn::user(query));
        history.push(ConversationTurn::assistant(answer));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    sentinel_utils::init_tracing_with(if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    match cli.command {
        Command::Ask {
            query,
            ticker,
            portfolio,
            stream,
            legacy,
        } => {
            let mut request = AnalyzeRequest::new(query.join(" ")).with_portfolio(load_portfolio(portfolio.as_deref())?);
            request.ticker = ticker;
            ask(request, stream, legacy).await
        }
        Command::Resolve {
            query,
            portfolio,
            offline,
        } => resolve(&query.join(" "), &load_portfolio(portfolio.as_deref())?, offline).await,
        Command::Chat { portfolio } => chat(load_portfolio(portfolio.as_deref())?).await,
    }
}
