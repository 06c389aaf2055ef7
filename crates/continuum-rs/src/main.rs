//! Command-line client for Continuum memory and sessions.

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use continuum_rs::config::ContinuumConfig;
use continuum_rs::memory::{MemoryContext, MemoryKind, SearchMode, summarize};
use continuum_rs::session::{
    BridgeNotes, SessionError, client_from_config, session_from_config,
};
use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable overriding the configured agent id.
const AGENT_ID_ENV: &str = "CONTINUUM_AGENT_ID";
/// Longest body echoed back after `remember`.
const ECHO_CHARS: usize = 240;

/// Command-line options for the Continuum client.
#[derive(Parser, Debug)]
#[command(name = "continuum", version)]
struct Cli {
    /// Optional path to a continuum.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Agent id whose namespace to use (overrides CONTINUUM_AGENT_ID)
    #[arg(long, global = true)]
    agent: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the memories table and its indexes
    Schema {
        /// Embedding dimensionality; defaults to embedding.dimensions
        #[arg(long)]
        dimensions: Option<usize>,
    },
    /// Store raw text with optional JSON metadata
    Store {
        text: String,
        /// Metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Search memories in the agent namespace
    Search {
        /// Query text; not needed for chronological mode
        #[arg(default_value = "")]
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// vector, chronological or hybrid
        #[arg(long, default_value = "vector", value_parser = parse_mode)]
        mode: SearchMode,
    },
    /// Fetch one memory by id
    Get { id: String },
    /// Find memories close to an existing one
    Related {
        id: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long, default_value_t = 0.0)]
        min_similarity: f64,
    },
    /// Show namespace statistics
    Stats,
    /// Probe the embedding provider and vector store
    Health,
    /// Load bridges and standing categories for a new session
    Initialize,
    /// Retrieve memories relevant to a query
    Retrieve {
        query: String,
        #[arg(long)]
        min_similarity: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Format and store an observation
    Remember {
        content: String,
        /// Memory type (preference, technical, decision, project, ...)
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        topic: String,
        /// Context entry as key=value; repeatable
        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,
    },
    /// Close a conversation by writing a bridge
    Close {
        conversation_id: String,
        #[arg(long)]
        status: String,
        #[arg(long)]
        momentum: Option<String>,
        #[arg(long)]
        pending: Option<String>,
        #[arg(long)]
        markers: Option<String>,
    },
}

/// Entry point for the Continuum command-line client.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    info!(
        "starting continuum (config_set={}, agent_set={})",
        cli.config.is_some(),
        cli.agent.is_some()
    );
    let agent_override = cli
        .agent
        .clone()
        .or_else(|| std::env::var(AGENT_ID_ENV).ok());
    let config = load_config(cli.config.as_ref(), agent_override)?;
    run(cli.command, &config).await
}

/// Load a single config file or the layered stack, then apply the agent override.
fn load_config(
    path: Option<&PathBuf>,
    agent_override: Option<String>,
) -> anyhow::Result<ContinuumConfig> {
    let mut config = if let Some(path) = path {
        info!("loading config from path: {}", path.display());
        ContinuumConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        info!("loading layered config from cwd: {}", cwd.display());
        let layered =
            ContinuumConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    if let Some(agent_id) = agent_override.filter(|agent_id| !agent_id.trim().is_empty()) {
        config.agent_id = agent_id;
        config.validate().context("invalid agent override")?;
    }
    Ok(config)
}

async fn run(command: Command, config: &ContinuumConfig) -> anyhow::Result<()> {
    match command {
        Command::Schema { dimensions } => {
            let Some(dimensions) = dimensions.or(config.embedding.dimensions) else {
                bail!("--dimensions is required when embedding.dimensions is not configured");
            };
            let client = client_from_config(config).map_err(with_hint)?;
            client
                .ensure_schema(dimensions)
                .await
                .map_err(with_hint)?;
            println!("schema ready (dimensions={dimensions})");
        }
        Command::Store { text, metadata } => {
            let metadata = match metadata {
                Some(raw) => serde_json::from_str(&raw).context("metadata must be JSON")?,
                None => serde_json::Value::Null,
            };
            let client = client_from_config(config).map_err(with_hint)?;
            print_json(&client.store(&text, &metadata).await.map_err(with_hint)?)?;
        }
        Command::Search { query, limit, mode } => {
            let client = client_from_config(config).map_err(with_hint)?;
            print_json(
                &client
                    .search(&query, limit, mode)
                    .await
                    .map_err(with_hint)?,
            )?;
        }
        Command::Get { id } => {
            let client = client_from_config(config).map_err(with_hint)?;
            print_json(&client.get(&id).await.map_err(with_hint)?)?;
        }
        Command::Related {
            id,
            limit,
            min_similarity,
        } => {
            let client = client_from_config(config).map_err(with_hint)?;
            print_json(
                &client
                    .related(&id, limit, min_similarity)
                    .await
                    .map_err(with_hint)?,
            )?;
        }
        Command::Stats => {
            let client = client_from_config(config).map_err(with_hint)?;
            print_json(&client.get_stats().await.map_err(with_hint)?)?;
        }
        Command::Health => {
            let client = client_from_config(config).map_err(with_hint)?;
            print_json(&client.health_check().await)?;
        }
        Command::Initialize => {
            let mut session = session_from_config(config).map_err(with_hint)?;
            let bundle = session.initialize().await.map_err(with_hint)?;
            println!("{}", bundle.render());
        }
        Command::Retrieve {
            query,
            min_similarity,
            limit,
        } => {
            let session = session_from_config(config).map_err(with_hint)?;
            let mut options = session.options().retrieve.clone();
            if let Some(min_similarity) = min_similarity {
                options = options.with_min_similarity(min_similarity);
            }
            if let Some(limit) = limit {
                options = options.with_limit(limit);
            }
            let rendered = session
                .retrieve_with(&query, &options)
                .await
                .map_err(with_hint)?;
            println!("{}", rendered.text);
            if rendered.suppressed() > 0 {
                println!(
                    "({} below similarity {:.2} not shown)",
                    rendered.suppressed(),
                    rendered.min_similarity
                );
            }
        }
        Command::Remember {
            content,
            kind,
            topic,
            context,
        } => {
            let session = session_from_config(config).map_err(with_hint)?;
            let context = context
                .into_iter()
                .fold(MemoryContext::new(), |acc, (key, value)| acc.with(key, value));
            let summary = session
                .store(&content, &MemoryKind::parse(&kind), &topic, &context)
                .await
                .map_err(with_hint)?;
            println!("{}", stored_message(&summary.id, &summary.text));
        }
        Command::Close {
            conversation_id,
            status,
            momentum,
            pending,
            markers,
        } => {
            let mut session = session_from_config(config).map_err(with_hint)?;
            let mut notes = BridgeNotes::new(status);
            if let Some(momentum) = momentum {
                notes = notes.with_momentum(momentum);
            }
            if let Some(pending) = pending {
                notes = notes.with_pending(pending);
            }
            if let Some(markers) = markers {
                notes = notes.with_markers(markers);
            }
            let summary = session
                .close(&conversation_id, &notes)
                .await
                .map_err(with_hint)?;
            println!("Conversation bridge stored: {}", summary.id);
        }
    }
    Ok(())
}

/// Attach the diagnostic hint to a library error.
fn with_hint(err: impl Into<SessionError>) -> anyhow::Error {
    let err = err.into();
    anyhow!("{err}\nhint: {}", err.diagnostic().hint())
}

fn stored_message(id: &str, text: &str) -> String {
    format!("Stored memory {id}:\n{}", summarize(text, ECHO_CHARS))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}

fn parse_mode(value: &str) -> Result<SearchMode, String> {
    SearchMode::from_str(value).map_err(|err| err.to_string())
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), val.trim().to_string()))
        }
        _ => Err(format!("expected key=value (got '{value}')")),
    }
}
