use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pathquill::{PathquillConfig, QueryRequest, QueryTool};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Ask a natural-language question of the locally materialized WikiPathways
/// graph. The question is translated to SPARQL by the configured LLM and the
/// result printed as a table.
#[derive(Debug, Parser)]
#[command(name = "pathquill", version, about)]
struct Cli {
    /// The question, in plain language.
    #[arg(required = true)]
    question: Vec<String>,

    /// API key for the LLM provider.
    #[arg(long, env = "PATHQUILL_LLM_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Access token for the data registry.
    #[arg(long, env = "PATHQUILL_REGISTRY_TOKEN", hide_env_values = true, default_value = "")]
    token: String,

    /// LLM provider (openai, ollama).
    #[arg(long)]
    provider: Option<String>,

    /// Model name for the provider.
    #[arg(long)]
    model: Option<String>,

    /// Data registry base URL.
    #[arg(long)]
    registry: Option<String>,

    /// Directory for credentials, downloaded assets and the store.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Print the generated SPARQL before the table.
    #[arg(long)]
    show_sparql: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = PathquillConfig::load(cli.config.as_deref())?;
    if let Some(provider) = cli.provider {
        config.llm_provider = provider;
    }
    if let Some(model) = cli.model {
        config.llm_model = model;
    }
    if let Some(registry) = cli.registry {
        config.registry_url = registry;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }

    let tool = QueryTool::new(config);
    let request = QueryRequest {
        api_key: cli.api_key,
        token: cli.token,
        question: cli.question.join(" "),
    };

    let outcome = tool.run(&request).await?;

    match cli.format {
        OutputFormat::Table => {
            if cli.show_sparql {
                println!("{}\n", outcome.sparql);
            }
            if outcome.table.is_empty() {
                println!("No data retrieved from the query.");
            } else {
                print!("{}", outcome.table);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    Ok(())
}
