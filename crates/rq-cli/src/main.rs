use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rq_core::{Error, Researcher, ToolAgentGateway};
use rq_providers::OpenAIProvider;
use rq_report::{format_text, save_new_docx};
use rq_tools::research_registry;

mod config;
mod interactive;
mod server;

use config::{AppConfig, ConfigOverrides, GatewayOverrides, DEFAULT_BASE_URL};
use interactive::Prompter;
use server::ServerState;

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: request bodies and tool output
    Trace,
    /// Verbose: agent iterations and tool calls
    Debug,
    /// Standard: research attempts and verdicts
    Info,
    /// Quiet: only warnings and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "rq")]
#[command(author, version, about = "Research-query: validated research reports from an LLM agent", long_about = None)]
pub struct Cli {
    /// Research query (prompted for when omitted)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL for the chat-completions API (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory for generated .docx reports (overrides config)
    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the research web form
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let bind = match &self.command {
            Some(Commands::Serve { bind }) => bind.clone(),
            _ => None,
        };

        ConfigOverrides {
            gateway: GatewayOverrides {
                model_name: self.model.clone(),
                base_url: self.base_url.clone(),
            },
            bind,
            reports_dir: self.reports_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Resolve log level: --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    init_logging(log_level, cli.log_file.as_ref())?;

    let config = AppConfig::load(&cli.overrides())?;

    match &cli.command {
        Some(Commands::Serve { .. }) => serve_mode(&config).await,
        Some(Commands::Config) => show_config(&config),
        None => research_mode(&cli, &config).await,
    }
}

fn init_logging(level: LogLevel, log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::new(level.as_filter());

    if let Some(log_path) = log_file {
        // Log file specified: write JSON to file
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// Wire provider, tools and gateway into a researcher.
fn build_researcher(config: &AppConfig) -> Result<Researcher> {
    // Self-hosted endpoints often run without a key
    let api_key = match config.api_key() {
        Ok(key) => key.to_string(),
        Err(e) if config.gateway.base_url == DEFAULT_BASE_URL => return Err(e),
        Err(_) => "none".to_string(),
    };

    let provider = OpenAIProvider::new(api_key)
        .with_base_url(&config.gateway.base_url)
        .with_default_model(&config.gateway.model_name);

    let tools = Arc::new(research_registry(&config.notes_dir));

    let mut agent_config = ToolAgentGateway::research_config()
        .with_max_iterations(config.max_tool_iterations)
        .with_model(&config.gateway.model_name);
    if config.json_mode {
        agent_config =
            agent_config.with_extra("response_format", serde_json::json!({"type": "json_object"}));
    }

    tracing::debug!(
        model = %config.gateway.model_name,
        base_url = %config.gateway.base_url,
        tools = ?tools.names(),
        "Research gateway configured"
    );

    let gateway = ToolAgentGateway::new(Arc::new(provider), tools, agent_config);
    Ok(Researcher::new(Arc::new(gateway)))
}

async fn research_mode(cli: &Cli, config: &AppConfig) -> Result<()> {
    let researcher = build_researcher(config)?;
    let mut prompter = Prompter::new()?;

    let query = match &cli.query {
        Some(query) => query.clone(),
        None => match prompter.read_query()? {
            Some(query) => query,
            None => return Ok(()),
        },
    };

    let run = match researcher.run(&query).await {
        Ok(run) => run,
        Err(Error::EmptyQuery) => anyhow::bail!("Please enter a research query."),
        Err(e) => return Err(e).context("Research failed"),
    };

    println!("{}", format_text(&run.result));
    if let Some(response) = run.result.as_structured() {
        println!("{}", serde_json::to_string_pretty(response)?);
    }
    if !run.validated && !run.result.is_no_response() {
        eprintln!(
            "Warning: the report did not pass validation after {} attempts",
            run.attempts
        );
    }

    if prompter.confirm_save()? {
        let saved = save_new_docx(&run.result, &config.reports_dir).with_context(|| {
            format!("Failed to save report in {}", config.reports_dir.display())
        })?;
        println!("Saved report to {}", saved.display());
    }

    Ok(())
}

async fn serve_mode(config: &AppConfig) -> Result<()> {
    let researcher = build_researcher(config)?;
    let state = ServerState::new(researcher, config.reports_dir.clone())?;
    server::serve(&config.bind, Arc::new(state)).await
}

fn show_config(config: &AppConfig) -> Result<()> {
    let path = AppConfig::config_path()?;
    let status = if path.exists() { "" } else { " (not found)" };
    println!("# Config file: {}{}", path.display(), status);
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}
