use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gitback::config::AnalyzerArgs;
use gitback::services::Analyzer;

#[derive(Parser)]
#[command(author, version = "0.1.0", about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    analyzer: AnalyzerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server in stdin/stdout mode
    Stdio {
        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,
    },
    /// Run the server with HTTP/SSE interface
    Http {
        /// Address to bind the HTTP server to
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        address: String,

        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stdio { debug } => run_stdio_server(debug, &cli.analyzer).await,
        Commands::Http { address, debug } => run_http_server(address, debug, &cli.analyzer).await,
    }
}

async fn run_stdio_server(debug: bool, args: &AnalyzerArgs) -> Result<()> {
    // Initialize the tracing subscriber with stderr logging
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // stdout carries the MCP protocol
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .init();

    let config = args.to_config();
    tracing::info!("Starting gitback MCP server in STDIN/STDOUT mode");
    tracing::debug!(?config, "analyzer configuration");
    if config.github_token.is_some() {
        tracing::info!("Using GitHub token");
    }

    let analyzer = Analyzer::from_config(config)?;

    gitback::transport::stdio::run_stdio_server(analyzer)
        .await
        .map_err(|e| anyhow::anyhow!("Error running STDIO server: {}", e))
}

async fn run_http_server(address: String, debug: bool, args: &AnalyzerArgs) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .init();

    let addr: SocketAddr = address.parse()?;

    let config = args.to_config();
    tracing::debug!(?config, "analyzer configuration");
    tracing::info!("Access the gitback MCP server at http://{}/sse", addr);
    if config.github_token.is_some() {
        tracing::info!("Using GitHub token");
    }

    let analyzer = Analyzer::from_config(config)?;

    let app = gitback::transport::sse_server::SseServerApp::new(addr, analyzer);
    app.serve().await?;

    Ok(())
}
