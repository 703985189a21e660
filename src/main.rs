// src/main.rs

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hal_chat::config::CliConfig;
use hal_chat::repl::Repl;
use hal_chat::session::generate_identity;

/// Terminal chat client for the HAL homelab agent
#[derive(Debug, Parser)]
#[command(name = "hal-chat", version, about)]
struct CliArgs {
    /// Agent WebSocket base URL
    #[arg(long, env = "HAL_BACKEND_URL")]
    backend_url: Option<String>,

    /// Agent HTTP base URL
    #[arg(long, env = "HAL_HTTP_URL")]
    http_url: Option<String>,

    /// Identity to connect as (generated when omitted)
    #[arg(short, long)]
    identity: Option<String>,

    /// Send a single message and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = CliConfig::load().unwrap_or_default();
    if let Some(backend_url) = args.backend_url {
        config.backend_url = backend_url;
    }
    if let Some(http_url) = args.http_url {
        config.http_url = http_url;
    }
    if args.verbose {
        config.verbose = true;
    }
    if args.no_color {
        config.no_color = true;
    }

    // Logs go to stderr so they never interleave with the chat view
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let identity = args
        .identity
        .or_else(|| config.identity.clone())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_identity);

    info!("Starting hal-chat as {}", identity);

    let mut repl = Repl::new(config, identity);
    match args.message {
        Some(message) => repl.run_one_shot(&message).await,
        None => repl.run().await,
    }
}
