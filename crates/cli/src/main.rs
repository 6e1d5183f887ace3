//! Zabbot CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP API server
//! - `chat`    Send one message to the agent and print the reply
//! - `status`  Check the connection to Zabbix
//! - `config`  Show the agent settings (secrets masked)

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "zabbot",
    about = "Zabbot: an LLM operations assistant for Zabbix",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a single message to the agent
    Chat {
        #[arg(short, long)]
        message: String,
    },

    /// Check connectivity to the monitoring backend
    Status,

    /// Show agent settings and where they are stored
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { message } => commands::chat::run(&message).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Config => commands::config::run()?,
    }

    Ok(())
}
