// src/main.rs - Dojo CLI entry point

use clap::Parser;
use std::path::Path;

use dojo::cli::{self, Cli, Commands};
use dojo::client::DojoClient;
use dojo::infra::config::Config;
use dojo::infra::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(Path::new(path))?
    } else {
        Config::load()?
    };
    if let Some(url) = cli.url {
        config.server.base_url = url;
    }

    // Respects RUST_LOG, else the configured level
    logger::init_logging(&config.log.level);

    let client = DojoClient::new(config)?;

    match cli.command {
        Commands::Health => cli::status::show_health(&client).await,
        Commands::Info => cli::status::show_info(&client).await,
        Commands::Sessions => cli::status::show_sessions(&client).await,
        Commands::Send {
            session,
            text,
            no_tools,
        } => cli::send::run_send(&client, &session, &text.join(" "), !no_tools).await,
        Commands::Watch { target } => {
            cli::watch::run_watch(&client, cli::parse_scope(&target)).await
        }
        Commands::Usage { costs } => {
            cli::status::show_usage(&client, costs.map(Into::into)).await
        }
    }
}
