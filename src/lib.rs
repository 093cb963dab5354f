pub mod cli;
pub mod client;
pub mod core;
pub mod gateway;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Run the quote gateway.
    Serve,
    /// Ask the gateway for the current bid once.
    Quote {
        server_url: Option<String>,
        no_log: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Serve => serve(&config).await,
        AppCommand::Quote { server_url, no_log } => {
            let server_url = server_url.unwrap_or_else(|| config.client.server_url.clone());
            let log_path = if no_log {
                None
            } else {
                config.client.log_path.clone()
            };
            let bid = quote(&server_url, &config, log_path).await?;
            println!("Dólar: {bid}");
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig) -> Result<()> {
    info!("Quote gateway starting...");

    let store = store::SqliteQuoteStore::open(&config.server.database_path).with_context(|| {
        format!(
            "Failed to open quote store: {}",
            config.server.database_path.display()
        )
    })?;
    let source = providers::AwesomeApiProvider::new(&config.upstream.url, &config.upstream.pair)
        .context("Failed to set up upstream provider")?;

    let gateway = Arc::new(gateway::QuoteGateway::new(
        Arc::new(source),
        Arc::new(store),
        gateway::StageBudgets {
            fetch: config.timeouts.fetch(),
            persist: config.timeouts.persist(),
        },
    ));

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    gateway::serve(listener, gateway).await
}

async fn quote(server_url: &str, config: &AppConfig, log_path: Option<PathBuf>) -> Result<f64> {
    let client = client::QuoteClient::new(server_url, config.timeouts.client());
    client::fetch_and_record(&client, log_path.as_deref())
        .await
        .with_context(|| format!("Failed to get a quote from {server_url}"))
}
