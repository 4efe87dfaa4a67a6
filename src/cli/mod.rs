//! CLI module
//!
//! Subcommands:
//! - `query`: answer one question against a local corpus
//! - `interactive`: answer questions typed at a prompt
//! - `serve`: run the HTTP API
//! - `metrics`: summarize a recorded metrics file

pub mod interactive;
pub mod metrics;
pub mod query;
pub mod serve;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Self-correcting RAG - grounded answers with relevance filtering and retries
#[derive(Parser)]
#[command(name = "self-corrected-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer a single question and print the result
    Query(query::QueryArgs),

    /// Answer questions typed at a prompt until `exit`
    Interactive(interactive::InteractiveArgs),

    /// Run the HTTP API server
    Serve(serve::ServeArgs),

    /// Print the aggregate summary of a metrics file
    Metrics(metrics::MetricsArgs),
}

/// Load `.env` and layered configuration, falling back to defaults
fn load_config() -> AppConfig {
    dotenvy::dotenv().ok();

    match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    }
}

fn init_console_logging(config: &AppConfig) {
    logging::init_logging(&logging::LoggingConfig::from(&config.logging));
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
