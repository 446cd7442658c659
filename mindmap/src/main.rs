//! Mindmap - a terminal client for the mind map document service.
//!
//! Architecture:
//! - The CLI is a thin client that talks to the backend REST API over HTTP
//! - The bearer token and user profile persist under `~/.mindmap/credentials`
//! - `App` owns the auth session, the document registry and the notification
//!   slot; each CLI command drives one of its operations

mod api;
mod app;
mod auth;
mod cli;
mod config;
mod error;
mod models;
mod notify;
mod registry;
mod store;
mod sync;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::FAILURE
        }
    }
}
