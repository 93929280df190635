//! Campaign maintenance tool
//!
//! Removes dummy campaigns from the backend and triggers a fresh Google Ads
//! sync, or lists what the last sync stored.

// campaign-maintenance/src/main.rs
mod config;
mod errors;
mod remote;
mod runner;

use std::env;
use std::io::stdout;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use runner::{Invocation, exit_status, run};

/// Main entry point for the maintenance tool
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let result = match Invocation::from_args(env::args().skip(1)) {
        Ok(invocation) => run(&invocation, &mut stdout().lock()).await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(_) => println!("🏁 Maintenance run finished."),
        Err(e) => eprintln!("❌ Error: {}", e),
    }
    ExitCode::from(exit_status(&result))
}

/// Diagnostics go to stderr so stdout carries only the status report.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
