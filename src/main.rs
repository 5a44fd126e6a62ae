//! # Stencil CLI
//!
//! Command line client for the Stencil schema registry.
//!
//! ## Quick Start
//!
//! ```bash
//! # Point the CLI at a registry
//! stencil --host localhost:8000 config set
//!
//! # Download the latest snapshot of a descriptor set
//! stencil download --namespace odpf --name proton --latest --output proton.desc
//!
//! # Print one message and its imports as .proto source
//! stencil snapshot print --namespace odpf --name proton --version 1.0.1 \
//!     --fullnames odpf.booking.BookingLogMessage
//! ```
//!
//! Set `RUST_LOG=debug` to trace registry calls and descriptor processing on stderr.

use clap::Parser;
use stencil_cli::{commands, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(cmd) = cli.cmd else {
        eprintln!("No command provided. Use --help to see available commands.");
        std::process::exit(1);
    };

    if let Err(e) = commands::run(cmd, cli.host.as_deref()).await {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}
