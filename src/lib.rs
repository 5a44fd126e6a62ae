//! # Stencil CLI Library
//!
//! Core library functionality for the `stencil` schema registry client.

use clap::Parser;

pub mod commands;
pub mod config;
pub mod constants;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod snapshot;

/// Command line client for the Stencil schema registry
///
/// Downloads descriptor set snapshots, lists and promotes them, and prints
/// their contents back as `.proto` source.
#[derive(Parser)]
#[command(
    name = "stencil",
    version,
    about = "Command line client for the Stencil schema registry",
    long_about = "Command line client for the Stencil schema registry.\n\nDownload protobuf descriptor set snapshots by namespace, name and version or the latest\nchannel, list and promote snapshots, and print snapshot contents as .proto source."
)]
pub struct Cli {
    /// Registry address, e.g. localhost:8000 (overrides STENCIL_HOST and the config file)
    #[arg(long, global = true)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<commands::Commands>,
}
