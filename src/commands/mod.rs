use crate::config::load_global_config;
use crate::registry::RegistryClient;
use crate::snapshot::SnapshotQuery;
use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::debug;

pub mod completions;
pub mod config;
pub mod download;
pub mod snapshot;

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Download a descriptor set snapshot and write it to a file as-is")]
    Download(download::DownloadArgs),
    #[command(about = "List, promote and print snapshots")]
    Snapshot {
        #[command(subcommand)]
        cmd: snapshot::SnapshotCommands,
    },
    #[command(about = "Show or change the CLI configuration file")]
    Config {
        #[command(subcommand)]
        cmd: config::ConfigCommands,
    },
    #[command(about = "Emit shell completion scripts (bash/zsh/fish)")]
    Completions { shell: String },
}

/// Selectors shared by every command that targets one snapshot
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Namespace/group or entity name
    #[arg(long)]
    pub namespace: String,
    /// Descriptor (proto repo) name
    #[arg(long)]
    pub name: String,
    /// Semantic version of the snapshot
    #[arg(long)]
    pub version: Option<String>,
    /// Select the snapshot marked latest
    #[arg(long)]
    pub latest: bool,
    /// Fully-qualified proto names to restrict the set to, comma separated
    /// (e.g. google.protobuf.FileDescriptorProto,google.protobuf.FileDescriptorSet)
    #[arg(long, value_delimiter = ',')]
    pub fullnames: Vec<String>,
}

impl SnapshotArgs {
    pub fn to_query(&self) -> SnapshotQuery {
        SnapshotQuery {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            channel: None,
            latest: self.latest,
        }
    }
}

/// Build a registry client from the config file, `STENCIL_HOST` and `--host`
pub fn connect(host: Option<&str>) -> Result<RegistryClient> {
    let cfg = load_global_config()?.resolve(host)?;
    debug!(host = %cfg.host, timeout_secs = cfg.timeout_secs, "connecting to registry");
    RegistryClient::new(&cfg)
}

pub async fn run(cmd: Commands, host: Option<&str>) -> Result<()> {
    match cmd {
        Commands::Download(args) => download::run(args, host).await,
        Commands::Snapshot { cmd } => snapshot::run(cmd, host).await,
        Commands::Config { cmd } => config::run(cmd, host),
        Commands::Completions { shell } => completions::run(shell),
    }
}
