use super::{connect, SnapshotArgs};
use crate::descriptor;
use crate::constants::LATEST_CHANNEL;
use crate::snapshot::SnapshotQuery;
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// List snapshots with optional filters
    List(ListArgs),
    /// Promote the given snapshot to latest
    Promote {
        /// Snapshot id
        #[arg(long)]
        id: i64,
    },
    /// Print a snapshot's descriptors as proto source
    Print(SnapshotArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Namespace/group or entity name
    #[arg(long)]
    pub namespace: Option<String>,
    /// Descriptor (proto repo) name
    #[arg(long)]
    pub name: Option<String>,
    /// Semantic version of the snapshot
    #[arg(long)]
    pub version: Option<String>,
    /// Only snapshots marked latest
    #[arg(long)]
    pub latest: bool,
}

impl ListArgs {
    /// `--latest` becomes the latest channel; without it the status stays unknown
    pub fn to_query(&self) -> SnapshotQuery {
        SnapshotQuery {
            namespace: self.namespace.clone().unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            version: self.version.clone(),
            channel: self.latest.then(|| LATEST_CHANNEL.to_string()),
            latest: false,
        }
    }
}

pub async fn run(cmd: SnapshotCommands, host: Option<&str>) -> Result<()> {
    match cmd {
        SnapshotCommands::List(args) => {
            let client = connect(host)?;
            let snapshots = client.list_snapshots(&args.to_query().to_filter()).await?;
            print_json(&json!({ "snapshots": snapshots }))
        }
        SnapshotCommands::Promote { id } => {
            let client = connect(host)?;
            let snapshot = client.promote_snapshot(id).await?;
            print_json(&json!({ "snapshot": snapshot }))
        }
        SnapshotCommands::Print(args) => print(args, host).await,
    }
}

async fn print(args: SnapshotArgs, host: Option<&str>) -> Result<()> {
    let identity = args.to_query().resolve()?;
    let client = connect(host)?;
    let data = client
        .download_descriptor(&identity, &args.fullnames)
        .await?;

    let set = descriptor::decode(&data)?;
    let schemas = descriptor::assemble(&set, &args.fullnames)?;
    let source = descriptor::render_all(&schemas)?;
    debug!(snapshot = %identity, files = set.len(), "rendered descriptor set");

    print!("{source}");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
