use super::{connect, SnapshotArgs};
use anyhow::{Context, Result};
use clap::Args;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub target: SnapshotArgs,
    /// File to write the descriptor set to
    #[arg(long, short)]
    pub output: PathBuf,
}

pub async fn run(args: DownloadArgs, host: Option<&str>) -> Result<()> {
    let identity = args.target.to_query().resolve()?;
    let client = connect(host)?;

    let data = client
        .download_descriptor(&identity, &args.target.fullnames)
        .await?;
    fs::write(&args.output, &data)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(snapshot = %identity, bytes = data.len(), "descriptor set written");
    println!(
        "✅ downloaded {} ({} bytes) to {}",
        identity,
        data.len(),
        args.output.display()
    );
    Ok(())
}
