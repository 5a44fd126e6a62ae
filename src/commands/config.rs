use crate::config::{config_path, load_config, save_config};
use anyhow::{anyhow, Result};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the config file location and effective settings
    Show,
    /// Persist settings; the registry address comes from the global --host flag
    Set {
        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

pub fn run(cmd: ConfigCommands, host: Option<&str>) -> Result<()> {
    let path = config_path();
    let mut cfg = load_config(&path)?;

    match cmd {
        ConfigCommands::Show => {
            println!("Config file: {}", path.display());
            match cfg.resolve(host) {
                Ok(effective) => {
                    println!(" - host → {}", effective.host);
                    println!(" - timeout → {}s", effective.timeout_secs);
                }
                Err(_) => println!(" - host → (not configured)"),
            }
        }
        ConfigCommands::Set { timeout_secs } => {
            if host.is_none() && timeout_secs.is_none() {
                return Err(anyhow!("nothing to set; pass --host and/or --timeout-secs"));
            }
            if let Some(h) = host {
                cfg.host = Some(h.to_string());
            }
            if let Some(t) = timeout_secs {
                cfg.timeout_secs = Some(t);
            }
            save_config(&cfg, &path)?;
            println!("✅ Saved config to {}", path.display());
        }
    }

    Ok(())
}
