//! Configuration management for the Stencil CLI
//!
//! Settings live in an optional YAML file, `~/.config/stencil/config.yaml` or the
//! path given by `STENCIL_CONFIG_PATH`. A missing file means defaults.
//!
//! ## Environment Variable Expansion
//!
//! The file supports environment variable expansion with the following syntax:
//! - `${VAR}` - Simple substitution
//! - `${VAR:-default}` - Use default if VAR is unset or empty
//! - `${VAR-default}` - Use default if VAR is unset
//! - `${VAR:+alt}` - Use alt if VAR is set and non-empty
//! - `${VAR+alt}` - Use alt if VAR is set
//!
//! ## Host Precedence
//!
//! The `--host` flag wins over `STENCIL_HOST`, which wins over the file.

use crate::constants::{
    DEFAULT_TIMEOUT_SECS, STENCIL_CONFIG_FILE, STENCIL_CONFIG_PATH_ENV, STENCIL_HOST_ENV,
};
use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, fs, path::PathBuf};

/// Settings persisted in the config file
///
/// # Example
///
/// ```yaml
/// host: ${STENCIL_HOST:-localhost:8000}
/// timeoutSecs: 30
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StencilConfig {
    /// Registry address, with or without scheme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Request timeout for registry calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Effective connection settings after applying flags and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub timeout_secs: u64,
}

impl StencilConfig {
    /// Merge the `--host` flag, `STENCIL_HOST` and this file into client settings
    pub fn resolve(&self, host_flag: Option<&str>) -> anyhow::Result<ClientConfig> {
        let env_host = env::var(STENCIL_HOST_ENV).ok();
        let host = host_flag
            .map(str::to_string)
            .or(env_host)
            .or_else(|| self.host.clone())
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no registry host configured; pass --host, set {STENCIL_HOST_ENV} or run 'stencil config set --host <url>'"
                )
            })?;
        Ok(ClientConfig {
            host: normalize_host(&host),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

/// Add `http://` when no scheme is given and drop trailing slashes
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

pub fn config_path() -> PathBuf {
    env::var(STENCIL_CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push(STENCIL_CONFIG_FILE);
            p
        })
}

pub fn load_config(path: &Path) -> anyhow::Result<StencilConfig> {
    if !path.exists() {
        return Ok(StencilConfig::default());
    }
    let data = preprocess_config(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    if data.trim().is_empty() {
        return Ok(StencilConfig::default());
    }
    let cfg: StencilConfig = serde_yaml::from_str(&data)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

pub fn load_global_config() -> anyhow::Result<StencilConfig> {
    load_config(&config_path())
}

pub fn save_config(cfg: &StencilConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_yaml::to_string(cfg)?;
    fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}

pub fn expand_env_placeholders(input: &str) -> String {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:(:?[-+])([^}]*))?\}")
        .expect("placeholder pattern is valid");
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let op = caps.get(2).map_or("", |m| m.as_str());
        let val = caps.get(3).map_or("", |m| m.as_str());
        let var = env::var(var_name).ok();

        match (var.as_deref(), op) {
            (Some(v), "") => v.to_string(),                      // ${VAR}
            (Some(v), ":-") if !v.is_empty() => v.to_string(),   // ${VAR:-default}
            (_, ":-") => val.to_string(),
            (Some(v), "-") => v.to_string(),                     // ${VAR-default}
            (None, "-") => val.to_string(),
            (Some(v), ":+") if !v.is_empty() => val.to_string(), // ${VAR:+alt}
            (Some(_), "+") => val.to_string(),                   // ${VAR+alt}
            _ => String::new(),
        }
    })
    .to_string()
}

pub fn preprocess_config(path: &Path) -> anyhow::Result<String> {
    let raw_data = fs::read_to_string(path)?;
    Ok(expand_env_placeholders(&raw_data))
}
