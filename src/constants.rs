//! Shared names used across commands and configuration

/// Channel name the registry uses for the snapshot currently marked latest
pub const LATEST_CHANNEL: &str = "latest";

/// Environment variable overriding the config file location
pub const STENCIL_CONFIG_PATH_ENV: &str = "STENCIL_CONFIG_PATH";

/// Environment variable overriding the configured registry host
pub const STENCIL_HOST_ENV: &str = "STENCIL_HOST";

/// Config file location relative to the platform config directory
pub const STENCIL_CONFIG_FILE: &str = "stencil/config.yaml";

/// Request timeout applied when the config does not set one
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
