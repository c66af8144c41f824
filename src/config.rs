use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::net::system_messages::DEFAULT_DECODE_CACHE;

/// Pacing delay used when none is configured, and restored for display
/// whenever the delay is set to 0 (pacing off).
pub const DEFAULT_DELAY_MS: u64 = 5500;

/// Opener settings, loadable from a YAML file with environment
/// overrides layered on top.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenerConfig {
    /// Minimum wall-clock spacing between automated uses, milliseconds.
    pub delay_ms: u64,
    /// Whether the pacing delay is enforced from the start; it can be
    /// toggled at runtime through the delay command either way.
    pub pacing: bool,
    /// Root directory for the session/error logs; logging is off when unset.
    pub log_root: Option<PathBuf>,
    /// System-message name table, one symbolic name per line.
    pub message_table: Option<PathBuf>,
    pub decode_cache_size: usize,
}

impl Default for OpenerConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            pacing: false,
            log_root: None,
            message_table: None,
            decode_cache_size: DEFAULT_DECODE_CACHE,
        }
    }
}

impl OpenerConfig {
    /// Load from a YAML file when one is given, then apply `BOXOPENER_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
                serde_yaml::from_str(&content)
                    .map_err(|err| format!("failed to parse config {}: {}", path.display(), err))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), String> {
        if let Some(value) = read_env("BOXOPENER_DELAY_MS") {
            self.delay_ms = value
                .parse()
                .map_err(|_| format!("invalid BOXOPENER_DELAY_MS '{}'", value))?;
        }
        if let Some(value) = read_env("BOXOPENER_PACING") {
            self.pacing = match value.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => return Err(format!("invalid BOXOPENER_PACING '{}'", other)),
            };
        }
        if let Some(value) = read_env("BOXOPENER_LOG_ROOT") {
            self.log_root = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("BOXOPENER_MESSAGE_TABLE") {
            self.message_table = Some(PathBuf::from(value));
        }
        Ok(())
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
