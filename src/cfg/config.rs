// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Application configuration: the YAML-backed server table, `gamedb` and
//! `gamedir` lists, and the validation rules a JSON-schema validator would
//! enforce in the original implementation.

use std::{collections::HashMap, fs, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::rcon::{AuthMode, ServerEndpoint};

fn default_port() -> u16 {
    26000
}

fn default_rcon_mode() -> AuthMode {
    AuthMode::TimeSecure
}

/// One entry of the `servers` map: everything needed to build a
/// [`ServerEndpoint`], plus the deserialization defaults the original
/// JSON schema specifies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_rcon_mode")]
    pub rcon_mode: AuthMode,
    pub rcon_password: String,
}

impl ServerConfig {
    pub fn to_endpoint(&self) -> ServerEndpoint {
        ServerEndpoint {
            host: self.server.clone(),
            port: self.port,
            password: self.rcon_password.clone(),
            auth_mode: self.rcon_mode,
        }
    }
}

/// Top-level application configuration, deserialized from YAML.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub servers: HashMap<String, ServerConfig>,
    #[serde(default)]
    pub gamedb: Vec<String>,
    #[serde(default)]
    pub gamedir: Vec<String>,
}

/// Checks the server-name pattern
/// `[0-9A-Za-z]([0-9A-Za-z\-._]*[0-9A-Za-z])?` the original JSON schema
/// enforces via `patternProperties`.
fn is_valid_server_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let is_alnum = |b: u8| b.is_ascii_alphanumeric();
    let is_middle = |b: u8| is_alnum(b) || matches!(b, b'-' | b'.' | b'_');
    if !is_alnum(bytes[0]) || !is_alnum(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes[1..bytes.len() - 1].iter().all(|&b| is_middle(b))
}

impl AppConfig {
    /// Loads, parses and validates a configuration file. Any failure here
    /// is fatal at startup: the caller should abort the process.
    pub fn load_from_file(path: &Path) -> Result<AppConfig> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse yaml config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the constraints a JSON-schema validator would enforce
    /// against the original `config_schema.json`: non-empty `servers`,
    /// valid server names, in-range ports, bounded passwords, and
    /// non-empty `gamedb`/`gamedir` lists when present.
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            bail!("configuration must declare at least one server");
        }
        for (name, server) in &self.servers {
            if !is_valid_server_name(name) {
                bail!("invalid server name {name:?}: must match [0-9A-Za-z]([0-9A-Za-z-._]*[0-9A-Za-z])?");
            }
            if server.port == 0 {
                bail!("server {name:?}: port must be in 1..=65535");
            }
            if server.rcon_password.is_empty() || server.rcon_password.len() > 64 {
                bail!("server {name:?}: rcon_password must be 1..=64 characters");
            }
        }
        if self.gamedb.is_empty() {
            bail!("configuration must declare at least one gamedb entry");
        }
        Ok(())
    }

    pub fn endpoints(&self) -> HashMap<String, ServerEndpoint> {
        self.servers
            .iter()
            .map(|(name, cfg)| (name.clone(), cfg.to_endpoint()))
            .collect()
    }
}

/// Process-wide, lock-free handle to the current configuration. Readers
/// (HTTP handlers, the map cache) always observe a consistent snapshot;
/// a failed SIGHUP reload never replaces it.
#[derive(Debug)]
pub struct SharedConfig(ArcSwap<AppConfig>);

impl SharedConfig {
    pub fn new(config: AppConfig) -> Self {
        SharedConfig(ArcSwap::from_pointee(config))
    }

    /// Returns a cheaply-cloneable snapshot of the current configuration.
    pub fn load(&self) -> Arc<AppConfig> {
        self.0.load_full()
    }

    /// Re-reads `path`, validates it, and swaps it in atomically on
    /// success. On failure the previous configuration keeps serving and
    /// the error is logged, never propagated.
    pub fn reload(&self, path: &Path) {
        match AppConfig::load_from_file(path) {
            Ok(config) => {
                self.0.store(Arc::new(config));
                info!(path = %path.display(), "configuration reloaded");
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "configuration reload rejected, keeping previous config");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_yaml() -> &'static str {
        "servers:\n  regulars:\n    server: 1.2.3.4\n    rcon_password: hunter2\ngamedb:\n  - /var/lib/xon/server.db\ngamedir:\n  - /var/lib/xon/data\n"
    }

    #[test]
    fn round_trips_a_well_formed_config() {
        let config: AppConfig = serde_yaml::from_str(base_yaml()).unwrap();
        config.validate().unwrap();
        let server = &config.servers["regulars"];
        assert_eq!(server.port, 26000);
        assert_eq!(server.rcon_mode, AuthMode::TimeSecure);
    }

    #[test]
    fn rejects_missing_rcon_password() {
        let yaml = "servers:\n  regulars:\n    server: 1.2.3.4\ngamedb:\n  - db\n";
        let result: std::result::Result<AppConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_range_port() {
        let yaml = "servers:\n  regulars:\n    server: 1.2.3.4\n    port: 70000\n    rcon_password: x\ngamedb:\n  - db\n";
        let result: std::result::Result<AppConfig, _> = serde_yaml::from_str(yaml);
        // port is u16, so an out-of-range literal is rejected at deserialize time
        assert!(result.is_err());
    }

    #[test]
    fn rejects_server_name_with_slash() {
        let mut config: AppConfig = serde_yaml::from_str(base_yaml()).unwrap();
        let server = config.servers.remove("regulars").unwrap();
        config.servers.insert("regu/lars".to_string(), server);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_gamedb() {
        let yaml = "servers:\n  regulars:\n    server: 1.2.3.4\n    rcon_password: x\ngamedb: []\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
