// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Service settings.
//!
//! Layered from defaults, an optional `perf-api.toml` in the working
//! directory, then `PERF_API_*` environment variables with `__` between
//! nested keys (`PERF_API_SERVER__PORT=8080`).

use agent_perf_adapters::azure::DEFAULT_API_VERSION;
use agent_perf_adapters::WARMUP_PROMPT;
use agent_perf_runner::DEFAULT_MAX_SESSIONS;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Base name of the optional settings file.
pub const CONFIG_FILE: &str = "perf-api";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PERF_API";

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl ServerSettings {
    /// Address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

/// Report output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSettings {
    /// Directory metrics reports are written to. Unset disables reports.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Azure OpenAI credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureSettings {
    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// API version query parameter.
    pub api_version: String,
}

/// All service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Listener.
    pub server: ServerSettings,
    /// Logging.
    pub logging: LoggingSettings,
    /// Reports.
    #[serde(default)]
    pub output: OutputSettings,
    /// Azure OpenAI.
    pub azure: AzureSettings,
    /// Prompt for the warm-up call.
    pub warmup_prompt: String,
    /// Finished sessions kept in memory.
    pub max_sessions: usize,
}

impl Settings {
    /// Load from `perf-api.toml` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(Some(File::with_name(CONFIG_FILE).required(false)), None)
    }

    /// Load from an optional file and an explicit environment map.
    ///
    /// `env` replaces the process environment when given.
    pub fn from_sources(
        file: Option<File<config::FileSourceFile, config::FileFormat>>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("logging.format", "pretty")?
            .set_default("logging.level", "info")?
            .set_default("azure.api_version", DEFAULT_API_VERSION)?
            .set_default("warmup_prompt", WARMUP_PROMPT)?
            .set_default("max_sessions", DEFAULT_MAX_SESSIONS as u64)?;

        if let Some(file) = file {
            builder = builder.add_source(file);
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_sources(None, env(&[])).unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert_eq!(settings.azure.api_version, DEFAULT_API_VERSION);
        assert!(settings.azure.api_key.is_none());
        assert!(settings.output.directory.is_none());
        assert_eq!(settings.warmup_prompt, WARMUP_PROMPT);
        assert_eq!(settings.max_sessions, DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn test_environment_override() {
        let settings = Settings::from_sources(
            None,
            env(&[
                ("PERF_API_SERVER__PORT", "8080"),
                ("PERF_API_LOGGING__FORMAT", "json"),
                ("PERF_API_OUTPUT__DIRECTORY", "/tmp/reports"),
                ("PERF_API_AZURE__API_KEY", "secret"),
                ("PERF_API_MAX_SESSIONS", "5"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(
            settings.output.directory,
            Some(PathBuf::from("/tmp/reports"))
        );
        assert_eq!(settings.azure.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.max_sessions, 5);
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 5000,
        };
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:5000");
    }
}
