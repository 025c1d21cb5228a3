//! CLI configuration utilities

use anyhow::Result;
use serde::{Deserialize, Serialize};
use simulador_http::ClientConfig;
use std::path::{Path, PathBuf};

/// Environment prefix for configuration overrides, e.g.
/// `SIMULADOR_CLIENT__BASE_URL`
const ENV_PREFIX: &str = "SIMULADOR";

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// API client settings
    pub client: ClientConfig,

    /// Session file; defaults to `<data_dir>/session.json`
    pub session_file: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("client.base_url", defaults.client.base_url)?
            .set_default("client.user_agent", defaults.client.user_agent)?
            .set_default("client.endpoints.login", defaults.client.endpoints.login)?
            .set_default(
                "client.endpoints.register",
                defaults.client.endpoints.register,
            )?
            .set_default("client.endpoints.refresh", defaults.client.endpoints.refresh)?
            .set_default("client.endpoints.me", defaults.client.endpoints.me)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Where the session is persisted
    pub fn session_file(&self, data_dir: &Path) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| data_dir.join("session.json"))
    }
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<Path>>(config: &CliConfig, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_config(&CliConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        generate_default_config(&path).unwrap();
        let loaded = CliConfig::load(Some(&path)).unwrap();

        assert_eq!(loaded.client, ClientConfig::default());
        assert_eq!(
            loaded.session_file(dir.path()),
            dir.path().join("session.json")
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "client": {
                    "base_url": "https://simulador.example.com",
                    "timeout_secs": 15,
                    "endpoints": { "refresh": "/auth/renew" }
                },
                "session_file": "/tmp/simulador-session.json"
            }"#,
        )
        .unwrap();

        let loaded = CliConfig::load(Some(&path)).unwrap();

        assert_eq!(loaded.client.base_url, "https://simulador.example.com");
        assert_eq!(loaded.client.timeout_secs, Some(15));
        assert_eq!(loaded.client.endpoints.refresh, "/auth/renew");
        assert_eq!(loaded.client.endpoints.login, "/api/auth/login");
        assert_eq!(
            loaded.session_file(dir.path()),
            PathBuf::from("/tmp/simulador-session.json")
        );
    }
}
