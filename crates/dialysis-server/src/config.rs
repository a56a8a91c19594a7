//! Layered configuration: built-in defaults, then an optional file, then
//! `DIALYSIS__*` environment variables.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use dialysis_core::StaffRoster;
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_NAME: &str = "dialysis";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub cors: CorsSettings,
    pub staff: StaffRoster,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// The JSON document
    pub path: PathBuf,
    pub backup_dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/db.json"),
            backup_dir: PathBuf::from("data/backups"),
        }
    }
}

/// Origins allowed in addition to any `http://localhost:<port>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://192.168.50.33:3000".to_string(),
                "http://192.168.1.2:3000".to_string(),
                "http://192.168.50.234:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info,dialysis_core=debug,dialysis_server=debug,tower_http=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration. An explicit `path` must exist; otherwise
    /// `dialysis.{toml,yaml,json}` is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("DIALYSIS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.store.path, PathBuf::from("data/db.json"));
        assert_eq!(config.staff.units.len(), 4);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialysis.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 6100

[store]
path = "/var/lib/dialysis/db.json"

[staff]
technicians = ["Anil"]
doctors = ["Dr. Mehta"]
units = ["Unit A"]
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 6100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.path, PathBuf::from("/var/lib/dialysis/db.json"));
        assert_eq!(config.store.backup_dir, PathBuf::from("data/backups"));
        assert_eq!(config.staff.technicians, vec!["Anil".to_string()]);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
