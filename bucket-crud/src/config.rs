//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: BUCKET_CRUD_, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/bucket-crud/{service_name}/config.toml
//! 4. System directory: /etc/bucket-crud/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "notes-api"
//! port = 3000
//!
//! [crud]
//! default_per_page = 25
//! total_count_header = false
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const APP_DIR: &str = "bucket-crud";
const ENV_PREFIX: &str = "BUCKET_CRUD_";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// CRUD handler configuration
    #[serde(default)]
    pub crud: CrudConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings shared by every [`Crud`](crate::handlers::Crud) resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudConfig {
    /// Page size when `_perPage` is missing or invalid
    #[serde(default = "default_per_page")]
    pub default_per_page: usize,

    /// Largest page size a client may request
    #[serde(default = "default_max_per_page")]
    pub max_per_page: usize,

    /// Largest JSON body buffered by the decoder
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,

    /// Emit `X-Total-Count` on listings
    #[serde(default = "default_true")]
    pub total_count_header: bool,
}

impl Default for CrudConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            body_limit_bytes: default_body_limit_bytes(),
            total_count_header: default_true(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_per_page() -> usize {
    10
}

fn default_max_per_page() -> usize {
    100
}

fn default_body_limit_bytes() -> usize {
    crate::handlers::DEFAULT_BODY_LIMIT
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is taken from the running binary's file name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| APP_DIR.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut defaults = Config::default();
        defaults.service.name = service_name.to_string();
        let mut figment = Figment::new().merge(Serialized::defaults(defaults));

        // Lowest priority first so later merges win
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Skips the search path; environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let relative = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg::BaseDirectories::with_prefix(APP_DIR).find_config_file(&relative) {
            paths.push(path);
        }

        paths.push(Path::new("/etc").join(APP_DIR).join(relative));
        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_DIR.to_string(),
                port: default_port(),
                log_level: default_log_level(),
            },
            crud: CrudConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.name, "bucket-crud");
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.crud.default_per_page, 10);
        assert_eq!(config.crud.max_per_page, 100);
        assert_eq!(config.crud.body_limit_bytes, 2 * 1024 * 1024);
        assert!(config.crud.total_count_header);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "notes-api"
port = 3000

[crud]
default_per_page = 25
total_count_header = false
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "notes-api");
        assert_eq!(config.service.port, 3000);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.crud.default_per_page, 25);
        assert_eq!(config.crud.max_per_page, 100);
        assert!(!config.crud.total_count_header);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.crud, CrudConfig::default());
    }

    #[test]
    fn test_load_from_rejects_bad_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nport = \"eighty\"").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_config_paths_order() {
        let paths = Config::find_config_paths("notes-api");
        assert_eq!(paths.first(), Some(&PathBuf::from("config.toml")));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/bucket-crud/notes-api/config.toml"))
        );
    }
}
