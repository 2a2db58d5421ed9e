//! Server configuration
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! YAML file, and `JUDGE_*` environment variables. The binary applies its
//! command-line flags on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{DEFAULT_MIN_POINTS_TO_CREATE, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_TTL_SECS};
use crate::utils::paths::get_data_dir;

/// Config files larger than this are refused
const MAX_CONFIG_BYTES: u64 = 1_048_576;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config {path} too large: {size} bytes (max 1MB)")]
    TooLarge { path: PathBuf, size: u64 },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the JSONL tables
    pub data_dir: Option<PathBuf>,
    /// 0 keeps fragments until a mutation deletes them
    pub fragment_cache_ttl_secs: u64,
    pub min_points_to_create: f64,
    pub session_cookie_name: String,
    /// Login lifetime; 0 keeps sessions until logout
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            data_dir: None,
            fragment_cache_ttl_secs: 3600,
            min_points_to_create: DEFAULT_MIN_POINTS_TO_CREATE,
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: ServerConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise start from defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Override fields from `JUDGE_API_HOST`, `JUDGE_API_PORT`, `JUDGE_DATA_DIR`
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())?;
        Ok(self)
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = var("JUDGE_API_HOST") {
            self.host = host;
        }
        if let Some(port) = var("JUDGE_API_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "JUDGE_API_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(dir) = var("JUDGE_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_points_to_create.is_finite() || self.min_points_to_create < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_points_to_create must be a non-negative number, got {}",
                self.min_points_to_create
            )));
        }
        if self.session_cookie_name.is_empty()
            || !self
                .session_cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid(format!(
                "invalid session_cookie_name '{}'",
                self.session_cookie_name
            )));
        }
        Ok(())
    }

    pub fn fragment_cache_ttl(&self) -> Option<Duration> {
        match self.fragment_cache_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        match self.session_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Configured data directory, or `<judge_root>/data`
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_data_dir().map_err(ConfigError::Invalid),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the server is reachable from other machines
    pub fn is_network_exposed(&self) -> bool {
        self.host != "127.0.0.1" && self.host != "localhost" && self.host != "::1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(&path, "port: 8080\nmin_points_to_create: 10\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.min_points_to_create, 10.0);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.session_cookie_name, "judge_session");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load_or_default(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(&path, "port: [not a number\n").unwrap();

        assert!(matches!(ServerConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JUDGE_API_HOST", "0.0.0.0"),
            ("JUDGE_API_PORT", "9000"),
            ("JUDGE_DATA_DIR", "/tmp/judge"),
        ]);
        let mut config = ServerConfig::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/judge")));
        assert!(config.is_network_exposed());
    }

    #[test]
    fn test_bad_port_env_rejected() {
        let mut config = ServerConfig::default();
        let result = config.apply_vars(|name| (name == "JUDGE_API_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_non_finite_min_points_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");

        for value in [".nan", ".inf", "-1"] {
            fs::write(&path, format!("min_points_to_create: {}\n", value)).unwrap();
            assert!(
                matches!(ServerConfig::load(&path), Err(ConfigError::Invalid(_))),
                "{}",
                value
            );
        }
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = ServerConfig {
            fragment_cache_ttl_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.fragment_cache_ttl(), None);
    }

    #[test]
    fn test_sessions_expire_after_two_weeks_by_default() {
        let config = ServerConfig::default();
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(14 * 24 * 60 * 60)));

        let forever = ServerConfig {
            session_ttl_secs: 0,
            ..ServerConfig::default()
        };
        assert_eq!(forever.session_ttl(), None);
    }
}
