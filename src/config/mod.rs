/// Configuration management for Flowkeep
///
/// Handles server configuration, the local database, the remote backend and
/// the implicit workflow secret.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Remote backend used for hosted/backup workflows
    pub backend: BackendConfig,
    /// Secrets used by the lifecycle manager
    pub secrets: SecretsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Local database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding `flowkeep.db` (default: "data")
    pub data_dir: String,
}

/// Remote backend configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend API
    pub url: String,
    /// Bearer token sent with every request, if any
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Secrets configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Implicit passphrase for protected workflows imported without `pass`
    #[serde(default, skip_serializing)]
    pub workflow_secret: Option<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("workflow_secret", &self.workflow_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("FLOWKEEP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("FLOWKEEP_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            database: DatabaseConfig {
                data_dir: std::env::var("FLOWKEEP_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            },
            backend: BackendConfig {
                url: std::env::var("FLOWKEEP_BACKEND_URL")
                    .unwrap_or_else(|_| "http://localhost:8787".to_string()),
                token: std::env::var("FLOWKEEP_BACKEND_TOKEN").ok().filter(|t| !t.is_empty()),
            },
            secrets: SecretsConfig {
                workflow_secret: std::env::var("FLOWKEEP_WORKFLOW_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty()),
            },
        }
    }
}

impl Config {
    /// Path of the SQLite database file
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.database.data_dir).join("flowkeep.db")
    }
}
