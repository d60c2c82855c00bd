//! Configuration system for the `TaskSteer` server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasksteer/config.toml`)
//! 4. Compiled defaults

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A configured base URL is not a valid absolute URL.
    #[error("invalid {field} URL {value:?}: {source}")]
    InvalidUrl {
        /// Setting the URL came from.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Parser error.
        source: url::ParseError,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    ai: AiFileConfig,
    auth: AuthFileConfig,
    store: StoreFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    max_upload_size: Option<usize>,
    cors_origins: Option<Vec<String>>,
}

/// `[ai]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AiFileConfig {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// `[auth]` section. `[auth.tokens]` maps a literal bearer token to an identity.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthFileConfig {
    firebase_api_key: Option<String>,
    identity_base_url: Option<String>,
    tokens: BTreeMap<String, StaticIdentity>,
}

/// `[store]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    data_file: Option<PathBuf>,
}

/// Identity bound to a static token in `[auth.tokens]`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct StaticIdentity {
    /// User id reported for the token.
    pub uid: String,
    /// Email reported for the token, if any.
    #[serde(default)]
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "TaskSteer transcript-to-task server")]
pub struct CliArgs {
    /// Address to bind the HTTP server to.
    #[arg(short, long, env = "TASKSTEER_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/tasksteer/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API key for the generative model.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Model name, e.g. `gemini-1.5-flash`.
    #[arg(long)]
    pub model: Option<String>,

    /// Web API key used to verify identity-provider ID tokens.
    #[arg(long, env = "FIREBASE_API_KEY", hide_env_values = true)]
    pub firebase_api_key: Option<String>,

    /// JSON snapshot file for the document store.
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKSTEER_LOG")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Maximum accepted request body for uploads, in bytes.
    pub max_upload_size: usize,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Generative model settings.
    pub ai: AiConfig,
    /// Token verification settings.
    pub auth: AuthConfig,
    /// Snapshot file for the document store; memory only when `None`.
    pub data_file: Option<PathBuf>,
    /// Log level filter string.
    pub log_level: String,
    /// Optional log file path.
    pub log_file: Option<PathBuf>,
}

/// Generative model settings.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API key; the model is disabled when `None`.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Token verification settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Web API key for the identity provider's token lookup.
    pub firebase_api_key: Option<String>,
    pub identity_base_url: String,
    /// Static tokens, used when no identity provider key is configured.
    pub tokens: BTreeMap<String, StaticIdentity>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_upload_size: 16 * 1024 * 1024,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5500".to_string(),
            ],
            ai: AiConfig {
                api_key: None,
                model: "gemini-1.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                timeout_secs: 60,
            },
            auth: AuthConfig {
                firebase_api_key: None,
                identity_base_url: "https://identitytoolkit.googleapis.com".to_string(),
                tokens: BTreeMap::new(),
            },
            data_file: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and missing file
    /// is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if a base URL is malformed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, file);
        config.validate()?;
        Ok(config)
    }

    /// Resolve a `ServerConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            max_upload_size: file
                .server
                .max_upload_size
                .unwrap_or(defaults.max_upload_size),
            cors_origins: file.server.cors_origins.unwrap_or(defaults.cors_origins),
            ai: AiConfig {
                api_key: cli.gemini_api_key.clone().or(file.ai.api_key),
                model: cli
                    .model
                    .clone()
                    .or(file.ai.model)
                    .unwrap_or(defaults.ai.model),
                base_url: file.ai.base_url.unwrap_or(defaults.ai.base_url),
                timeout_secs: file.ai.timeout_secs.unwrap_or(defaults.ai.timeout_secs),
            },
            auth: AuthConfig {
                firebase_api_key: cli.firebase_api_key.clone().or(file.auth.firebase_api_key),
                identity_base_url: file
                    .auth
                    .identity_base_url
                    .unwrap_or(defaults.auth.identity_base_url),
                tokens: file.auth.tokens,
            },
            data_file: cli.data_file.clone().or(file.store.data_file),
            log_level: cli.log_level.clone(),
            log_file: cli.log_file.clone(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ai.base_url", &self.ai.base_url),
            ("auth.identity_base_url", &self.auth.identity_base_url),
        ] {
            url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                field,
                value: value.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("tasksteer").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
