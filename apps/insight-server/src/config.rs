use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jsonschema::validator_for;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "configs/insight.toml";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{path} does not match the config schema: {errors}")]
    Schema { path: PathBuf, errors: String },
    #[error("invalid {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// On-disk configuration. Every key is optional; env vars win over the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    /// Listen address.
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Directory holding the SQLite datastore.
    #[serde(default)]
    pub state_dir: Option<String>,
    /// Maximum number of requests served concurrently.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub http_max_conc: Option<usize>,
    /// Require a bearer session on dashboard routes.
    #[serde(default)]
    pub require_session: Option<bool>,
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub session_ttl_secs: Option<u64>,
    #[serde(default)]
    pub sqlite_busy_ms: Option<u64>,
    /// Allowed CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_allow_origins: Option<Vec<String>>,
}

impl FileConfig {
    pub fn schema_json() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(FileConfig)).unwrap_or_default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let parse_err = |source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let raw: toml::Value = toml::from_str(content).map_err(parse_err)?;
        let schema_err = |errors: String| ConfigError::Schema {
            path: path.to_path_buf(),
            errors,
        };
        let json_value = serde_json::to_value(&raw).map_err(|e| schema_err(e.to_string()))?;
        let validator =
            validator_for(&Self::schema_json()).map_err(|e| schema_err(e.to_string()))?;
        let validation_errors: Vec<String> = validator
            .iter_errors(&json_value)
            .map(|e| e.to_string())
            .collect();
        if !validation_errors.is_empty() {
            return Err(schema_err(validation_errors.join(", ")));
        }
        toml::from_str(content).map_err(parse_err)
    }
}

/// Effective server settings after merging file and environment.
#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub addr: SocketAddr,
    pub state_dir: PathBuf,
    pub concurrency_limit: usize,
    pub require_session: bool,
    pub session_ttl: chrono::Duration,
    pub sqlite_busy: Duration,
    pub cors_allow_origins: Vec<String>,
    pub source: Option<PathBuf>,
}

impl ServerConfig {
    /// Read the config file (if any) and apply `INSIGHT_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let (path, explicit) = match std::env::var("INSIGHT_CONFIG") {
            Ok(path) if !path.trim().is_empty() => (PathBuf::from(path), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        let file = if explicit || path.exists() {
            let file = FileConfig::load(&path)?;
            info!(path = %path.display(), "loaded server config");
            Some((file, path))
        } else {
            None
        };
        let (file, source) = match file {
            Some((file, path)) => (file, Some(path)),
            None => (FileConfig::default(), None),
        };
        let mut cfg = Self::resolve(file, |key| std::env::var(key).ok())?;
        cfg.source = source;
        Ok(cfg)
    }

    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = env("INSIGHT_BIND")
            .or(file.bind)
            .unwrap_or_else(|| "127.0.0.1".into());
        let port = match env("INSIGHT_PORT") {
            Some(raw) => parse_num::<u16>("INSIGHT_PORT", raw)?,
            None => file.port.unwrap_or(5000),
        };
        let addr = format!("{bind}:{port}")
            .parse()
            .or_else(|_| format!("[{bind}]:{port}").parse())
            .map_err(|_| ConfigError::InvalidValue {
                key: "INSIGHT_BIND",
                value: bind.clone(),
            })?;
        let state_dir = env("INSIGHT_STATE_DIR")
            .or(file.state_dir)
            .unwrap_or_else(|| "state".into());
        let concurrency_limit = match env("INSIGHT_HTTP_MAX_CONC") {
            Some(raw) => parse_num::<usize>("INSIGHT_HTTP_MAX_CONC", raw)?,
            None => file.http_max_conc.unwrap_or(1024),
        };
        if concurrency_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INSIGHT_HTTP_MAX_CONC",
                value: "0".into(),
            });
        }
        let require_session = match env("INSIGHT_REQUIRE_SESSION") {
            Some(raw) => parse_flag("INSIGHT_REQUIRE_SESSION", raw)?,
            None => file.require_session.unwrap_or(false),
        };
        let ttl_secs = match env("INSIGHT_SESSION_TTL_SECS") {
            Some(raw) => parse_num::<u64>("INSIGHT_SESSION_TTL_SECS", raw)?,
            None => file.session_ttl_secs.unwrap_or(86_400),
        };
        let ttl_secs = i64::try_from(ttl_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidValue {
                key: "INSIGHT_SESSION_TTL_SECS",
                value: ttl_secs.to_string(),
            })?;
        let busy_ms = match env("INSIGHT_SQLITE_BUSY_MS") {
            Some(raw) => parse_num::<u64>("INSIGHT_SQLITE_BUSY_MS", raw)?,
            None => file.sqlite_busy_ms.unwrap_or(5000),
        };
        let cors_allow_origins = match env("INSIGHT_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => file.cors_allow_origins.unwrap_or_default(),
        };
        Ok(Self {
            addr,
            state_dir: PathBuf::from(state_dir),
            concurrency_limit,
            require_session,
            session_ttl: chrono::Duration::seconds(ttl_secs),
            sqlite_busy: Duration::from_millis(busy_ms),
            cors_allow_origins,
            source: None,
        })
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}

fn parse_flag(key: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: raw }),
    }
}
