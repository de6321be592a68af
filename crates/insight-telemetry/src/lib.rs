//! Tracing subscriber setup shared by the dashboard binaries.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target used for one-line-per-request access events.
pub const ACCESS_TARGET: &str = "http.access";

static ACCESS_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

impl Rotation {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hourly" => Rotation::Hourly,
            "minutely" => Rotation::Minutely,
            _ => Rotation::Daily,
        }
    }
}

/// Rolling access-log settings read from `INSIGHT_ACCESS_LOG_*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogFile {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: Rotation,
}

impl AccessLogFile {
    /// `None` unless `INSIGHT_ACCESS_LOG_ROLL=1`.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        if get("INSIGHT_ACCESS_LOG_ROLL").as_deref() != Some("1") {
            return None;
        }
        let dir = get("INSIGHT_ACCESS_LOG_DIR")
            .or_else(|| get("INSIGHT_LOGS_DIR"))
            .unwrap_or_else(|| "logs".to_string());
        Some(Self {
            dir: PathBuf::from(dir),
            prefix: get("INSIGHT_ACCESS_LOG_PREFIX").unwrap_or_else(|| "http-access".into()),
            rotation: Rotation::parse(
                &get("INSIGHT_ACCESS_LOG_ROTATION").unwrap_or_else(|| "daily".into()),
            ),
        })
    }
}

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(fmt::layer().with_filter(filter));
    match AccessLogFile::from_env() {
        Some(access) => {
            if std::fs::create_dir_all(&access.dir).is_err() {
                tracing::warn!(directory = %access.dir.display(), "failed to create access log directory");
            }
            let writer = match access.rotation {
                Rotation::Hourly => tracing_appender::rolling::hourly(&access.dir, &access.prefix),
                Rotation::Minutely => {
                    tracing_appender::rolling::minutely(&access.dir, &access.prefix)
                }
                Rotation::Daily => tracing_appender::rolling::daily(&access.dir, &access.prefix),
            };
            let (nb, guard) = tracing_appender::non_blocking(writer);
            let _ = ACCESS_GUARD.set(guard);
            let targets = Targets::new().with_target(ACCESS_TARGET, tracing::Level::INFO);
            let access_layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(nb)
                .with_filter(targets);
            let _ = registry.with(access_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}
