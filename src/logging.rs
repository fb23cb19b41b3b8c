// ABOUTME: Log level handling and tracing subscriber setup
// ABOUTME: Validated level enumeration with runtime reload support

use std::sync::OnceLock;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter};

/// The validated log level enumeration. Unknown values fall back to `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    Verbose,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name; returns `None` for unknown values so the caller
    /// can warn before falling back.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "verbose" => Some(LogLevel::Verbose),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "trace",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

static RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Initialize the tracing subscriber. `RUST_LOG` wins over the requested
/// level. Safe to call more than once; later calls are no-ops.
pub fn init(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    let (filter_layer, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(false));

    if subscriber.try_init().is_ok() {
        let _ = RELOAD_HANDLE.set(handle);
    }
}

/// Initialize from a raw level name, warning on unknown values after the
/// subscriber is live.
pub fn init_from(raw: &str) {
    let parsed = LogLevel::parse(raw);
    init(parsed.unwrap_or_default());
    if parsed.is_none() {
        warn!(level = raw, "unknown log level, falling back to info");
    }
}

/// Adjust the active filter at runtime. Unknown values fall back to `info`
/// with a warning. Initializes the subscriber when none is active yet.
pub fn set_log_level(raw: &str) {
    let parsed = LogLevel::parse(raw);
    let level = parsed.unwrap_or_default();

    match RELOAD_HANDLE.get() {
        Some(handle) => {
            let _ = handle.reload(EnvFilter::new(level.as_filter()));
        }
        None => init(level),
    }

    if parsed.is_none() {
        warn!(level = raw, "unknown log level, falling back to info");
    }
}
