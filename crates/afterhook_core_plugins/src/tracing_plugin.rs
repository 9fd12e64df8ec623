//! Logging plugin.
//!
//! [`TracingPlugin`] installs a `tracing` subscriber in `ready()`, after every
//! plugin had a chance to read or replace the [`TracingConfig`] service it
//! registers in `build()`. An already installed global subscriber wins, which
//! keeps test binaries quiet.
//!
//! The hook engine logs under the `afterhook_dispatch` target:
//!
//! | Level | Events |
//! |-------|--------|
//! | `warn` | A hook failed, or a binding names no registered handler |
//! | `debug` | Dispatch summaries, skipped bindings, production skips |
//! | `trace` | Undeclared operations |

use afterhook_system::plugin::Plugin;
use afterhook_system::server::Server;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const FILTER_VAR: &str = "AFTERHOOK_LOG";
const FORMAT_VAR: &str = "AFTERHOOK_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line, human-readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event.
    Json,
}

impl TracingFormat {
    /// Parses `pretty`, `compact` or `json`, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration as installed.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Fallback level when no filter applies.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// `target=level` directives, if any.
    pub env_filter: Option<String>,
}

/// Installs a `tracing_subscriber` registry with an [`EnvFilter`].
///
/// ```
/// use afterhook_core_plugins::{TracingFormat, TracingPlugin};
/// use tracing::Level;
///
/// let plugin = TracingPlugin::default()
///     .with_level(Level::INFO)
///     .with_format(TracingFormat::Json)
///     .with_env_filter("afterhook_dispatch=debug,tokio=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingPlugin {
    /// Default configuration: `info`, pretty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `AFTERHOOK_LOG` (filter directives) and `AFTERHOOK_LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    ///
    /// Unknown formats keep the default.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut plugin = Self::default();
        if let Some(filter) = lookup(FILTER_VAR).filter(|filter| !filter.trim().is_empty()) {
            plugin.env_filter = Some(filter);
        }
        if let Some(format) = lookup(FORMAT_VAR).as_deref().and_then(TracingFormat::parse) {
            plugin.format = format;
        }
        plugin
    }

    /// Sets the fallback level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets `target=level` directives. An unparsable filter falls back to the level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Logs span enter and exit.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, server: &mut Server) {
        server.insert_service(TracingConfig {
            level: self.level,
            format: self.format,
            env_filter: self.env_filter.clone(),
        });
    }

    fn ready(&self, _server: &mut Server) {
        let layer = tracing_subscriber::fmt::layer().with_span_events(self.span_events());
        let registry = tracing_subscriber::registry().with(self.filter());
        let installed = match self.format {
            TracingFormat::Pretty => registry.with(layer.pretty()).try_init(),
            TracingFormat::Compact => registry.with(layer.compact()).try_init(),
            TracingFormat::Json => registry.with(layer.json()).try_init(),
        }
        .is_ok();

        tracing::debug!(level = %self.level, format = ?self.format, installed, "logging ready");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!(TracingFormat::parse(" JSON "), Some(TracingFormat::Json));
        assert_eq!(TracingFormat::parse("compact"), Some(TracingFormat::Compact));
        assert_eq!(TracingFormat::parse("yaml"), None);
    }

    #[test]
    fn environment_sets_filter_and_format() {
        let plugin = TracingPlugin::from_vars(vars(&[
            ("AFTERHOOK_LOG", "afterhook_dispatch=debug"),
            ("AFTERHOOK_LOG_FORMAT", "json"),
        ]));
        assert_eq!(plugin.env_filter.as_deref(), Some("afterhook_dispatch=debug"));
        assert_eq!(plugin.format, TracingFormat::Json);
    }

    #[test]
    fn blank_or_unknown_environment_keeps_defaults() {
        let plugin = TracingPlugin::from_vars(vars(&[
            ("AFTERHOOK_LOG", "  "),
            ("AFTERHOOK_LOG_FORMAT", "xml"),
        ]));
        assert_eq!(plugin.env_filter, None);
        assert_eq!(plugin.format, TracingFormat::Pretty);
        assert_eq!(plugin.level, Level::INFO);
    }

    #[test]
    fn config_service_mirrors_the_plugin() {
        let mut server = Server::new();
        server.add_plugins(
            TracingPlugin::new()
                .with_level(Level::DEBUG)
                .with_format(TracingFormat::Compact)
                .with_env_filter("afterhook_dispatch=warn")
                .with_span_events(true),
        );
        server.finish();

        let config = server
            .get_service::<TracingConfig>()
            .expect("config registered");
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, TracingFormat::Compact);
        assert_eq!(config.env_filter.as_deref(), Some("afterhook_dispatch=warn"));
    }
}
