//! Logging configuration for rule execution.
//!
//! All diagnostics in this crate go through `tracing`. Evaluation outcomes are
//! emitted at a level derived from the rule's impact (see
//! [`ValidationSession::evaluate`](crate::core::ValidationSession::evaluate)); the
//! [`LogConfig`] attached to a session controls the optional per-rule detail
//! events and how large logged values may get.

use tracing::Level;

/// Logging configuration for a validation session.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for rule execution events
    pub base_level: Level,
    /// Whether to log each rule's counts after execution
    pub log_rule_details: bool,
    /// Whether to include failing items in rule detail events
    pub log_failing_items: bool,
    /// Maximum length for logged field values
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_rule_details: false,
            log_failing_items: false,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Logs every rule's counts and failing items at debug level.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_rule_details: true,
            log_failing_items: true,
            max_field_length: 1024,
        }
    }

    /// Warnings and errors only, with short fields.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_rule_details: false,
            log_failing_items: false,
            max_field_length: 128,
        }
    }

    /// Same as [`LogConfig::default`].
    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Debug logging that is skipped entirely when the configured level is above DEBUG.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Conditional per-rule detail logging.
#[macro_export]
macro_rules! log_rule {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rule_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, respecting char boundaries.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber installation helpers.
pub mod setup {
    use crate::error::{Result, TermError};
    use tracing::Level;

    /// Configuration for installing a global `tracing` subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Default level for every target
        pub level: Level,
        /// Log level for the `term_rules` target
        pub rules_level: Level,
        /// Emit one JSON object per event
        pub json_format: bool,
        /// Replaces the generated filter directive when set
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                rules_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON output, warnings from dependencies, rule evaluation at info.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                rules_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Plain output at debug level.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                rules_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the default level.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for rule execution.
        pub fn with_rules_level(mut self, level: Level) -> Self {
            self.rules_level = level;
            self
        }

        /// Switches between JSON and plain output.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Uses `filter` verbatim as the filter directive.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// The `EnvFilter` directive, e.g. `info,term_rules=debug`.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},term_rules={}",
                    self.level.as_str().to_lowercase(),
                    self.rules_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global subscriber with an `EnvFilter` and a plain or JSON fmt layer.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// ```rust,no_run
    /// use term_rules::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TermError::Configuration(format!("Failed to install subscriber: {e}")))
    }
}
