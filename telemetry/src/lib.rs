//! Standardized tracing setup for slot-switch.
//!
//! Start with [`TelemetryConfig::new()`]. Logs always go to stderr, stdout
//! belongs to the program's own output.

use std::io::{IsTerminal as _, Write as _};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// The toplevel config for the telemetry crate. Start here.
#[derive(Debug)]
pub struct TelemetryConfig {
    global_filter: EnvFilter,
    ansi: bool,
}

impl TelemetryConfig {
    /// Defaults to `INFO`, overridable with `RUST_LOG`.
    #[expect(clippy::new_without_default, reason = "may add required args later")]
    #[must_use]
    pub fn new() -> Self {
        Self {
            global_filter: default_filter(LevelFilter::INFO),
            ansi: std::io::stderr().is_terminal(),
        }
    }

    /// Changes the level used when `RUST_LOG` is not set.
    #[must_use]
    pub fn with_default_level(self, level: LevelFilter) -> Self {
        Self {
            global_filter: default_filter(level),
            ..self
        }
    }

    /// Override the global filter to a custom filter.
    #[must_use]
    pub fn with_global_filter(self, filter: EnvFilter) -> Self {
        Self {
            global_filter: filter,
            ..self
        }
    }

    pub fn try_init(
        self,
    ) -> Result<TelemetryFlusher, tracing_subscriber::util::TryInitError> {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(self.ansi);

        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(self.global_filter)
            .try_init()?;

        Ok(TelemetryFlusher { _priv: () })
    }

    /// Initializes the telemetry config. Call this only once, at the beginning of the
    /// program.
    ///
    /// Calling this more than once or when another tracing subscriber is registered
    /// will cause a panic.
    pub fn init(self) -> TelemetryFlusher {
        self.try_init().expect("failed to initialize telemetry")
    }
}

fn default_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Allows flushing all telemetry logs.
#[must_use = "call .flush at the end of the program to flush logs, otherwise they may get lost"]
#[derive(Debug)]
pub struct TelemetryFlusher {
    _priv: (),
}

impl TelemetryFlusher {
    /// Call this at the end of the program.
    pub async fn flush(self) {
        self.flush_blocking();
    }

    /// Call this at the end of the program.
    pub fn flush_blocking(self) {
        // technically blocks, but no one really cares for stderr/out.
        std::io::stderr().flush().ok();
        std::io::stdout().flush().ok();
    }
}
