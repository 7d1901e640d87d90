//! Structured logging setup and startup helpers.
//!
//! [`init_tracing`] installs the global subscriber. [`OpTimer`] and the
//! `log_*!` macros give startup phases and slow operations a consistent
//! shape in the logs.

use std::time::Instant;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level` when set. Returns an error if a
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig, default_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }
    Ok(())
}

/// Logs how long a startup phase or oracle call took.
///
/// ```rust,ignore
/// use appliance_api::logging::OpTimer;
///
/// let timer = OpTimer::new("catalog", "open");
/// let catalog = SqliteCatalog::open(path).await?;
/// timer.finish();
/// ```
#[derive(Debug)]
pub struct OpTimer {
    component: &'static str,
    operation: &'static str,
    start: Instant,
}

impl OpTimer {
    #[must_use]
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        tracing::debug!(component, operation, "Operation started");
        Self {
            component,
            operation,
            start: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn finish(self) {
        tracing::info!(
            component = self.component,
            operation = self.operation,
            duration_ms = self.elapsed_ms(),
            "Operation completed"
        );
    }

    /// Like [`finish`](Self::finish), but logs the error at `error` level
    /// when the operation failed.
    pub fn finish_with_result<T, E: std::fmt::Display>(self, result: Result<&T, &E>) {
        let duration_ms = self.elapsed_ms();
        match result {
            Ok(_) => tracing::info!(
                component = self.component,
                operation = self.operation,
                duration_ms,
                "Operation completed"
            ),
            Err(e) => tracing::error!(
                component = self.component,
                operation = self.operation,
                duration_ms,
                error = %e,
                "Operation failed"
            ),
        }
    }
}

/// Log a numbered initialization step.
///
/// ```rust,ignore
/// log_init_step!(1, 5, "Oracle", "fixture + gemini-2.5-flash");
/// ```
#[macro_export]
macro_rules! log_init_step {
    ($step:expr, $total:expr, $name:expr, $detail:expr) => {
        tracing::info!(
            step = $step,
            total = $total,
            "[{}/{}] {} - {}",
            $step,
            $total,
            $name,
            $detail
        );
    };
    ($step:expr, $total:expr, $name:expr) => {
        tracing::info!(step = $step, total = $total, "[{}/{}] {}", $step, $total, $name);
    };
}

/// Log a warning during initialization.
#[macro_export]
macro_rules! log_init_warning {
    ($msg:expr) => {
        tracing::warn!("⚠️  {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        tracing::warn!("⚠️  {}", format!($msg, $($arg)*));
    };
}

/// Log successful completion of a major phase.
#[macro_export]
macro_rules! log_success {
    ($msg:expr) => {
        tracing::info!("✅ {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        tracing::info!("✅ {}", format!($msg, $($arg)*));
    };
}

/// Log a startup banner.
#[macro_export]
macro_rules! log_banner {
    ($title:expr) => {
        tracing::info!("═══════════════════════════════════════════════════");
        tracing::info!("  {}", $title);
        tracing::info!("═══════════════════════════════════════════════════");
    };
    ($title:expr, $subtitle:expr) => {
        tracing::info!("═══════════════════════════════════════════════════");
        tracing::info!("  {}", $title);
        tracing::info!("  {}", $subtitle);
        tracing::info!("═══════════════════════════════════════════════════");
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_timer_creation() {
        let timer = OpTimer::new("catalog", "open");
        assert_eq!(timer.component, "catalog");
        assert_eq!(timer.operation, "open");
    }

    #[test]
    fn test_op_timer_finish_with_result() {
        let ok: Result<i32, String> = Ok(42);
        OpTimer::new("oracle", "extract").finish_with_result(ok.as_ref());

        let err: Result<i32, String> = Err("quota exceeded".to_string());
        OpTimer::new("oracle", "extract").finish_with_result(err.as_ref());
    }
}
