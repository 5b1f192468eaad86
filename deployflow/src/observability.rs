//! Tracing setup and timing helpers.

use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(default_filter: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    result.is_ok()
}

/// Measures one named phase (composition, rendering) in milliseconds.
#[derive(Debug)]
pub struct SpanTimer {
    started: Instant,
    phase: &'static str,
}

impl SpanTimer {
    /// Starts timing `phase`.
    #[must_use]
    pub fn start(phase: &'static str) -> Self {
        Self {
            started: Instant::now(),
            phase,
        }
    }

    /// The phase being timed.
    #[must_use]
    pub const fn phase(&self) -> &'static str {
        self.phase
    }

    /// Stops the timer, logs the duration at `DEBUG` and returns it.
    #[must_use]
    pub fn finish(self) -> f64 {
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        debug!(phase = self.phase, duration_ms, "Phase finished");
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("render");
        assert_eq!(timer.phase(), "render");
        assert!(timer.finish() >= 0.0);
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing("debug", false);
        assert!(!init_tracing("debug", true));
    }
}
