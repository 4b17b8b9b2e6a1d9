//! Utility functions and helpers for testing.

use std::future::Future;
use std::time::Duration;

use tracing::info;

/// Utilities for timing and performance measurement.
pub mod timing {
    use std::time::{Duration, Instant};

    /// Wall-clock timer for measuring request and test latencies.
    #[derive(Debug, Clone, Copy)]
    pub struct LatencyTimer {
        start: Instant,
    }

    impl LatencyTimer {
        /// Start a new latency measurement.
        pub fn start() -> Self {
            Self { start: Instant::now() }
        }

        /// Get elapsed time in milliseconds.
        pub fn elapsed_millis(&self) -> u64 {
            self.start.elapsed().as_millis() as u64
        }

        /// Get elapsed time in microseconds.
        pub fn elapsed_micros(&self) -> u64 {
            self.start.elapsed().as_micros() as u64
        }

        /// Get elapsed duration.
        pub fn elapsed(&self) -> Duration {
            self.start.elapsed()
        }
    }

    impl Default for LatencyTimer {
        fn default() -> Self {
            Self::start()
        }
    }
}

/// Await `fut` and return its output together with how long it took.
pub async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let timer = timing::LatencyTimer::start();
    let output = fut.await;
    (output, timer.elapsed())
}

/// Await a test body and log how long it took under `name`.
pub async fn measure_performance<F: Future>(name: &str, fut: F) -> F::Output {
    let (output, elapsed) = timed(fut).await;
    info!(
        test = name,
        elapsed_ms = elapsed.as_millis() as u64,
        "Test {} took {:.4} seconds",
        name,
        elapsed.as_secs_f64()
    );
    output
}
