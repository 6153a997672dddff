//! Environment abstraction for deterministic testing.
//!
//! Decouples the session's keep-alive timing from the wall clock so tests can
//! drive `tick()` with synthetic instants instead of sleeping in real time.

use std::time::Duration;

/// Abstract environment providing monotonic time and sleep for the I/O task.
///
/// # Safety
///
/// Implementations MUST guarantee `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the only async method in the trait; only the I/O task driving
    /// the session should call it, never the state machine itself.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Production [`Environment`] backed by `std::time::Instant` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
