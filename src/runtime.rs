//! Runtime - timers behind the retry delay

use async_trait::async_trait;
use std::time::Duration;

/// Something that can wait. The retry delay is the only timed suspension point.
#[async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

/// Returns immediately. For tests and the simulator's `--no-delay` mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateTimer;

#[async_trait(?Send)]
impl Timer for ImmediateTimer {
    async fn sleep(&self, _duration: Duration) {}
}

/// tokio-backed timer (native)
#[cfg(feature = "native")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[cfg(feature = "native")]
#[async_trait(?Send)]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
