//! Tokio-based clock implementation.

use async_trait::async_trait;
use std::time::Duration;

use crate::traits::Clock;

/// Production clock sleeping on the Tokio timer.
///
/// ```rust
/// use lz_bridge::providers::TokioClock;
///
/// let clock = TokioClock::new();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
