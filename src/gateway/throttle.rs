//! Request Throttle
//!
//! Process-wide minimum spacing between outbound sends. The last-send time
//! lives behind an async mutex so concurrent callers queue in FIFO order and
//! the spacing holds across all of them combined.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::config::ThrottleConfig;

pub struct RequestThrottle {
    min_spacing: Duration,
    last_send: Mutex<Option<Instant>>,
    request_count: AtomicU64,
}

impl RequestThrottle {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_send: Mutex::new(None),
            request_count: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.min_spacing())
    }

    /// Wait until a send is allowed, record it, and return its sequence number.
    ///
    /// Never fails. If the returned future is dropped mid-wait, no send is
    /// recorded.
    pub async fn acquire(&self) -> u64 {
        let mut last_send = self.last_send.lock().await;

        if let Some(previous) = *last_send {
            let ready_at = previous + self.min_spacing;
            let now = Instant::now();
            if ready_at > now {
                debug!(
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Throttling outbound request"
                );
                sleep_until(ready_at).await;
            }
        }

        *last_send = Some(Instant::now());
        self.request_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Sends recorded so far
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }
}
