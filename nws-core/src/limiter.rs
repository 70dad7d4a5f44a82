use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep_until};

/// Minimum spacing between requests to the upstream host.
///
/// Serializes callers on a single "earliest next dispatch" slot: `acquire`
/// waits until the slot time has passed, then reserves the next one. The
/// lock is held across the wait, so concurrent callers proceed in
/// lock-acquisition order and no call is dispatched before its wait elapses.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, next_dispatch: Mutex::new(None) }
    }

    /// Wait until a request may be dispatched, then reserve the next slot.
    pub async fn acquire(&self) {
        let mut next = self.next_dispatch.lock().await;

        if let Some(at) = *next {
            sleep_until(at).await;
        }

        *next = Some(Instant::now() + self.min_interval);
    }
}
