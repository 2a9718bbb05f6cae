use std::{future::Future, time::Duration};

use tokio::{sync::Mutex, time::Instant};

/// Spaces out the start of outgoing requests.
///
/// Callers are served in the order they called [`RateLimiter::submit`], as the tokio mutex hands
/// out its guard first-come-first-served. The guard is only held until the request is allowed to
/// start, so a slow request does not delay the next dispatch beyond the interval.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn submit<F, Fut, T>(&self, request: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        {
            let mut last_dispatch = self.last_dispatch.lock().await;
            if let Some(previous) = *last_dispatch {
                let next_slot = previous + self.interval;
                if next_slot > Instant::now() {
                    tracing::trace!("Waiting {:?} for next request slot", next_slot - Instant::now());
                    tokio::time::sleep_until(next_slot).await;
                }
            }
            *last_dispatch = Some(Instant::now());
        }

        request().await
    }
}
