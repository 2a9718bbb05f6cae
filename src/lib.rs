use std::sync::Arc;

pub mod config;
pub mod error;
pub mod fetcher;
pub mod limiter;
pub mod metrics;
pub mod scheduler;
pub mod steam;
pub mod store;
pub mod upsert;
pub mod watermark;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use metrics::Metrics;

/// Everything a cycle needs to talk to the outside world
pub struct Context<A, S> {
    pub api: A,
    pub store: S,
    /// Shared by every app, so it bounds the overall request rate
    pub limiter: Arc<limiter::RateLimiter>,
    pub config: Arc<Config>,
    pub metrics: Metrics,
}

impl<A, S> Context<A, S> {
    pub fn new(api: A, store: S, config: Arc<Config>, metrics: Metrics) -> Self {
        let limiter = Arc::new(limiter::RateLimiter::new(config.rate_limit_interval()));

        Self {
            api,
            store,
            limiter,
            config,
            metrics,
        }
    }
}
