use std::time::Duration;

use tracing::Instrument;

use crate::{
    error::CycleError, fetcher, steam::SearchApi, store::ListingStore, watermark::WatermarkStore,
    Context,
};

/// How long to wait before the first cycle, given when the last one finished.
///
/// A watermark from the future is treated as "just finished".
pub fn initial_delay(now_millis: u64, watermark: u64, interval: Duration) -> Duration {
    let elapsed = Duration::from_millis(now_millis.saturating_sub(watermark));

    interval.saturating_sub(elapsed)
}

pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct Scheduler<A, S, W> {
    ctx: Context<A, S>,
    watermark: W,
}

impl<A, S, W> Scheduler<A, S, W>
where
    A: SearchApi,
    S: ListingStore,
    W: WatermarkStore,
{
    pub fn new(ctx: Context<A, S>, watermark: W) -> Self {
        Self { ctx, watermark }
    }

    pub fn context(&self) -> &Context<A, S> {
        &self.ctx
    }

    /// Loads the watermark and works out when the first cycle is due
    pub async fn first_delay(&self) -> Result<Duration, std::io::Error> {
        let watermark = self.watermark.load().await?;
        let delay = initial_delay(now_millis(), watermark, self.ctx.config.update_interval());

        tracing::info!(watermark, "First update in {:?}", delay);

        Ok(delay)
    }

    /// Runs cycles forever, starting after `first_delay`
    pub async fn run(&self, first_delay: Duration) {
        tokio::time::sleep(first_delay).await;

        loop {
            let next = self.run_once().await;

            tracing::info!("Next update in {:?}", next);
            tokio::time::sleep(next).await;
        }
    }

    /// Runs one cycle and records its outcome, returning how long to wait before the next one.
    ///
    /// The wait is always the full interval, no matter how the cycle went or how long it took.
    pub async fn run_once(&self) -> Duration {
        tracing::info!("Starting update");
        let start_time = tokio::time::Instant::now();

        let outcome = match self.run_cycle().await {
            Ok(()) => {
                let finished_at = now_millis();
                if let Err(e) = self.watermark.save(finished_at).await {
                    tracing::error!("Saving watermark {:?}", e);
                }

                self.ctx.metrics.last_update.set((finished_at / 1000) as f64);
                "success"
            }
            Err(e) => {
                tracing::error!("Update failed {:?}", e);
                "failure"
            }
        };

        let elapsed = start_time.elapsed();
        tracing::info!("Updating took {:?}", elapsed);

        self.ctx.metrics.cycles.with_label_values(&[outcome]).inc();
        self.ctx.metrics.cycle_duration.set(elapsed.as_secs_f64());

        self.ctx.config.update_interval()
    }

    /// Fetches every configured app in order, stopping at the first error
    pub async fn run_cycle(&self) -> Result<(), CycleError> {
        let apps = &self.ctx.config.apps;

        for (i, app) in apps.iter().enumerate() {
            let progress = fetcher::fetch_all(&self.ctx, *app)
                .instrument(tracing::info_span!(
                    "Updating App",
                    app,
                    current = i + 1,
                    total_apps = apps.len()
                ))
                .await?;

            tracing::info!(app, "Loaded {} items over {} pages", progress.fetched, progress.page - 1);
        }

        Ok(())
    }
}
