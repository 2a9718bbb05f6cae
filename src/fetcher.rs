use std::time::Duration;

use rand::{Rng, SeedableRng};

use crate::{
    error::{CycleError, FetchError},
    steam::{RawPage, SearchApi, SearchPage},
    store::ListingStore,
    upsert, Context,
};

const TOO_MANY_REQUESTS: u16 = 429;
const OK: u16 = 200;

/// Where the walk over one app's listings currently stands
#[derive(Debug, Clone, PartialEq)]
pub struct FetchProgress {
    pub page: usize,
    pub fetched: usize,
    /// The total most recently reported by the server
    pub total: usize,
}

impl FetchProgress {
    fn new() -> Self {
        // A total of 1 makes sure the first page is always requested
        Self {
            page: 1,
            fetched: 0,
            total: 1,
        }
    }

    fn is_done(&self) -> bool {
        self.fetched >= self.total
    }

    fn advance(&mut self, page: &SearchPage) {
        self.total = page.total_count;
        self.fetched += page.results.len();
        self.page += 1;
    }
}

#[derive(Debug)]
pub enum PageOutcome {
    Success(SearchPage),
    Throttled,
    Fatal(FetchError),
}

/// Interprets the raw response for the given page
pub fn classify(page: usize, raw: RawPage) -> PageOutcome {
    match raw.status {
        TOO_MANY_REQUESTS => return PageOutcome::Throttled,
        OK => {}
        status => return PageOutcome::Fatal(FetchError::Status { page, status }),
    };

    if raw.body.iter().all(u8::is_ascii_whitespace) {
        return PageOutcome::Fatal(FetchError::EmptyResponse { page });
    }

    let parsed: SearchPage = match serde_json::from_slice(&raw.body) {
        Ok(p) => p,
        Err(source) => return PageOutcome::Fatal(FetchError::Malformed { page, source }),
    };

    if !parsed.success {
        return PageOutcome::Fatal(FetchError::Unsuccessful { page });
    }

    PageOutcome::Success(parsed)
}

async fn request_page<A, S>(ctx: &Context<A, S>, app: u32, progress: &FetchProgress) -> PageOutcome
where
    A: SearchApi,
{
    let start = progress.fetched;
    let count = ctx.config.page_size();

    let raw = ctx
        .limiter
        .submit(|| ctx.api.search(app, start, count))
        .await;

    match raw {
        Ok(raw) => classify(progress.page, raw),
        Err(source) => PageOutcome::Fatal(FetchError::Transport {
            page: progress.page,
            source,
        }),
    }
}

/// Walks every page of listings for `app`, writing each page to the store before requesting
/// the next one.
#[tracing::instrument(skip(ctx))]
pub async fn fetch_all<A, S>(ctx: &Context<A, S>, app: u32) -> Result<FetchProgress, CycleError>
where
    A: SearchApi,
    S: ListingStore,
{
    let mut rng = rand::rngs::SmallRng::from_entropy();
    let app_label = app.to_string();

    let mut progress = FetchProgress::new();
    while !progress.is_done() {
        if let Some(max_pages) = ctx.config.max_pages {
            if progress.page > max_pages {
                return Err(FetchError::PageLimit { pages: max_pages }.into());
            }
        }

        let page = match request_page(ctx, app, &progress).await {
            PageOutcome::Success(page) => page,
            PageOutcome::Throttled => {
                let wait = cooldown(ctx, &mut rng);
                tracing::warn!(
                    page = progress.page,
                    start = progress.fetched,
                    "Too many requests, retrying in {:?}",
                    wait
                );
                ctx.metrics.throttled.with_label_values(&[&app_label]).inc();

                tokio::time::sleep(wait).await;
                continue;
            }
            PageOutcome::Fatal(e) => {
                tracing::debug!("Loading page {} {:?}", progress.page, e);
                return Err(e.into());
            }
        };

        upsert::upsert_page(ctx, &page.results).await?;

        let loaded = page.results.len();
        progress.advance(&page);

        ctx.metrics.pages_fetched.with_label_values(&[&app_label]).inc();
        ctx.metrics
            .items_upserted
            .with_label_values(&[&app_label])
            .inc_by(loaded as u64);

        if loaded == 0 && !progress.is_done() {
            tracing::warn!(
                fetched = progress.fetched,
                total = progress.total,
                "Page returned no items before reaching the total"
            );
        } else {
            tracing::info!(
                fetched = progress.fetched,
                total = progress.total,
                "Stored {} items",
                loaded
            );
        }
    }

    Ok(progress)
}

fn cooldown<A, S>(ctx: &Context<A, S>, rng: &mut rand::rngs::SmallRng) -> Duration {
    let jitter = match ctx.config.cooldown_jitter {
        0 => 0,
        max => rng.gen_range(0..=max),
    };

    ctx.config.cooldown() + Duration::from_millis(jitter)
}
