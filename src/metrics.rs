#[derive(Debug, Clone)]
pub struct Metrics {
    pub pages_fetched: prometheus::IntCounterVec,
    pub items_upserted: prometheus::IntCounterVec,
    pub throttled: prometheus::IntCounterVec,
    pub cycles: prometheus::IntCounterVec,
    pub cycle_duration: prometheus::Gauge,
    pub last_update: prometheus::Gauge,
}

impl Metrics {
    pub fn new(registry: &prometheus::Registry) -> Result<Self, prometheus::Error> {
        let pages_fetched = prometheus::IntCounterVec::new(
            prometheus::Opts::new("pages_fetched_total", "The number of search pages loaded"),
            &["app"],
        )?;
        registry.register(Box::new(pages_fetched.clone()))?;

        let items_upserted = prometheus::IntCounterVec::new(
            prometheus::Opts::new(
                "items_upserted_total",
                "The number of listings written to the database",
            ),
            &["app"],
        )?;
        registry.register(Box::new(items_upserted.clone()))?;

        let throttled = prometheus::IntCounterVec::new(
            prometheus::Opts::new(
                "throttled_total",
                "The number of requests answered with 429 Too Many Requests",
            ),
            &["app"],
        )?;
        registry.register(Box::new(throttled.clone()))?;

        let cycles = prometheus::IntCounterVec::new(
            prometheus::Opts::new("cycles_total", "The number of finished update cycles"),
            &["outcome"],
        )?;
        registry.register(Box::new(cycles.clone()))?;

        let cycle_duration = prometheus::Gauge::new(
            "cycle_duration_seconds",
            "How long the most recent update cycle took",
        )?;
        registry.register(Box::new(cycle_duration.clone()))?;

        let last_update = prometheus::Gauge::new(
            "last_updated",
            "The Unix Timestamp of the last successful update",
        )?;
        registry.register(Box::new(last_update.clone()))?;

        Ok(Self {
            pages_fetched,
            items_upserted,
            throttled,
            cycles,
            cycle_duration,
            last_update,
        })
    }
}

#[tracing::instrument(skip(registry))]
pub async fn serve(
    axum::extract::State(registry): axum::extract::State<prometheus::Registry>,
) -> String {
    tracing::trace!("Getting metrics");

    let encoder = prometheus::TextEncoder::new();
    let metrics_families = registry.gather();
    match encoder.encode_to_string(&metrics_families) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Encoding Metrics {:?}", e);

            String::new()
        }
    }
}
