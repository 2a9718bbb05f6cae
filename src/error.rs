use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sending request for page {page}")]
    Transport {
        page: usize,
        #[source]
        source: reqwest::Error,
    },
    #[error("page {page} returned status {status}")]
    Status { page: usize, status: u16 },
    #[error("page {page} returned an empty response")]
    EmptyResponse { page: usize },
    #[error("page {page} could not be deserialized")]
    Malformed {
        page: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("page {page} was unsuccessful")]
    Unsuccessful { page: usize },
    #[error("gave up after {pages} pages")]
    PageLimit { pages: usize },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database")]
    Database(#[from] mongodb::error::Error),
    #[error("encoding field value")]
    Encode(#[from] mongodb::bson::ser::Error),
    #[error("{failed} of {total} upserts failed, first: {first}")]
    WriteErrors {
        failed: usize,
        total: usize,
        first: String,
    },
    #[error("write concern failed with code {code}: {message}")]
    WriteConcern { code: i32, message: String },
}

/// Anything that aborts the remaining identifiers of a cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("reading config {path:?}")]
    ReadConfig {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config")]
    ParseConfig(#[from] serde_yaml::Error),
    #[error("connecting to database")]
    Database(#[from] mongodb::error::Error),
    #[error("loading watermark")]
    Watermark(#[source] std::io::Error),
    #[error("registering metrics")]
    Metrics(#[from] prometheus::Error),
}
