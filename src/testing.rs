//! Fakes for the outside world, shared by the unit tests

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use mongodb::bson::Document;
use tokio::time::Instant;

use crate::{
    error::PersistenceError,
    steam::{RawPage, SearchApi},
    store::{ListingStore, Upsert},
    watermark::WatermarkStore,
    Config, Context, Metrics,
};

pub fn context(apps: Vec<u32>, properties: Vec<&str>, api: FakeApi) -> Context<FakeApi, MemoryStore> {
    let config = Arc::new(Config::for_tests(apps, properties));
    let metrics = Metrics::new(&prometheus::Registry::new()).unwrap();

    Context::new(api, MemoryStore::default(), config, metrics)
}

/// A search response with one listing per index, named `Item {index}`
pub fn page_body(total: usize, items: std::ops::Range<usize>) -> String {
    let results: Vec<_> = items
        .map(|idx| {
            serde_json::json!({
                "name": format!("Item {idx}"),
                "hash_name": format!("Item {idx}"),
                "sell_price": idx,
                "sell_listings": 1,
                "asset_description": {"appid": 730, "classid": idx.to_string()},
            })
        })
        .collect();

    serde_json::json!({
        "success": true,
        "start": 0,
        "pagesize": results.len(),
        "total_count": total,
        "results": results,
    })
    .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub app: u32,
    pub start: usize,
    pub count: usize,
    pub at: Instant,
}

/// Answers requests from a script, failing with a 500 once it runs out
#[derive(Default)]
pub struct FakeApi {
    pages: Mutex<VecDeque<RawPage>>,
    requests: Mutex<Vec<Request>>,
}

impl FakeApi {
    pub fn with_pages(pages: Vec<RawPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchApi for FakeApi {
    async fn search(&self, app: u32, start: usize, count: usize) -> Result<RawPage, reqwest::Error> {
        self.requests.lock().unwrap().push(Request {
            app,
            start,
            count,
            at: Instant::now(),
        });

        Ok(self.pages.lock().unwrap().pop_front().unwrap_or(RawPage {
            status: 500,
            body: Vec::new(),
        }))
    }
}

/// Applies upserts with `$set` semantics
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Document>>,
    batches: Mutex<Vec<Vec<Upsert>>>,
    fail_next: AtomicBool,
}

impl MemoryStore {
    pub fn documents(&self) -> HashMap<String, Document> {
        self.documents.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<Upsert>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ListingStore for MemoryStore {
    async fn upsert_batch(&self, upserts: Vec<Upsert>) -> Result<(), PersistenceError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PersistenceError::WriteErrors {
                failed: upserts.len(),
                total: upserts.len(),
                first: "injected failure".to_string(),
            });
        }

        let mut documents = self.documents.lock().unwrap();
        for upsert in upserts.iter() {
            let document = documents.entry(upsert.key.clone()).or_default();
            for (field, value) in upsert.fields.iter() {
                document.insert(field.clone(), value.clone());
            }
        }

        self.batches.lock().unwrap().push(upserts);
        Ok(())
    }
}

pub struct MemoryWatermark {
    value: Mutex<u64>,
    fail_saves: AtomicBool,
}

impl MemoryWatermark {
    pub fn new(value: u64) -> Self {
        Self {
            value: Mutex::new(value),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn value(&self) -> u64 {
        *self.value.lock().unwrap()
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl WatermarkStore for MemoryWatermark {
    async fn load(&self) -> Result<u64, std::io::Error> {
        Ok(self.value())
    }

    async fn save(&self, epoch_millis: u64) -> Result<(), std::io::Error> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            ));
        }

        *self.value.lock().unwrap() = epoch_millis;
        Ok(())
    }
}

/// Collects formatted log lines while installed as the thread's default subscriber
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(String::from)
            .collect()
    }
}
