mod data;
pub use data::{Listing, SearchPage};

/// The status and body of one search request, before any interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait::async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, app: u32, start: usize, count: usize) -> Result<RawPage, reqwest::Error>;
}

pub struct Client {
    req_client: reqwest::Client,
    endpoint: String,
}

impl Client {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            req_client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl SearchApi for Client {
    #[tracing::instrument(skip(self))]
    async fn search(&self, app: u32, start: usize, count: usize) -> Result<RawPage, reqwest::Error> {
        tracing::debug!("Requesting page");

        let resp = self
            .req_client
            .get(&self.endpoint)
            .query(&[
                ("appid", app.to_string()),
                ("start", start.to_string()),
                ("count", count.to_string()),
                ("norender", "1".to_string()),
                ("search_descriptions", "0".to_string()),
                ("sort_column", "name".to_string()),
                ("sort_dir", "asc".to_string()),
            ])
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await?;

        Ok(RawPage {
            status,
            body: body.to_vec(),
        })
    }
}
