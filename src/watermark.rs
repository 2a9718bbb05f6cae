use std::path::PathBuf;

/// Remembers when the last full cycle finished, in unix milliseconds
#[async_trait::async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Returns 0 if no cycle has ever finished
    async fn load(&self) -> Result<u64, std::io::Error>;

    async fn save(&self, epoch_millis: u64) -> Result<(), std::io::Error>;
}

/// Stores the watermark as a base-10 number in a plain text file
#[derive(Debug, Clone)]
pub struct FileWatermark {
    path: PathBuf,
}

impl FileWatermark {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl WatermarkStore for FileWatermark {
    async fn load(&self) -> Result<u64, std::io::Error> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No watermark at {:?}, starting fresh", self.path);
                self.save(0).await?;
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        match raw.trim().parse() {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!("Ignoring unreadable watermark {:?}: {:?}", raw, e);
                Ok(0)
            }
        }
    }

    async fn save(&self, epoch_millis: u64) -> Result<(), std::io::Error> {
        tokio::fs::write(&self.path, epoch_millis.to_string()).await
    }
}
