use std::{path::PathBuf, sync::Arc};

use mongodb::bson::doc;
use tracing_subscriber::EnvFilter;

use steamsnap::{
    error::StartupError, scheduler::Scheduler, steam, store::MongoStore,
    watermark::FileWatermark, Config, Context, Metrics,
};

fn main() {
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting up logging: {:?}", e);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Building runtime {:?}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting");

    if let Err(e) = runtime.block_on(run()) {
        tracing::error!("Startup failed: {:?}", e);
        std::process::exit(1);
    }
}

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STEAMSNAP_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}

async fn load_config() -> Result<Config, StartupError> {
    let path = config_path();
    tracing::info!("Loading config from {:?}", path);

    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| StartupError::ReadConfig { path, source })?;

    Ok(Config::from_yaml(&raw)?)
}

async fn run() -> Result<(), StartupError> {
    let config = Arc::new(load_config().await?);
    tracing::info!(apps = ?config.apps, properties = ?config.properties, "Loaded config");

    let client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;

    let result = serve(client.clone(), config).await;

    tracing::info!("Closing database connection");
    client.shutdown().await;

    result
}

async fn serve(client: mongodb::Client, config: Arc<Config>) -> Result<(), StartupError> {
    let db = client.database(&config.mongodb.database);
    db.run_command(doc! { "ping": 1 }, None).await?;
    tracing::info!("Connected to database {:?}", config.mongodb.database);

    let registry = prometheus::Registry::new();
    let metrics = Metrics::new(&registry)?;

    let ctx = Context::new(
        steam::Client::new(config.endpoint.clone()),
        MongoStore::new(db, config.mongodb.collection.clone()),
        config.clone(),
        metrics,
    );
    let scheduler = Scheduler::new(ctx, FileWatermark::new(config.watermark_path.clone()));

    let first_delay = scheduler
        .first_delay()
        .await
        .map_err(StartupError::Watermark)?;

    let metrics_server = async {
        let addr = match config.metrics_addr {
            Some(addr) => addr,
            None => return std::future::pending().await,
        };

        let app = axum::Router::new()
            .route("/metrics", axum::routing::get(steamsnap::metrics::serve))
            .with_state(registry);

        tracing::info!("Serving metrics on {:?}", addr);
        match axum::Server::try_bind(&addr) {
            Ok(server) => {
                if let Err(e) = server.serve(app.into_make_service()).await {
                    tracing::error!("Metrics server {:?}", e);
                }
            }
            Err(e) => tracing::error!("Binding metrics server {:?}", e),
        }

        // Updates keep going without metrics
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = scheduler.run(first_delay) => {}
        _ = metrics_server => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!("Listening for shutdown signal {:?}", e);
            }
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
