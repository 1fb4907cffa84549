use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use vaultgraph::{
    api, config::Config, db::init_db, ApplyLock, ChainReader, EntityStore, EventSource,
    FileEventSource, Projector, Repository, RpcChainReader, StreamRunner,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("failed to initialize database")?;
    let store: Arc<dyn EntityStore> = Arc::new(Repository::new(pool));
    let apply_lock = ApplyLock::default();

    for stream in &config.streams {
        let chain: Arc<dyn ChainReader> = Arc::new(
            RpcChainReader::new(stream.rpc_url.clone())
                .with_max_elapsed(Duration::from_millis(config.rpc_max_elapsed_ms)),
        );
        let source: Arc<dyn EventSource> = Arc::new(FileEventSource::new(&stream.events_path));
        let projector = Projector::new(store.clone(), chain, config.projection_settings(stream))
            .with_apply_lock(apply_lock.clone());
        let runner = StreamRunner::new(stream.stream_id(), source, projector)
            .with_batch_size(config.batch_size)
            .with_poll_interval(Duration::from_millis(config.poll_interval_ms));

        tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                tracing::error!(stream = %runner.stream_id(), error = %e, "Stream stopped");
            }
        });
    }
    tracing::info!(streams = config.streams.len(), "Streams started");

    let app = api::create_router(api::AppState::new(store));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
