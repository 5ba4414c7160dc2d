use anyhow::Result;
use facewatch_core::{Collaborators, Session};
use facewatch_remote::{
    build_client, HttpDetector, HttpFrameSource, HttpNameExchange, HttpUploadSink,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;
mod store;

use config::Config;
use dbus_interface::{FacewatchService, BUS_NAME, OBJECT_PATH};
use store::JsonFileStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        server = %config.server_url,
        frames = %config.frame_url,
        detector = %config.detector_url,
        "facewatchd starting"
    );

    let store = JsonFileStore::new(&config.gallery_path);
    tracing::info!(path = %store.path().display(), "gallery store");

    let client = build_client(config.http_timeout)?;
    let collaborators = Collaborators {
        detector: Arc::new(HttpDetector::new(client.clone(), &config.detector_url)),
        uploader: Arc::new(HttpUploadSink::new(client.clone(), &config.server_url)),
        exchange: Arc::new(HttpNameExchange::new(client.clone(), &config.server_url)),
        persistence: Arc::new(store),
    };
    let session = Session::new(config.session_config(), collaborators);
    let source = Arc::new(HttpFrameSource::new(client, &config.frame_url));

    let (handle, task) = engine::spawn_session(session, source, config.tick_interval);

    let _conn = zbus::connection::Builder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, FacewatchService::new(handle.clone()))?
        .build()
        .await?;

    tracing::info!(bus_name = BUS_NAME, "facewatchd ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("facewatchd shutting down");
    handle.shutdown().await;
    task.await?;

    Ok(())
}
