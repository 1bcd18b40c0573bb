pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod inbox;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;
pub mod ws;

use std::sync::Arc;

use blob::{BlobStore, DiskBlobStore};
use config::Config;
use ws::fanout::Fanout;
use ws::gateway::GatewayState;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub gateway: Arc<GatewayState>,
    pub fanout: Arc<dyn Fanout>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    /// State backed by the in-process gateway and on-disk blob storage.
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        let gateway = Arc::new(GatewayState::new());
        let blobs = Arc::new(DiskBlobStore::new(&config.upload_dir));
        Self {
            db,
            fanout: gateway.clone(),
            gateway,
            blobs,
            config,
        }
    }
}
