use std::sync::Arc;
use tokio::sync::RwLock;

use cabal_core::RoomRegistry;

use crate::config::ServerConfig;

/// Every room operation may resolve a deadline, so handlers take the write
/// lock even for reads.
pub type SharedRegistry = Arc<RwLock<RoomRegistry>>;

#[derive(Clone)]
pub struct AppState {
    pub rooms: SharedRegistry,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = RoomRegistry::new(config.game.room_config());
        Self::with_registry(config, registry)
    }

    /// Use a prepared registry (seeded rng, manual clock) instead of a fresh one.
    pub fn with_registry(config: ServerConfig, registry: RoomRegistry) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(registry)),
            config: Arc::new(config),
        }
    }
}
