use std::sync::Arc;

use crate::db::store::Store;
use crate::db::DbPool;
use crate::ws::{ConnectionRegistry, PairRooms};

/// Shared application state passed to all handlers via axum State extractor.
///
/// The registry and room maps are owned here and injected everywhere they
/// are needed — never module-level singletons — so tests can run multiple
/// independent server instances in one process.
#[derive(Clone)]
pub struct AppState {
    /// Data-access layer over the SQLite pool
    pub store: Store,
    /// Live websocket connections per user, with derived presence
    pub registry: Arc<ConnectionRegistry>,
    /// Pair-room membership for message and typing fan-out
    pub rooms: Arc<PairRooms>,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self {
            store: Store::new(db),
            registry: Arc::new(ConnectionRegistry::new()),
            rooms: Arc::new(PairRooms::new()),
        }
    }
}
