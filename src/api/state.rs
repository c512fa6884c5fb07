//! # Application State
//!
//! Shared state handed to every route handler via the `State` extractor.

use sha2::Sha256;

use crate::config::ServerConfig;
use crate::store::TreeStore;
use crate::tree::TreeBuilder;

/// Digest used by the HTTP service
pub type ApiHasher = Sha256;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: TreeStore<ApiHasher>,
    pub builder: TreeBuilder<ApiHasher>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let builder = TreeBuilder::with_policy(config.odd_policy);
        let store = TreeStore::with_capacity(config.max_sessions);
        Self {
            config,
            store,
            builder,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
