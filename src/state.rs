use std::sync::Arc;

use moka::future::Cache;
use sqlx::MySqlPool;

use crate::{ai::AiClient, config::Config};

/// Shared handles cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub database: MySqlPool,
    pub ai: AiClient,
    pub config: Arc<Config>,
    /// Line-explanation cache in front of the `line_explanations` table,
    /// keyed by lesson line id.
    pub explanation_cache: Cache<i64, String>,
}

impl AppState {
    pub fn new(database: MySqlPool, config: Config) -> Self {
        let ai = AiClient::from_config(&config);
        Self {
            database,
            ai,
            config: Arc::new(config),
            explanation_cache: Cache::new(1000),
        }
    }
}
