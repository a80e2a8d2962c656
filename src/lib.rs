use std::sync::Arc;

use sqlx::PgPool;

use cache::store::SharedStore;
use config::Config;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub store: Arc<dyn SharedStore>,
}
