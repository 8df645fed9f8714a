//! Shared application state.

use shopkeep_db::Database;

use crate::auth::JwtManager;
use crate::config::AppConfig;

/// Handed to every handler as `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let jwt = JwtManager::new(
            config.auth.jwt_secret.clone(),
            config.auth.access_token_lifetime_secs,
        );
        AppState { db, jwt, config }
    }
}
