use std::sync::Arc;

use crate::config::CmsConfig;
use crate::handler::CmsDB;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<CmsDB>,
    pub config: Arc<CmsConfig>,
}

impl AppState {
    pub fn new(db: CmsDB, config: CmsConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}
