use std::sync::Arc;

use config::Config;
use db::DBService;

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

/// Everything a request handler may reach, passed as router state.
#[derive(Clone)]
pub struct AppContext {
    db: DBService,
    config: Arc<Config>,
}

impl AppContext {
    pub fn new(db: DBService, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn page_size(&self) -> u64 {
        self.config.page_size
    }
}
