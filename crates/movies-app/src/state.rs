use std::sync::Arc;

use crate::error::Result;
use movies_dal::Pool;
use url::Url;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner { app_config, pool }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    /// Absolute URL of a resource, relative to the configured base URL.
    pub fn build_url(&self, relative_url: &str) -> Result<Url> {
        let base = &self.config().base_url;
        let url = base.join(relative_url)?;
        Ok(url)
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub base_url: Url,
}
