use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::enhancement::cache::EnhancementSession;
use crate::enhancement::PromptEnhancer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when no AI provider is configured; `/enhance` then always returns
    /// rule-based output.
    pub enhancer: Option<Arc<dyn PromptEnhancer>>,
    pub session: Arc<Mutex<EnhancementSession>>,
}

impl AppState {
    pub fn new(config: Config, enhancer: Option<Arc<dyn PromptEnhancer>>) -> Self {
        let session = EnhancementSession::new(
            config.cache_capacity,
            chrono::Duration::seconds(config.cache_ttl_secs),
            chrono::Duration::milliseconds(config.debounce_ms),
        );
        Self {
            config,
            enhancer,
            session: Arc::new(Mutex::new(session)),
        }
    }
}
