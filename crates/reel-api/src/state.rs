//! Shared application state.

use reel_render::RenderConfig;
use reel_storage::ContentStore;

/// Long-lived handles shared by all requests.
///
/// Per-job state lives in `RenderContext`, built fresh from these handles
/// for every render request.
#[derive(Clone)]
pub struct AppState {
    pub config: RenderConfig,
    pub store: ContentStore,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            config: RenderConfig::from_env(),
            store: ContentStore::from_env()?,
            http: reqwest::Client::new(),
        })
    }
}
