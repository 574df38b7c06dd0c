//! Per-job render context.

use reel_storage::ContentStore;

use crate::config::RenderConfig;
use crate::progress::ProgressSender;

/// Everything one render job needs, constructed once per job.
///
/// Stages receive this explicitly instead of reaching for process-global
/// clients, so no state aliases across concurrent requests. The HTTP client
/// and store handle are cheap clones sharing their underlying connection
/// pools.
#[derive(Clone)]
pub struct RenderContext {
    pub config: RenderConfig,
    pub http: reqwest::Client,
    pub store: ContentStore,
    pub progress: ProgressSender,
}

impl RenderContext {
    /// Create a context for one job.
    pub fn new(
        config: RenderConfig,
        http: reqwest::Client,
        store: ContentStore,
        progress: ProgressSender,
    ) -> Self {
        Self {
            config,
            http,
            store,
            progress,
        }
    }
}
