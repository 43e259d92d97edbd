use std::sync::Arc;

use crate::chat::history::ConversationLog;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::resume_store::ResumeStore;
use crate::retrieval::engine::RetrievalEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one retrieval engine for this process. Refreshed in place by the admin update route.
    pub engine: Arc<RetrievalEngine>,
    pub llm: LlmClient,
    pub store: ResumeStore,
    pub conversations: ConversationLog,
    pub config: Config,
}
