//! Shared application state handed to every handler via axum's
//! `State` extractor.

use datatalk_ai::IntentExtractor;
use datatalk_executor::Executor;
use datatalk_registry::Registry;
use datatalk_state::ConversationStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub executor: Arc<Executor>,
    pub conversations: Arc<ConversationStore>,
    pub ai_extractor: Option<Arc<dyn IntentExtractor>>,
}
