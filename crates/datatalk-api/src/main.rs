//! DataTalk API server: registers datasets, answers natural-language
//! analytical questions over them, and persists reports.

use datatalk_ai::{AiConfig, IntentExtractor, OpenAiCompatibleClient};
use datatalk_api::{build_router, AppState, Config};
use datatalk_executor::Executor;
use datatalk_registry::Registry;
use datatalk_state::ConversationStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let registry = Registry::open().expect("failed to open the dataset registry");
    let executor = Executor::new(config.max_ingest_bytes, config.query_timeout);
    let conversations = ConversationStore::new();

    let ai_extractor: Option<Arc<dyn IntentExtractor>> = if config.ai_mode_on {
        AiConfig::from_env().map(|ai_config| {
            Arc::new(OpenAiCompatibleClient::new(ai_config)) as Arc<dyn IntentExtractor>
        })
    } else {
        None
    };
    if config.ai_mode_on && ai_extractor.is_none() {
        tracing::warn!("AI_MODE=on but DATATALK_AI_API_KEY is not set; AI Assist requests will get a static reply");
    }

    let state = AppState {
        registry: Arc::new(registry),
        executor: Arc::new(executor),
        conversations: Arc::new(conversations),
        ai_extractor,
    };

    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("DataTalk API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
