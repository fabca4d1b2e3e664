//! Server assembly: shared state, router, startup wiring.

use crate::api;
use crate::config::Settings;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use minerva_core::{
    Capability, IdentityProvider, JwtIdentity, Orchestrator, OrchestratorConfig,
};
use minerva_llm::build_provider;
use minerva_retrieval::{ChromaIndex, Retriever};
use minerva_store::{HistoryLedger, RecordStore};
use minerva_tools::{college_catalog, Dispatcher};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Request body cap (1 MiB; chat payloads are text).
const BODY_LIMIT_BYTES: usize = 1024 * 1024;
/// Whole-request timeout; covers two model passes in the worst case.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Shared state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Turn pipeline
    pub orchestrator: Arc<Orchestrator>,
    /// Token verification and login
    pub identity: Arc<dyn IdentityProvider>,
    /// Record queries used directly by REST endpoints
    pub store: RecordStore,
    /// Conversation log and analytics
    pub ledger: HistoryLedger,
}

/// Build the application state from settings: store + migrations,
/// identity, retriever, provider, dispatcher, orchestrator.
///
/// Provider and retriever construction failures are demoted to explicit
/// unavailable states; the server still comes up and serves degraded
/// replies.
pub async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let store = RecordStore::from_path(&settings.database.path).await?;
    let ledger = HistoryLedger::new(store.pool().clone());

    let identity = Arc::new(
        JwtIdentity::new(store.clone(), settings.auth.jwt_secret.clone())
            .with_expiry_hours(settings.auth.token_expiry_hours),
    );

    let provider = match settings
        .provider
        .to_provider_settings()
        .and_then(|provider_settings| build_provider(&provider_settings))
    {
        Ok(provider) => Capability::Ready(provider),
        Err(e) => {
            warn!(error = %e, "Model provider unavailable, serving degraded replies");
            Capability::Unavailable(e.to_string())
        }
    };

    let retriever = match ChromaIndex::connect(
        settings.retrieval.chroma_url.clone(),
        Duration::from_millis(settings.retrieval.timeout_ms),
    )
    .await
    {
        Ok(index) => {
            let index: Arc<dyn minerva_retrieval::VectorIndex> = Arc::new(index);
            Capability::Ready(Arc::new(Retriever::new(index)))
        }
        Err(e) => {
            warn!(error = %e, "Vector index unavailable, answers will be ungrounded");
            Capability::Unavailable(e.to_string())
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(college_catalog()), store.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        retriever,
        dispatcher,
        store.clone(),
        ledger.clone(),
        OrchestratorConfig {
            model: settings.provider.model.clone().unwrap_or_default(),
            college_name: settings.chat.college_name.clone(),
            top_k: settings.retrieval.top_k,
            max_tokens: settings.chat.max_tokens,
            temperature: settings.chat.temperature,
        },
    ));

    Ok(AppState {
        orchestrator,
        identity,
        store,
        ledger,
    })
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/chat", post(api::chat::chat))
        .route("/api/chat/history", get(api::chat::history))
        .route("/api/chat/feedback", post(api::chat::feedback))
        .route("/api/analytics", get(api::analytics::analytics))
        .route("/api/student/profile", get(api::student::profile))
        .route("/api/student/attendance", get(api::student::attendance))
        .route("/api/student/schedule", get(api::student::schedule))
        .route("/api/student/fees", get(api::student::fees))
        .route("/api/student/appointment", post(api::student::book_appointment))
        .route("/api/student/leave", post(api::student::apply_leave))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let state = build_state(&settings).await?;
    let router = build_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Minerva listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install ctrl-c handler");
    }
}
