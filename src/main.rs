//! Composition root for the task conductor service.
//!
//! The only place where concrete adapters, services, and configuration
//! meet; everything below it takes its collaborators by reference.

use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use task_conductor::adapters::websocket::{websocket_router, WebSocketState};
use task_conductor::adapters::{
    task_routes, ConnectionManager, StaticToolIndex, TaskAppState, WebSearchAdapter,
    WebSocketTaskEmitter,
};
use task_conductor::application::{ExecutionEngine, ServerToolExecutor, TaskOrchestrator};
use task_conductor::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    info!(environment = ?config.server.environment, "starting task conductor");

    // Tool catalog and server-side adapters.
    let catalog = Arc::new(StaticToolIndex::with_builtins());
    let mut executor = ServerToolExecutor::new();
    executor.register_adapter(Arc::new(WebSearchAdapter));
    let executor = Arc::new(executor);

    // Client transport.
    let connections = Arc::new(ConnectionManager::with_default_capacity());
    let emitter = Arc::new(WebSocketTaskEmitter::new(connections.clone()));

    // Core services.
    let orchestrator = Arc::new(TaskOrchestrator::new(catalog));
    let engine = Arc::new(ExecutionEngine::new(
        orchestrator.clone(),
        executor,
        emitter,
        config.engine.clone(),
    ));

    let cors = if config.server.cors_origins_list().is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = config
            .server
            .cors_origins_list()
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
    };

    let app = task_routes(TaskAppState {
        orchestrator: orchestrator.clone(),
        engine: engine.clone(),
        connections: connections.clone(),
    })
    .merge(websocket_router(WebSocketState::new(
        connections,
        orchestrator,
        engine,
    )))
    .layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let addr = config.server.socket_addr();
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
