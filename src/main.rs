use std::sync::Arc;

use chat_service::{config, db, error, logging, migrations, routes, state::AppState};
use chat_service::store::PgStore;
use chat_service::websocket::SessionRegistry;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Embedded migrations are idempotent; a failed schema sync is fatal
    migrations::run_all(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        registry: SessionRegistry::new(),
        config: cfg.clone(),
    };

    let app = routes::router(state).layer(CorsLayer::permissive());

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
