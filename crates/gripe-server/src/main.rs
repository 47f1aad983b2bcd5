use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use gripe_api::auth::{self, AppState, AppStateInner};
use gripe_api::grievances;
use gripe_api::middleware::require_auth;
use gripe_api::push;
use gripe_push::{Dispatcher, VapidConfig, WebPushTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gripe=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("GRIPE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("GRIPE_DB_PATH").unwrap_or_else(|_| "gripe.db".into());
    let host = std::env::var("GRIPE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("GRIPE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let vapid = VapidConfig::from_env()?;

    // Init database
    let db = Arc::new(gripe_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let dispatcher = Dispatcher::new(db.clone(), WebPushTransport::new(vapid.clone()));
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        dispatcher,
        vapid_public_key: vapid.public_key,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/push/vapid-public-key", get(push::vapid_public_key))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/grievances", get(grievances::list_grievances))
        .route("/grievances", post(grievances::create_grievance))
        .route("/push/subscribe", post(push::subscribe))
        .route("/push/unsubscribe", post(push::unsubscribe))
        .route("/push/test", post(push::test_push))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Grievance portal listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
