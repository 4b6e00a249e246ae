use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod error;

use auth::exchange::ExchangeClient;
use auth::guard::RoutePolicy;
use auth::session::SessionCodec;
use config::{AppConfig, EXCHANGE_TIMEOUT, PROVIDER_TIMEOUT};

/// Immutable per-process state shared by handlers and the route guard.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub codec: SessionCodec,
    pub exchange: Arc<ExchangeClient>,
    pub provider_http: reqwest::Client,
    pub policy: Arc<RoutePolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::from_env()?);

    let state = AppState {
        codec: SessionCodec::new(&config.session_secret, config.session_ttl_days),
        exchange: Arc::new(ExchangeClient::new(
            &config.backend_base_url,
            EXCHANGE_TIMEOUT,
        )?),
        provider_http: auth::handlers::provider_client(PROVIDER_TIMEOUT)?,
        policy: Arc::new(RoutePolicy::istri()),
        config: config.clone(),
    };

    // The guarded area. Page rendering belongs to the portal frontend; these
    // handlers only anchor the routes the guard protects.
    let protected = Router::new()
        .route("/istri/dashboard", get(istri_dashboard))
        .route("/istri/login", get(istri_login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::guard::route_guard,
        ));

    let app = Router::new()
        .route("/health", get(health_check))
        // Session/auth broker surface
        .route("/auth/login", get(auth::handlers::auth_login))
        .route("/auth/callback", get(auth::handlers::auth_callback))
        .route("/auth/session", get(auth::handlers::auth_session))
        .route("/auth/logout", post(auth::handlers::auth_logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn istri_dashboard() -> &'static str {
    "istri dashboard"
}

async fn istri_login() -> &'static str {
    "istri sign-in"
}

/// Build CORS layer from the loaded configuration.
///
/// If `cors_allowed_origins` is set, only those origins are allowed.
/// If not set, defaults to permissive CORS (for development only).
fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    match &config.cors_allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS (not recommended for production)"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                    .allow_credentials(true)
            }
        }
        None => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
            );
            CorsLayer::permissive()
        }
    }
}
