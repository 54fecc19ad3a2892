use std::{sync::Arc, time::Duration};

use axum::http::{HeaderValue, Method};
use showcase_backend::{
    api,
    auth::{FirebaseAuth, TokenCodec},
    bootstrap,
    config::{Config, LogFormat},
    db::{Database, DatabaseOptions},
    images::ImgBb,
    AppState,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dev convenience)
    let _ = dotenvy::dotenv();

    let cfg = Config::from_env()?;

    // Tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    match cfg.log_format {
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    // Connection is established on first use.
    let database = Arc::new(Database::new(DatabaseOptions {
        url: cfg.database_url.clone(),
        max_connections: cfg.database_max_connections,
        acquire_timeout: Duration::from_secs(5),
    }));

    if let Some(admin) = &cfg.bootstrap_admin {
        bootstrap::ensure_admin(database.as_ref(), admin).await?;
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;

    let state = AppState {
        store: database,
        tokens: TokenCodec::new(&cfg.jwt_secret),
        identity: Arc::new(FirebaseAuth::new(
            cfg.firebase_project_id.clone(),
            cfg.firebase_api_key.clone(),
            http.clone(),
        )),
        images: Arc::new(ImgBb::new(cfg.imgbb_api_key.clone(), http)),
    };

    // CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(
            cfg.cors_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        );

    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors),
    );

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("Listening on {}", cfg.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
