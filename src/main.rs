use axum::{body::Body, extract::DefaultBodyLimit, http::Request};
use quizgen_backend::{
    config::{get_config, init_config, LogFormat},
    middleware::cors::cors_layer,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let app_state = AppState::new(config)?;

    let app = routes::router(app_state)
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let addr: SocketAddr = config.server_address.parse()?;
    info!(
        llm_provider = ?config.llm_provider,
        max_document_chars = config.max_document_chars,
        "Server listening on {}",
        addr
    );
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
