use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use slab_optimizer::{Quote, QuoteRequest};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

async fn quote(Json(req): Json<QuoteRequest>) -> Result<Json<Quote>, (StatusCode, String)> {
    tracing::info!(
        products = req.products.len(),
        catalog = req.catalog.len(),
        multi_product = req.settings.multi_product_optimization,
        "POST /quote"
    );

    req.settings
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if req.products.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "at least one product is required".to_string(),
        ));
    }

    Ok(Json(req.run()))
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/quote", post(quote))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.expect("server error");
}
