//! HTTP front-end: an upload form and a `POST /compress` endpoint.
//!
//! Handlers hold nothing but the injected [`ServerConfig`]; each request runs
//! the compressor on a blocking thread inside its own temporary directory.

mod config;
mod form;
mod routes;

pub use config::ServerConfig;
pub use routes::download_name;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

/// Build the application router.
pub fn app(config: ServerConfig) -> Router {
    let body_limit = config.body_limit();
    Router::new()
        .route("/", get(routes::index))
        .route("/compress", post(routes::compress))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(config))
}
