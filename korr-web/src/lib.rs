//! HTTP surface (C13): serves static files and executable CGI scripts out
//! of a configured directory.

mod cgi;
mod content_type;
mod handler;
mod path;

pub use handler::WebState;

use axum::routing::any;
use axum::Router;
use korr_config::Config;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: WebState) -> Router {
    Router::new()
        .fallback(any(handler::dispatch))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn router_from_config(config: &Config) -> Router {
    router(WebState {
        webserv_dir: Arc::new(config.webserv_dir.clone()),
    })
}
