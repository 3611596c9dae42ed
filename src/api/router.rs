//! Chat API router.
//!
//! Returns a composable `Router` that can be mounted on any axum
//! server. REST routes live under `/api/`; the WebSocket upgrade at
//! `/ws/connect` authenticates with the same bearer credential via a
//! query parameter.
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer). Endpoint handlers use `State<ApiContext>` (provided via
//! `with_state`).

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BODY_BYTES;
use crate::realtime::websocket;

/// Build the chat API router.
///
/// All `/api` endpoints require bearer token authentication; the
/// WebSocket route authenticates during upgrade instead.
pub fn api_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → CORS → Auth (innermost) → Handler
    //
    // Extension must be outermost so the auth middleware can access
    // ApiContext. The body limit covers five maximum-size file parts.
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/conversations",
            post(endpoints::conversations::create).get(endpoints::conversations::list),
        )
        .route("/messages", post(endpoints::messages::post))
        .route("/messages/:id", get(endpoints::messages::list))
        .route("/messages/:id/read", put(endpoints::messages::mark_read))
        .route(
            "/messages/:id/attachments/:index",
            get(endpoints::messages::attachment),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES))
        .layer(CorsLayer::permissive())
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // WebSocket upgrade route (token authenticated in the handler)
    let ws_routes = Router::new()
        .route("/ws/connect", get(websocket::ws_upgrade))
        .with_state(ctx);

    Router::new().nest("/api", protected).merge(ws_routes)
}
