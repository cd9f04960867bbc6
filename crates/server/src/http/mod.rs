use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{AppContext, error::ApiError, routes};

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Page not found".to_string())
}

pub fn router(ctx: AppContext) -> Router {
    let router = Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::tasks::router(&ctx));

    #[cfg(feature = "embed-frontend")]
    let router = router
        .route("/", get(routes::frontend::serve_index))
        .route("/trash", get(routes::frontend::serve_trash_page))
        .route("/js/{*path}", get(routes::frontend::serve_script))
        .route("/css/{*path}", get(routes::frontend::serve_stylesheet));

    // Must follow every route so each method router picks it up.
    router
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
