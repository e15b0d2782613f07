//! Route table. Paths mirror the platform's public API: reports, the
//! moderation console, and the public post feed.

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/reports",
            post(handlers::file_report).get(handlers::list_reports),
        )
        .route("/api/reports/{reportId}", get(handlers::get_report))
        .route("/api/moderation/content", post(handlers::moderate_content))
        .route(
            "/api/moderation/content/{contentType}/{contentId}",
            get(handlers::reported_content),
        )
        .route("/api/moderation/users", get(handlers::list_users))
        .route("/api/moderation/users/{userId}", post(handlers::moderate_user))
        .route("/api/blogs/{blogId}/privacy", post(handlers::set_blog_privacy))
        .route("/api/posts/recent", get(handlers::recent_posts))
        .route("/api/posts/{postId}", get(handlers::get_post))
        .route("/api/posts/{postId}/comments", get(handlers::post_comments))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_methods([Method::GET, Method::POST]))
        .with_state(state)
}
