pub mod auth;
pub mod comments;
pub mod error;
pub mod groups;
pub mod hashtags;
pub mod images;
pub mod media;
pub mod middleware;
pub mod pagination;
pub mod permissions;
pub mod posts;
pub mod ratings;
pub mod social;
pub mod state;
pub mod thread;
pub mod users;
pub mod views;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// Every route of the service. Identity is resolved once per request by
/// [`middleware::resolve_identity`]; handlers that need a caller extract
/// [`permissions::Identity`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Users & auth
        .route("/users", post(users::create_user))
        .route(
            "/users/current-user",
            get(users::current_user).patch(users::update_current_user),
        )
        .route(
            "/users/{id}",
            get(users::get_user).delete(users::deactivate_user),
        )
        .route("/users/{id}/role", put(users::set_role))
        .route("/users/{id}/followers", get(social::list_followers))
        .route("/users/{id}/following", get(social::list_following))
        .route("/api/login", post(auth::login))
        .route("/api/logout", delete(auth::logout))
        // Posts
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/{id}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/posts/{id}/images",
            get(images::list_images).post(images::add_image),
        )
        .route("/posts/{id}/like", post(posts::like_post))
        .route("/posts/{id}/rating", post(posts::rate_post))
        .route("/posts/{id}/hashtag", post(posts::add_hashtag))
        // Comments
        .route(
            "/comments/{id}",
            get(comments::get_comment)
                .patch(comments::edit_comment)
                .delete(comments::remove_comment),
        )
        // Hashtags & ratings
        .route(
            "/hashtags",
            get(hashtags::list_hashtags).post(hashtags::create_hashtag),
        )
        .route(
            "/ratings/{id}",
            get(ratings::get_rating)
                .patch(ratings::update_rating)
                .delete(ratings::delete_rating),
        )
        // Follows & reports
        .route("/follows", post(social::create_follow))
        .route("/follows/{id}", delete(social::delete_follow))
        .route(
            "/reports",
            get(social::list_reports).post(social::create_report),
        )
        .route("/reports/{id}", delete(social::dismiss_report))
        // Groups & images
        .route("/groups", post(groups::create_group))
        .route(
            "/groups/{post_id}",
            get(groups::get_group).delete(groups::delete_group),
        )
        .route(
            "/groups/{post_id}/members",
            post(groups::join_group).delete(groups::leave_group),
        )
        .route(
            "/images/{id}",
            get(images::get_image).delete(images::delete_image),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_identity,
        ))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
