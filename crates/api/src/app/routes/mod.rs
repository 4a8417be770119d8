use axum::Router;

pub mod system;
pub mod token;
pub mod user;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/token", token::router())
        .nest("/user", user::router())
}
