//! Current-user and user administration routes.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use datagate_auth::UserDraft;

use crate::app::dto::{LongTermTokenResponse, ProfileQuery, QueryTemplateResponse, UserView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::RequestPrincipal;

pub fn router() -> Router {
    Router::new()
        .route("/", axum::routing::post(add_users).put(update_users))
        .route("/me", get(current_user))
        .route("/me/refresh_long_term_token", get(refresh_long_term_token))
        .route("/me/queryTemplate/:application_id", get(query_template))
        .route("/me/queryTemplate/", get(query_template_without_id))
}

async fn add_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
    Json(drafts): Json<Vec<UserDraft>>,
) -> Result<impl IntoResponse, ApiError> {
    let acting = caller.require_user()?;
    let created = services.admin.add_users(acting, drafts)?;
    let body: Vec<UserView> = created.into_iter().map(UserView::from).collect();
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
    Json(drafts): Json<Vec<UserDraft>>,
) -> Result<impl IntoResponse, ApiError> {
    let acting = caller.require_user()?;
    let updated = services.admin.update_users(acting, drafts)?;
    let body: Vec<UserView> = updated.into_iter().map(UserView::from).collect();
    Ok(Json(body))
}

async fn current_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
    Query(query): Query<ProfileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller.require_user()?;
    let profile = services.accounts.current_profile(
        user.id,
        caller.raw_token(),
        query.has_token.is_some(),
    )?;
    Ok(Json(profile))
}

async fn refresh_long_term_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller.require_user()?;
    let token = services
        .accounts
        .refresh_long_term_token(user.id, caller.raw_token())?;
    Ok(Json(LongTermTokenResponse {
        user_long_term_token: token,
    }))
}

async fn query_template(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
    Path(application_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller.require_user()?;
    let template = services
        .accounts
        .query_template(user.id, Some(&application_id))?;
    Ok(Json(QueryTemplateResponse {
        query_template: template,
    }))
}

async fn query_template_without_id(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller.require_user()?;
    let template = services.accounts.query_template(user.id, None)?;
    Ok(Json(QueryTemplateResponse {
        query_template: template,
    }))
}
