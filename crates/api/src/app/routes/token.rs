use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use datagate_auth::IntrospectionRequest;

use crate::app::dto::InspectQuery;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::RequestPrincipal;

pub fn router() -> Router {
    Router::new()
        .route("/inspect", post(inspect))
        .route("/refresh", get(refresh))
}

/// Introspect a user token on behalf of the calling application.
async fn inspect(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
    Query(query): Query<InspectQuery>,
    Json(mut request): Json<IntrospectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.application_id = query.application_id()?;
    let verdict = services.introspector.introspect(caller.principal(), &request)?;
    Ok(Json(verdict.to_response()))
}

async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestPrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller.require_user()?;
    let refreshed = services
        .accounts
        .refresh_session_token(user.id, caller.raw_token())?;
    Ok(Json(refreshed))
}
