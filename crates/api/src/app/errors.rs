use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use datagate_auth::AuthError;

/// Handler error; maps [`AuthError`] onto HTTP responses.
///
/// Internal detail of `Application` errors is logged here and never sent.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let message = self.0.public_message();
        match self.0 {
            AuthError::NotAuthorized(_) => json_error(StatusCode::UNAUTHORIZED, "not_authorized", message),
            AuthError::Protocol(_) => json_error(StatusCode::BAD_REQUEST, "protocol_error", message),
            AuthError::Application(detail) => {
                tracing::error!(%detail, "request failed with an application error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "application_error", message)
            }
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        let cases = [
            (AuthError::not_authorized("x"), StatusCode::UNAUTHORIZED),
            (AuthError::protocol("x"), StatusCode::BAD_REQUEST),
            (AuthError::application("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
