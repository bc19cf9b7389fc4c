//! Maps `ReaperError` onto the `{statusCode, error, message}` HTTP error body
//! every non-2xx response carries (§7). No secrets, stack traces, or internal
//! identifiers leak into `message` beyond what `ReaperError`'s own `Display`
//! already carries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reaper_core::ReaperError;
use serde_json::json;

pub struct ApiError(pub ReaperError);

impl From<ReaperError> for ApiError {
    fn from(err: ReaperError) -> Self {
        ApiError(err)
    }
}

fn status_for(err: &ReaperError) -> StatusCode {
    match err {
        ReaperError::PolicyNotFound { .. }
        | ReaperError::RuleNotFound { .. }
        | ReaperError::AgentNotFound { .. }
        | ReaperError::MandateNotFound { .. } => StatusCode::NOT_FOUND,
        ReaperError::InvalidPolicy { .. }
        | ReaperError::InvalidPattern { .. }
        | ReaperError::InvalidContext { .. }
        | ReaperError::SerializationError { .. } => StatusCode::BAD_REQUEST,
        ReaperError::AgentInactive { .. } | ReaperError::AgentKilled { .. } => StatusCode::FORBIDDEN,
        ReaperError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        ReaperError::Forbidden { .. } => StatusCode::FORBIDDEN,
        ReaperError::Conflict { .. } | ReaperError::InconsistentSettlement { .. } => StatusCode::CONFLICT,
        ReaperError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ReaperError::Blocked { .. } => StatusCode::FORBIDDEN,
        ReaperError::EvaluationError { .. } | ReaperError::PlatformError { .. } | ReaperError::Config { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ReaperError::AgentCommunicationError { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = json!({
            "statusCode": status.as_u16(),
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
