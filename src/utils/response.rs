use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_IGNORED: &str = "ignored";
pub const STATUS_ERROR: &str = "error";

/// Every body carries a `status` and usually a `message`; payload fields are
/// flattened next to them.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub status: &'static str,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn success<T>(data: T, message: impl Into<String>) -> impl IntoResponse
where
    T: Serialize,
{
    let body = ApiResponse {
        status: STATUS_SUCCESS,
        message: Some(message.into()),
        data: Some(data),
    };
    (StatusCode::OK, Json(body))
}

/// Acknowledges a request that was accepted but deliberately not acted on.
pub fn ignored(message: impl Into<String>) -> impl IntoResponse {
    let body: ApiResponse<()> = ApiResponse {
        status: STATUS_IGNORED,
        message: Some(message.into()),
        data: None,
    };
    (StatusCode::OK, Json(body))
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        status: STATUS_ERROR,
        code: code.to_string(),
        message: message.into(),
        details,
    };

    (status, Json(body)).into_response()
}
