use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::actions::ActionError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
}

impl ProblemDetails {
    fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        let title = status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string();
        Self {
            r#type: format!("https://tourdesk.dev/problems/{code}"),
            title,
            status: status.as_u16(),
            detail: detail.into(),
            code,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub problem: Box<ProblemDetails>,
}

impl ApiError {
    fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            problem: Box::new(ProblemDetails::new(status, code, message)),
        }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.problem)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        match &err {
            ActionError::Conflict { .. } => Self::conflict("shift_conflict", err.to_string()),
            ActionError::NotAssigned { .. } => {
                Self::conflict("shift_not_assigned", err.to_string())
            }
            ActionError::ShiftNotFound { .. } => Self::not_found("shift_not_found", err.to_string()),
            ActionError::GuideNotFound(_) => Self::not_found("guide_not_found", err.to_string()),
            ActionError::InvalidMonth { .. } => Self::bad_request("invalid_month", err.to_string()),
            ActionError::Store(_) => Self::internal("store_error", err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::ShiftNotFound { .. } => Self::not_found("shift_not_found", err.to_string()),
            StoreError::StateConflict { .. } => Self::conflict("shift_conflict", err.to_string()),
            _ => Self::internal("store_error", err.to_string()),
        }
    }
}
