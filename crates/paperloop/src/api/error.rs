use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use paperloop_jobs::JobError;

/// Error returned by API handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    Job(JobError),
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Job(err) => match err {
                JobError::Validation(_) => StatusCode::BAD_REQUEST,
                JobError::NotFound(_) | JobError::NoCompletedPaper => StatusCode::NOT_FOUND,
                JobError::NotReady { .. } => StatusCode::CONFLICT,
                JobError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        ApiError::Job(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Job(err) => write!(f, "{}", err),
            ApiError::BadRequest(msg) => write!(f, "{}", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperloop_core::ValidationError;
    use paperloop_jobs::JobStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::from(JobError::Validation(ValidationError::EmptyTitle)),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(JobError::NotFound("abc".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(JobError::NoCompletedPaper),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(JobError::NotReady {
                    id: "abc".into(),
                    status: JobStatus::Running,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::BadRequest("bad json".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
