use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use paperloop_core::{Paper, PaperRequest};
use paperloop_jobs::{JobResult, JobStatus, JobStatusView, JobSummary, ResultFormat};

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub message: String,
    pub status: JobStatus,
}

pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<PaperRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let job_id = state.service.submit_job(request)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id,
            message: "Paper generation started".to_string(),
            status: JobStatus::Pending,
        }),
    ))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobSummary>> {
    Json(state.service.list())
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusView>, ApiError> {
    Ok(Json(state.service.get_status(&id)?))
}

pub async fn get_job_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Paper>, ApiError> {
    match state.service.get_result(&id, ResultFormat::Structured)? {
        JobResult::Structured(paper) => Ok(Json(paper)),
        JobResult::Rendered(_) => Err(ApiError::BadRequest("unexpected result format".into())),
    }
}

pub async fn get_job_latex(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    match state.service.get_result(&id, ResultFormat::Rendered)? {
        JobResult::Rendered(latex) => Ok(latex),
        JobResult::Structured(_) => Err(ApiError::BadRequest("unexpected result format".into())),
    }
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusView>, ApiError> {
    Ok(Json(state.service.cancel(&id)?))
}

pub async fn latest_paper(State(state): State<AppState>) -> Result<Json<Paper>, ApiError> {
    match state.service.latest_completed(ResultFormat::Structured)? {
        (_, JobResult::Structured(paper)) => Ok(Json(paper)),
        (_, JobResult::Rendered(_)) => {
            Err(ApiError::BadRequest("unexpected result format".into()))
        }
    }
}

pub async fn latest_latex(State(state): State<AppState>) -> Result<String, ApiError> {
    match state.service.latest_completed(ResultFormat::Rendered)? {
        (_, JobResult::Rendered(latex)) => Ok(latex),
        (_, JobResult::Structured(_)) => {
            Err(ApiError::BadRequest("unexpected result format".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{state_with_score, wait_until_finished};
    use axum::response::IntoResponse;

    fn request(sections: &[&str]) -> PaperRequest {
        PaperRequest::new(
            "Protein Folding",
            sections.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_submit_returns_accepted_with_job_id() {
        let state = state_with_score(9.0);
        let (status, Json(body)) = submit_job(State(state.clone()), Ok(Json(request(&["Abstract"]))))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body.job_id.len(), 8);
        assert_eq!(body.status, JobStatus::Pending);

        let Json(jobs) = list_jobs(State(state)).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, body.job_id);
    }

    #[tokio::test]
    async fn test_invalid_submission_is_bad_request() {
        let state = state_with_score(9.0);
        let err = submit_job(State(state.clone()), Ok(Json(request(&[]))))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let Json(jobs) = list_jobs(State(state)).await;
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let state = state_with_score(9.0);
        let err = get_job(State(state.clone()), Path("deadbeef".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = cancel_job(State(state.clone()), Path("deadbeef".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = latest_latex(State(state)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_result_conflicts_until_completed() {
        let state = state_with_score(9.0);
        let (_, Json(body)) = submit_job(State(state.clone()), Ok(Json(request(&["Abstract"]))))
            .await
            .unwrap();

        let err = get_job_paper(State(state), Path(body.job_id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_completed_job_serves_paper_and_latex() {
        let state = state_with_score(9.0);
        let (_, Json(body)) = submit_job(
            State(state.clone()),
            Ok(Json(request(&["Abstract", "References"]))),
        )
        .await
        .unwrap();

        let view = wait_until_finished(&state, &body.job_id).await;
        assert_eq!(view.status, JobStatus::Completed);

        let Json(paper) = get_job_paper(State(state.clone()), Path(body.job_id.clone()))
            .await
            .unwrap();
        assert_eq!(paper.title, "Protein Folding");
        assert_eq!(paper.sections.len(), 2);

        let latex = get_job_latex(State(state.clone()), Path(body.job_id))
            .await
            .unwrap();
        assert!(latex.contains("\\title{Protein Folding}"));
        assert!(latex.contains("\\begin{abstract}"));

        let Json(latest) = latest_paper(State(state.clone())).await.unwrap();
        assert_eq!(latest, paper);
        assert_eq!(latest_latex(State(state)).await.unwrap(), latex);
    }

    #[tokio::test]
    async fn test_cancel_marks_job_cancelled() {
        let state = state_with_score(1.0);
        let (_, Json(body)) = submit_job(State(state.clone()), Ok(Json(request(&["Abstract"]))))
            .await
            .unwrap();

        cancel_job(State(state.clone()), Path(body.job_id.clone()))
            .await
            .unwrap();

        let view = wait_until_finished(&state, &body.job_id).await;
        assert_eq!(view.status, JobStatus::Cancelled);
    }
}
