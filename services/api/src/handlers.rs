//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for the three
//! workflow pipelines and the history read. It uses `utoipa` doc comments to
//! generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::error;

use sprout_core::store::StoreError;
use sprout_core::workflow::WorkflowError;

use crate::{
    models::{
        AssessmentPayload, ChildProfilePayload, ErrorResponse, FeedbackResponseBody,
        HistoryRecord, LearningResponseBody, OverallFeedbackBody, OverallFeedbackPayload,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    /// A pipeline invocation failed against a collaborator (provider,
    /// template, or store). The client gets a generic notice; the cause goes
    /// to the log.
    Pipeline(WorkflowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Pipeline(err) => {
                error!("Pipeline invocation failed: {:?}", err);
                let message = "The learning service is temporarily unavailable.".to_string();
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self::Pipeline(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Pipeline(WorkflowError::Store(err))
    }
}

/// Register a child's profile and generate their first lesson and quiz.
#[utoipa::path(
    post,
    path = "/init_profile",
    request_body = ChildProfilePayload,
    responses(
        (status = 200, description = "Lesson generated", body = LearningResponseBody),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 502, description = "A backing service failed", body = ErrorResponse)
    )
)]
pub async fn init_profile(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChildProfilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.age == 0 {
        return Err(ApiError::BadRequest("age must be a positive integer".to_string()));
    }
    if payload.interests.is_empty() || payload.interests.iter().any(|i| i.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "interests must be a non-empty list of non-empty strings".to_string(),
        ));
    }

    let response = state.orchestrator.initial_lesson(payload.into()).await?;
    Ok((StatusCode::OK, Json(LearningResponseBody::from(response))))
}

/// Submit a child's quiz answers and receive feedback plus a follow-up lesson.
#[utoipa::path(
    post,
    path = "/submit_assessment",
    request_body = AssessmentPayload,
    responses(
        (status = 200, description = "Feedback generated", body = FeedbackResponseBody),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 502, description = "A backing service failed", body = ErrorResponse)
    )
)]
pub async fn submit_assessment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssessmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.responses_text.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "responses_text must not be empty".to_string(),
        ));
    }

    let response = state
        .orchestrator
        .assessment_feedback(payload.into())
        .await?;
    Ok((StatusCode::OK, Json(FeedbackResponseBody::from(response))))
}

/// Summarize a child's progress across their completed lessons.
#[utoipa::path(
    post,
    path = "/overall_feedback",
    request_body = OverallFeedbackPayload,
    responses(
        (status = 200, description = "Summary generated", body = OverallFeedbackBody),
        (status = 502, description = "A backing service failed", body = ErrorResponse)
    )
)]
pub async fn overall_feedback(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OverallFeedbackPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.orchestrator.overall_feedback(payload.into()).await?;
    Ok((StatusCode::OK, Json(OverallFeedbackBody::from(response))))
}

/// List a child's stored lessons, newest first.
#[utoipa::path(
    get,
    path = "/children/{child_id}/history",
    responses(
        (status = 200, description = "Lesson history", body = [HistoryRecord]),
        (status = 502, description = "The store failed", body = ErrorResponse)
    ),
    params(
        ("child_id" = String, Path, description = "The child's identifier")
    )
)]
pub async fn child_history(
    State(state): State<Arc<AppState>>,
    Path(child_id): Path<String>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let history = state.sessions.history(&child_id).await?;
    Ok(Json(history.into_iter().map(HistoryRecord::from).collect()))
}
