//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AssessmentPayload, ChildProfilePayload, ErrorResponse, FeedbackResponseBody,
        HistoryRecord, LearningResponseBody, LessonSummaryPayload, OverallFeedbackBody,
        OverallFeedbackPayload,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::init_profile,
        handlers::submit_assessment,
        handlers::overall_feedback,
        handlers::child_history,
    ),
    components(
        schemas(
            ChildProfilePayload,
            AssessmentPayload,
            OverallFeedbackPayload,
            LessonSummaryPayload,
            LearningResponseBody,
            FeedbackResponseBody,
            OverallFeedbackBody,
            HistoryRecord,
            ErrorResponse
        )
    ),
    tags(
        (name = "Sprout API", description = "Personalized learning sessions for children")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/init_profile", post(handlers::init_profile))
        .route("/submit_assessment", post(handlers::submit_assessment))
        .route("/overall_feedback", post(handlers::overall_feedback))
        .route("/children/{child_id}/history", get(handlers::child_history))
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI routes.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
