//! The mutable state carrier threaded through one pipeline invocation.

use uuid::Uuid;

use crate::profile::ChildProfile;
use crate::session::{
    AssessmentSubmission, FeedbackResponse, LearningResponse, OverallFeedbackRequest,
    OverallFeedbackResponse,
};
use crate::store::ScoredDocument;

/// Accumulated state for a single pipeline run.
///
/// Created fresh per request, never shared across invocations, discarded once
/// the pipeline returns its terminal field. Every stage reads a subset of the
/// fields and writes a subset; a stage whose required fields are absent leaves
/// the state untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    pub profile: Option<ChildProfile>,
    pub assessment: Option<AssessmentSubmission>,
    pub overall: Option<OverallFeedbackRequest>,

    pub curriculum: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub related_docs: Option<Vec<ScoredDocument>>,
    pub lesson: Option<String>,
    pub materials: Option<Vec<String>>,
    pub lesson_id: Option<Uuid>,
    pub responses: Option<String>,
    pub feedback: Option<String>,
    pub next_lesson: Option<String>,

    pub learning_response: Option<LearningResponse>,
    pub feedback_response: Option<FeedbackResponse>,
    pub overall_feedback_response: Option<OverallFeedbackResponse>,
}

impl WorkflowState {
    /// Entry state for the initial-lesson pipeline.
    pub fn for_profile(profile: ChildProfile) -> Self {
        Self {
            profile: Some(profile),
            ..Self::default()
        }
    }

    /// Entry state for the assessment-feedback pipeline.
    pub fn for_assessment(assessment: AssessmentSubmission) -> Self {
        Self {
            assessment: Some(assessment),
            ..Self::default()
        }
    }

    /// Entry state for the overall-feedback pipeline.
    pub fn for_overall(request: OverallFeedbackRequest) -> Self {
        Self {
            overall: Some(request),
            ..Self::default()
        }
    }
}
