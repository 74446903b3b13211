//! Learning-session records and the request/response shapes of the three
//! workflow pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stored lesson for one child.
///
/// Minted by the generation stage of the initial-lesson pipeline. Immutable
/// once created, except for `feedback`, which the assessment pipeline attaches
/// (and overwrites on resubmission).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSession {
    pub lesson_id: Uuid,
    pub child_id: String,
    /// The topic the curriculum stage proposed for this lesson.
    pub curriculum: String,
    /// The lesson body, quiz questions included.
    pub lesson: String,
    /// The answer key separated from the generated text at creation time.
    /// Empty when the model omitted the delimiter.
    pub materials: String,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LessonSession {
    pub fn new(
        lesson_id: Uuid,
        child_id: String,
        curriculum: String,
        lesson: String,
        materials: String,
    ) -> Self {
        Self {
            lesson_id,
            child_id,
            curriculum,
            lesson,
            materials,
            feedback: None,
            created_at: Utc::now(),
        }
    }
}

/// A child's submitted answers for one lesson.
///
/// `materials_text` carries the quiz materials the child answered against so
/// the feedback stage never has to read them back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSubmission {
    pub child_id: String,
    pub lesson_id: Uuid,
    pub responses_text: String,
    pub materials_text: String,
}

/// One line of a child's learning history, as reduced by the caller for the
/// overall-feedback pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub interests: String,
    pub topic: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallFeedbackRequest {
    pub name: String,
    pub age: u32,
    pub history: Vec<LessonSummary>,
}

/// Terminal output of the initial-lesson pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResponse {
    pub lesson: String,
    pub materials_text: String,
    pub lesson_id: Uuid,
}

/// Terminal output of the assessment-feedback pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub feedback: String,
    pub next_lesson: Option<String>,
}

/// Terminal output of the overall-feedback pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallFeedbackResponse {
    pub feedback: String,
}
