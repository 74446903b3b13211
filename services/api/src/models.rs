//! API Models
//!
//! Request and response bodies for the REST API, annotated for OpenAPI
//! generation with `utoipa`, with conversions to and from the core domain
//! types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use sprout_core::profile::ChildProfile;
use sprout_core::session::{
    AssessmentSubmission, FeedbackResponse, LearningResponse, LessonSession, LessonSummary,
    OverallFeedbackRequest, OverallFeedbackResponse,
};

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct ChildProfilePayload {
    #[schema(example = "c1")]
    pub child_id: String,
    #[schema(example = "Mina")]
    pub name: String,
    #[schema(example = 8)]
    pub age: u32,
    pub interests: Vec<String>,
}

impl From<ChildProfilePayload> for ChildProfile {
    fn from(payload: ChildProfilePayload) -> Self {
        Self {
            child_id: payload.child_id,
            name: payload.name,
            age: payload.age,
            interests: payload.interests,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct AssessmentPayload {
    #[schema(example = "c1")]
    pub child_id: String,
    #[schema(value_type = String, format = Uuid)]
    pub lesson_id: Uuid,
    #[schema(example = "T-rex")]
    pub responses_text: String,
    pub materials_text: String,
}

impl From<AssessmentPayload> for AssessmentSubmission {
    fn from(payload: AssessmentPayload) -> Self {
        Self {
            child_id: payload.child_id,
            lesson_id: payload.lesson_id,
            responses_text: payload.responses_text,
            materials_text: payload.materials_text,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct LessonSummaryPayload {
    pub interests: String,
    pub topic: String,
    pub feedback: String,
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct OverallFeedbackPayload {
    #[schema(example = "Mina")]
    pub name: String,
    #[schema(example = 8)]
    pub age: u32,
    pub history: Vec<LessonSummaryPayload>,
}

impl From<OverallFeedbackPayload> for OverallFeedbackRequest {
    fn from(payload: OverallFeedbackPayload) -> Self {
        Self {
            name: payload.name,
            age: payload.age,
            history: payload
                .history
                .into_iter()
                .map(|entry| LessonSummary {
                    interests: entry.interests,
                    topic: entry.topic,
                    feedback: entry.feedback,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct LearningResponseBody {
    pub lesson: String,
    pub materials_text: String,
    #[schema(value_type = String, format = Uuid)]
    pub lesson_id: Uuid,
}

impl From<LearningResponse> for LearningResponseBody {
    fn from(response: LearningResponse) -> Self {
        Self {
            lesson: response.lesson,
            materials_text: response.materials_text,
            lesson_id: response.lesson_id,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct FeedbackResponseBody {
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_lesson: Option<String>,
}

impl From<FeedbackResponse> for FeedbackResponseBody {
    fn from(response: FeedbackResponse) -> Self {
        Self {
            feedback: response.feedback,
            next_lesson: response.next_lesson,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct OverallFeedbackBody {
    pub feedback: String,
}

impl From<OverallFeedbackResponse> for OverallFeedbackBody {
    fn from(response: OverallFeedbackResponse) -> Self {
        Self {
            feedback: response.feedback,
        }
    }
}

/// One stored lesson in a child's history, newest first.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct HistoryRecord {
    #[schema(value_type = String, format = Uuid)]
    pub lesson_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub curriculum: String,
    pub lesson: String,
    pub materials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl From<LessonSession> for HistoryRecord {
    fn from(session: LessonSession) -> Self {
        Self {
            lesson_id: session.lesson_id,
            created_at: session.created_at,
            curriculum: session.curriculum,
            lesson: session.lesson,
            materials: session.materials,
            feedback: session.feedback,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_profile_payload_deserialization() {
        let json = r#"{"child_id":"c1","name":"Mina","age":8,"interests":["dinosaurs"]}"#;
        let payload: ChildProfilePayload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.child_id, "c1");
        assert_eq!(payload.name, "Mina");
        assert_eq!(payload.age, 8);
        assert_eq!(payload.interests, vec!["dinosaurs".to_string()]);

        let profile: ChildProfile = payload.into();
        assert_eq!(profile.child_id, "c1");
    }

    #[test]
    fn test_child_profile_payload_missing_field() {
        let json = r#"{"child_id":"c1","name":"Mina"}"#;
        let result: Result<ChildProfilePayload, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_assessment_payload_deserialization() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"child_id":"c1","lesson_id":"{id}","responses_text":"T-rex","materials_text":"A1"}}"#
        );
        let payload: AssessmentPayload = serde_json::from_str(&json).unwrap();

        assert_eq!(payload.lesson_id, id);
        let submission: AssessmentSubmission = payload.into();
        assert_eq!(submission.responses_text, "T-rex");
    }

    #[test]
    fn test_overall_feedback_payload_conversion() {
        let json = r#"{
            "name": "Mina",
            "age": 8,
            "history": [{"interests": "dinosaurs", "topic": "Cretaceous", "feedback": "good"}]
        }"#;
        let payload: OverallFeedbackPayload = serde_json::from_str(json).unwrap();
        let request: OverallFeedbackRequest = payload.into();

        assert_eq!(request.history.len(), 1);
        assert_eq!(request.history[0].topic, "Cretaceous");
    }

    #[test]
    fn test_overall_feedback_payload_empty_history() {
        let json = r#"{"name":"Mina","age":8,"history":[]}"#;
        let payload: OverallFeedbackPayload = serde_json::from_str(json).unwrap();
        let request: OverallFeedbackRequest = payload.into();
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_feedback_response_body_omits_absent_next_lesson() {
        let body = FeedbackResponseBody {
            feedback: "well done".to_string(),
            next_lesson: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"feedback":"well done"}"#);

        let body = FeedbackResponseBody {
            feedback: "well done".to_string(),
            next_lesson: Some("next".to_string()),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("next_lesson"));
    }

    #[test]
    fn test_history_record_from_session() {
        let session = LessonSession::new(
            Uuid::new_v4(),
            "c1".to_string(),
            "Volcanoes".to_string(),
            "Lesson body".to_string(),
            "A1: magma".to_string(),
        );
        let record = HistoryRecord::from(session.clone());

        assert_eq!(record.lesson_id, session.lesson_id);
        assert_eq!(record.curriculum, "Volcanoes");
        assert!(record.feedback.is_none());

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("feedback"));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Lesson not found".to_string(),
        };

        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Lesson not found"}"#);
    }
}
