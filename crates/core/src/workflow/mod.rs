//! Learning-Session Workflow Orchestrator
//!
//! Three straight-line pipelines over a shared [`WorkflowState`]: the
//! initial-lesson pipeline, the assessment-feedback pipeline, and the
//! overall-feedback pipeline. Each stage reads a subset of the state, calls at
//! most one external collaborator, and writes a subset of new fields. A stage
//! whose required inputs are absent passes through without touching the state;
//! a pipeline that finishes without its terminal field reports
//! [`WorkflowError::TerminalFieldMissing`].
//!
//! The orchestrator sequences collaborators but performs no side effects of
//! its own, holds no cross-request state, and never retries.

pub mod state;

pub use state::WorkflowState;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::{EmbeddingClient, GenerativeClient, ProviderError};
use crate::profile::ChildProfile;
use crate::prompts::{PromptError, PromptRenderer, TemplateValue};
use crate::session::{
    AssessmentSubmission, FeedbackResponse, LearningResponse, LessonSession,
    OverallFeedbackRequest, OverallFeedbackResponse,
};
use crate::store::{SessionStore, SimilarityStore, StoreError};

/// Literal separator between the lesson/quiz body and the answer key in
/// well-formed generated material. Treated as a wire contract with the
/// generative provider: the `materials` prompt instructs the model to emit it.
pub const ANSWER_DELIMITER: &str = "---ANSWERS---";

/// How many similar documents the retrieval stage requests.
const TOP_K: usize = 5;

const CURRICULUM_ROLE: &str =
    "You are a curriculum planner who proposes learning topics for young children.";
const MATERIALS_ROLE: &str =
    "You are a lesson author who writes teaching materials and quizzes for children.";
const FEEDBACK_ROLE: &str = "You are a patient tutor evaluating a child's quiz answers.";
const NEXT_MATERIAL_ROLE: &str =
    "You are a lesson author planning a child's next lesson from their results so far.";
const SUMMARY_ROLE: &str =
    "You are a tutor summarizing a child's overall learning progress for their guardians.";

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Template(#[from] PromptError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("pipeline completed without producing {0}")]
    TerminalFieldMissing(&'static str),
}

/// Splits generated material into the lesson/quiz body and the answer key.
///
/// Without the delimiter the whole text is the lesson body and the answer key
/// is empty; this is the degraded path for ill-formed model output, never an
/// error.
pub fn split_generated_materials(generated: &str) -> (String, String) {
    match generated.split_once(ANSWER_DELIMITER) {
        Some((lesson, answers)) => (lesson.trim().to_string(), answers.trim().to_string()),
        None => (generated.trim().to_string(), String::new()),
    }
}

/// Sequences the prompt renderer, the generative/embedding clients, and the
/// stores into the three learning-session pipelines.
///
/// Constructed once at process start with its collaborators injected; each
/// pipeline invocation owns a private [`WorkflowState`] and may run
/// concurrently with others against the shared collaborators.
pub struct Orchestrator {
    generative: Arc<dyn GenerativeClient>,
    embedding: Arc<dyn EmbeddingClient>,
    similarity: Arc<dyn SimilarityStore>,
    sessions: Arc<dyn SessionStore>,
    prompts: Arc<PromptRenderer>,
    chat_model: String,
}

impl Orchestrator {
    pub fn new(
        generative: Arc<dyn GenerativeClient>,
        embedding: Arc<dyn EmbeddingClient>,
        similarity: Arc<dyn SimilarityStore>,
        sessions: Arc<dyn SessionStore>,
        prompts: Arc<PromptRenderer>,
        chat_model: String,
    ) -> Self {
        Self {
            generative,
            embedding,
            similarity,
            sessions,
            prompts,
            chat_model,
        }
    }

    /// Profile in, generated lesson out: curriculum, retrieval, generation.
    pub async fn initial_lesson(
        &self,
        profile: ChildProfile,
    ) -> Result<LearningResponse, WorkflowError> {
        let mut state = WorkflowState::for_profile(profile);
        self.curriculum_stage(&mut state).await?;
        self.retrieval_stage(&mut state).await?;
        self.generation_stage(&mut state).await?;
        state
            .learning_response
            .take()
            .ok_or(WorkflowError::TerminalFieldMissing("learning_response"))
    }

    /// Submitted answers in, feedback (and usually a next lesson) out.
    pub async fn assessment_feedback(
        &self,
        submission: AssessmentSubmission,
    ) -> Result<FeedbackResponse, WorkflowError> {
        let mut state = WorkflowState::for_assessment(submission);
        self.submission_stage(&mut state).await?;
        self.feedback_stage(&mut state).await?;
        self.next_material_stage(&mut state).await?;
        state
            .feedback_response
            .take()
            .ok_or(WorkflowError::TerminalFieldMissing("feedback_response"))
    }

    /// Caller-reduced history in, one summary text out.
    pub async fn overall_feedback(
        &self,
        request: OverallFeedbackRequest,
    ) -> Result<OverallFeedbackResponse, WorkflowError> {
        let mut state = WorkflowState::for_overall(request);
        self.summary_stage(&mut state).await?;
        state
            .overall_feedback_response
            .take()
            .ok_or(WorkflowError::TerminalFieldMissing(
                "overall_feedback_response",
            ))
    }

    async fn curriculum_stage(&self, state: &mut WorkflowState) -> Result<(), WorkflowError> {
        let Some(profile) = &state.profile else {
            return Ok(());
        };

        let vars = HashMap::from([
            ("name", TemplateValue::Text(profile.name.clone())),
            ("age", TemplateValue::Number(i64::from(profile.age))),
            ("interests", TemplateValue::List(profile.interests.clone())),
        ]);
        let prompt = self.prompts.render("initial_curriculum", &vars)?;
        let curriculum = self
            .generative
            .complete(CURRICULUM_ROLE, &prompt, &self.chat_model)
            .await?;

        debug!(child_id = %profile.child_id, "curriculum drafted");
        state.curriculum = Some(curriculum);
        Ok(())
    }

    async fn retrieval_stage(&self, state: &mut WorkflowState) -> Result<(), WorkflowError> {
        let Some(curriculum) = &state.curriculum else {
            return Ok(());
        };

        let embedding = self.embedding.embed(curriculum).await?;
        let related_docs = self.similarity.query_nearest(&embedding, TOP_K).await?;

        debug!(related = related_docs.len(), "similar documents retrieved");
        state.embedding = Some(embedding);
        state.related_docs = Some(related_docs);
        Ok(())
    }

    async fn generation_stage(&self, state: &mut WorkflowState) -> Result<(), WorkflowError> {
        let (Some(curriculum), Some(related_docs), Some(profile)) =
            (&state.curriculum, &state.related_docs, &state.profile)
        else {
            return Ok(());
        };

        let vars = HashMap::from([
            ("curriculum", TemplateValue::Text(curriculum.clone())),
            (
                "documents",
                TemplateValue::List(related_docs.iter().map(|d| d.document.clone()).collect()),
            ),
        ]);
        let prompt = self.prompts.render("materials", &vars)?;
        let generated = self
            .generative
            .complete(MATERIALS_ROLE, &prompt, &self.chat_model)
            .await?;

        let (lesson, answer_key) = split_generated_materials(&generated);
        let materials = if answer_key.is_empty() {
            Vec::new()
        } else {
            vec![answer_key]
        };
        let materials_text = materials.join("\n");

        let lesson_id = Uuid::new_v4();
        let session = LessonSession::new(
            lesson_id,
            profile.child_id.clone(),
            curriculum.clone(),
            lesson.clone(),
            materials_text.clone(),
        );
        self.sessions.create(&session).await?;

        info!(child_id = %profile.child_id, %lesson_id, "lesson generated and stored");
        state.lesson = Some(lesson.clone());
        state.materials = Some(materials);
        state.lesson_id = Some(lesson_id);
        state.learning_response = Some(LearningResponse {
            lesson,
            materials_text,
            lesson_id,
        });
        Ok(())
    }

    async fn submission_stage(&self, state: &mut WorkflowState) -> Result<(), WorkflowError> {
        let Some(submission) = &state.assessment else {
            return Ok(());
        };

        let embedding = self.embedding.embed(&submission.responses_text).await?;
        let id = format!("{}_{}_resp", submission.child_id, submission.lesson_id);
        let metadata = json!({
            "student_id": submission.child_id,
            "lesson_id": submission.lesson_id.to_string(),
            "type": "assessment",
            "materials": submission.materials_text,
        });
        self.similarity
            .upsert(&id, &submission.responses_text, &embedding, metadata)
            .await?;

        debug!(child_id = %submission.child_id, lesson_id = %submission.lesson_id, "assessment stored");
        state.responses = Some(submission.responses_text.clone());
        Ok(())
    }

    async fn feedback_stage(&self, state: &mut WorkflowState) -> Result<(), WorkflowError> {
        let (Some(responses), Some(submission)) = (&state.responses, &state.assessment) else {
            return Ok(());
        };

        let vars = HashMap::from([
            (
                "materials",
                TemplateValue::Text(submission.materials_text.clone()),
            ),
            ("responses", TemplateValue::Text(responses.clone())),
        ]);
        let prompt = self.prompts.render("feedback", &vars)?;
        let feedback = self
            .generative
            .complete(FEEDBACK_ROLE, &prompt, &self.chat_model)
            .await?;

        let matched = self
            .sessions
            .attach_feedback(&submission.child_id, submission.lesson_id, &feedback)
            .await?;
        if !matched {
            warn!(
                child_id = %submission.child_id,
                lesson_id = %submission.lesson_id,
                "assessment references a lesson the store has no record of"
            );
        }

        state.feedback = Some(feedback.clone());
        state.feedback_response = Some(FeedbackResponse {
            feedback,
            next_lesson: None,
        });
        Ok(())
    }

    async fn next_material_stage(&self, state: &mut WorkflowState) -> Result<(), WorkflowError> {
        let (Some(feedback), Some(submission)) = (&state.feedback, &state.assessment) else {
            return Ok(());
        };
        // Unmatched submissions have no stored lesson to build on; the
        // response then ships without a next lesson.
        let Some(session) = self
            .sessions
            .get(&submission.child_id, submission.lesson_id)
            .await?
        else {
            return Ok(());
        };

        let previous = self
            .similarity
            .latest_by_filter(&json!({
                "student_id": submission.child_id,
                "type": "assessment",
            }))
            .await?;
        let previous_responses = previous.map(|r| r.document).unwrap_or_default();

        let vars = HashMap::from([
            ("curriculum", TemplateValue::Text(session.curriculum)),
            ("lesson", TemplateValue::Text(session.lesson)),
            ("feedback", TemplateValue::Text(feedback.clone())),
            ("previous_responses", TemplateValue::Text(previous_responses)),
        ]);
        let prompt = self.prompts.render("next_material", &vars)?;
        let next_lesson = self
            .generative
            .complete(NEXT_MATERIAL_ROLE, &prompt, &self.chat_model)
            .await?;

        debug!(child_id = %submission.child_id, "next lesson drafted");
        state.next_lesson = Some(next_lesson.clone());
        if let Some(response) = &mut state.feedback_response {
            response.next_lesson = Some(next_lesson);
        }
        Ok(())
    }

    async fn summary_stage(&self, state: &mut WorkflowState) -> Result<(), WorkflowError> {
        let Some(request) = &state.overall else {
            return Ok(());
        };

        let history_text = if request.history.is_empty() {
            "(no completed lessons yet)".to_string()
        } else {
            request
                .history
                .iter()
                .map(|entry| {
                    format!(
                        "- interests: {}; topic: {}; feedback: {}",
                        entry.interests, entry.topic, entry.feedback
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let vars = HashMap::from([
            ("name", TemplateValue::Text(request.name.clone())),
            ("age", TemplateValue::Number(i64::from(request.age))),
            ("history", TemplateValue::Text(history_text)),
        ]);
        let prompt = self.prompts.render("feedback_summary", &vars)?;
        let feedback = self
            .generative
            .complete(SUMMARY_ROLE, &prompt, &self.chat_model)
            .await?;

        state.overall_feedback_response = Some(OverallFeedbackResponse { feedback });
        Ok(())
    }
}
