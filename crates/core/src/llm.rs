//! Generative and Embedding Client Contracts
//!
//! Thin wrappers over a remote OpenAI-compatible completion/embedding
//! capability. Both clients are stateless aside from configuration fixed at
//! construction; a failed remote call is fatal to the pipeline invocation
//! that made it and is never retried here.

use async_openai::{
    Client,
    config::Config,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs,
    },
};
use async_trait::async_trait;

/// A failed call to the remote generative or embedding service.
///
/// Carries the HTTP status when the transport exposed one; provider-level
/// errors (quota, auth, malformed request) surface through `message`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("provider call failed: {message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl From<OpenAIError> for ProviderError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => Self {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            OpenAIError::ApiError(api) => Self {
                status: None,
                message: api.message,
            },
            other => Self {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

/// A remote text-completion capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Makes a single, blocking completion call and returns the generated text.
    async fn complete(
        &self,
        system_role: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, ProviderError>;
}

/// A remote text-embedding capability.
///
/// Every vector returned by one client instance has the same, provider-defined
/// dimension; the similarity store relies on this.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// `GenerativeClient` over any OpenAI-compatible endpoint.
///
/// Generic over the client configuration so the same adapter serves plain
/// OpenAI and Azure deployments.
pub struct OpenAiGenerativeClient<C: Config> {
    client: Client<C>,
}

impl<C: Config> OpenAiGenerativeClient<C> {
    pub fn new(config: C) -> Self {
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl<C: Config + Send + Sync> GenerativeClient for OpenAiGenerativeClient<C> {
    async fn complete(
        &self,
        system_role: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, ProviderError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_role)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError {
                status: None,
                message: "model response contained no text content".to_string(),
            })
    }
}

/// `EmbeddingClient` over any OpenAI-compatible endpoint.
///
/// The embedding model is fixed at construction; with Azure the deployment
/// baked into the config selects the model and this name is passed through.
pub struct OpenAiEmbeddingClient<C: Config> {
    client: Client<C>,
    model: String,
}

impl<C: Config> OpenAiEmbeddingClient<C> {
    pub fn new(config: C, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl<C: Config + Send + Sync> EmbeddingClient for OpenAiEmbeddingClient<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text)
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| ProviderError {
                status: None,
                message: "embedding response contained no vectors".to_string(),
            })
    }
}
