//! Main Entrypoint for the Sprout API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the database connection pool and running migrations.
//! 3. Initializing the shared generative, embedding, and store services.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::{AzureConfig, OpenAIConfig};
use sprout_api::{
    config::{Config, Provider},
    db::{Db, PgSessionStore, PgSimilarityStore},
    router::create_router,
    state::AppState,
};
use sprout_core::{
    llm::{EmbeddingClient, GenerativeClient, OpenAiEmbeddingClient, OpenAiGenerativeClient},
    prompts::{PromptRenderer, TEMPLATE_NAMES},
    store::{SessionStore, SimilarityStore},
    workflow::Orchestrator,
};
use sqlx::PgPool;
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

const AZURE_API_VERSION: &str = "2024-05-01-preview";

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompt templates from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in std::fs::read_dir(prompts_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Database ---
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let db = Db::new(pool);
    db.run_migrations().await?;
    info!("Database connection established and migrations are up-to-date.");

    // --- 4. Load Prompt Templates ---
    let prompts = load_prompts(&config.prompts_path)
        .with_context(|| format!("Failed to load prompts from {:?}", config.prompts_path))?;
    for name in TEMPLATE_NAMES {
        if !prompts.contains_key(name) {
            anyhow::bail!("{name}.md not found in prompts directory");
        }
    }
    let renderer = Arc::new(PromptRenderer::new(prompts));

    // --- 5. Initialize Shared Services ---
    let (generative, embedding): (Arc<dyn GenerativeClient>, Arc<dyn EmbeddingClient>) =
        match &config.provider {
            Provider::OpenAI => {
                info!("Using OpenAI provider.");
                let api_key = config.openai_api_key.as_deref().unwrap();
                let openai_config = OpenAIConfig::new().with_api_key(api_key);
                (
                    Arc::new(OpenAiGenerativeClient::new(openai_config.clone())),
                    Arc::new(OpenAiEmbeddingClient::new(
                        openai_config,
                        config.embedding_model.clone(),
                    )),
                )
            }
            Provider::Azure => {
                info!("Using Azure OpenAI provider.");
                let endpoint = config.azure_endpoint.as_deref().unwrap();
                let api_key = config.azure_api_key.as_deref().unwrap();
                // Azure selects the model through the deployment, so the chat
                // and embedding clients each get their own config.
                let chat_config = AzureConfig::new()
                    .with_api_base(endpoint)
                    .with_api_key(api_key)
                    .with_api_version(AZURE_API_VERSION)
                    .with_deployment_id(config.azure_chat_deployment.as_deref().unwrap());
                let embed_config = AzureConfig::new()
                    .with_api_base(endpoint)
                    .with_api_key(api_key)
                    .with_api_version(AZURE_API_VERSION)
                    .with_deployment_id(config.azure_embedding_deployment.as_deref().unwrap());
                (
                    Arc::new(OpenAiGenerativeClient::new(chat_config)),
                    Arc::new(OpenAiEmbeddingClient::new(
                        embed_config,
                        config.embedding_model.clone(),
                    )),
                )
            }
        };

    let similarity: Arc<dyn SimilarityStore> = Arc::new(PgSimilarityStore::new(db.pool()));
    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(db.pool()));

    let orchestrator = Arc::new(Orchestrator::new(
        generative,
        embedding,
        similarity,
        sessions.clone(),
        renderer,
        config.chat_model.clone(),
    ));

    let app_state = Arc::new(AppState {
        orchestrator,
        sessions,
        config: Arc::new(config.clone()),
    });

    // --- 6. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 7. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.close().await;
    info!("Server has shut down.");
    Ok(())
}
