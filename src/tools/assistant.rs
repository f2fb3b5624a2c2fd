//! Assistant tool

use crate::assistant::{AnthropicClient, AssistantError, AssistantTools, ChatBackend, ChatOutcome, ChatSession};
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{AppError, AppResult, ErrorKind};

use super::require_date;

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        let kind = match err {
            AssistantError::MissingApiKey | AssistantError::InvalidApiKey => ErrorKind::Unauthorized,
            _ => ErrorKind::Server,
        };
        AppError::new(kind, format!("Assistant request failed: {}", err))
    }
}

/// Client for the configured model, or `Unauthorized` without an API key
pub fn build_backend(config: &AppConfig) -> AppResult<AnthropicClient> {
    let api_key = config
        .anthropic_api_key
        .clone()
        .ok_or(AssistantError::MissingApiKey)?;
    Ok(AnthropicClient::new(api_key, config.ai_model.clone())?)
}

/// Ask the assistant a question; `date` (default today) anchors "today" in its prompt
pub async fn ask_assistant(
    backend: &dyn ChatBackend,
    db: &Database,
    config: &AppConfig,
    question: &str,
    date: Option<&str>,
) -> AppResult<ChatOutcome> {
    if question.trim().is_empty() {
        return Err(AppError::validation("question cannot be empty").with_field("question"));
    }
    let today = match date {
        Some(date) => require_date(date)?,
        None => chrono::Local::now().format("%Y-%m-%d").to_string(),
    };

    let tools = AssistantTools::new(db.clone(), config.page_size);
    let session = ChatSession::new(backend, tools, &today);
    let outcome = session.ask(question.trim()).await?;
    tracing::info!(rounds = outcome.rounds, tool_calls = outcome.tool_calls.len(), "assistant answered");
    Ok(outcome)
}
