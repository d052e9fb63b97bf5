use crate::config::prompt;
use crate::history::HistoryStore;
use crate::llm::CompletionError;
use crate::llm::chat::ChatClient;
use crate::models::chat::{ ConversationTurn, RequestContext, SuggestionResult, TurnRole };
use crate::reply::parse_reply;

use log::{ debug, error, info };
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("failed to record conversation history: {0}")]
    History(Box<dyn StdError + Send + Sync>),
}

/// Relays one message to the completion service and records the exchange.
#[derive(Clone)]
pub struct ConversationAssistant {
    chat_client: Arc<dyn ChatClient>,
    history_store: Arc<dyn HistoryStore>,
    model: String,
    max_tokens: u32,
}

impl ConversationAssistant {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        history_store: Arc<dyn HistoryStore>,
        model: String,
        max_tokens: u32
    ) -> Self {
        Self { chat_client, history_store, model, max_tokens }
    }

    pub fn history(&self) -> Arc<dyn HistoryStore> {
        Arc::clone(&self.history_store)
    }

    /// The log only changes once a reply has been produced, and then by
    /// exactly one user turn and one assistant turn.
    pub async fn generate_suggestion(
        &self,
        message: &str,
        context: &RequestContext
    ) -> Result<SuggestionResult, AssistantError> {
        let request_id = Uuid::new_v4();
        info!(
            "[{}] Received message ({} chars, scenario={})",
            request_id,
            message.chars().count(),
            context.scenario.as_deref().unwrap_or("general")
        );

        let messages = prompt::build_messages(message, context);
        let started = Instant::now();
        let completion = match
            self.chat_client.complete(&messages, &self.model, self.max_tokens).await
        {
            Ok(c) => c,
            Err(e) => {
                error!("[{}] Completion failed after {:?}: {}", request_id, started.elapsed(), e);
                return Err(e.into());
            }
        };
        debug!("[{}] Upstream answered in {:?}", request_id, started.elapsed());

        let result = parse_reply(&completion.response);

        self.history_store
            .append_all(
                vec![
                    ConversationTurn::new(TurnRole::User, message),
                    ConversationTurn::new(TurnRole::Assistant, result.suggestion.clone())
                ]
            ).await
            .map_err(AssistantError::History)?;

        let preview: String = result.suggestion.chars().take(100).collect();
        info!("[{}] Generated suggestion: {}", request_id, preview);

        Ok(result)
    }
}
