mod memory;

pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::models::chat::ConversationTurn;

/// Ordered log of conversation turns, oldest first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, turn: ConversationTurn) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Appends several turns as one step; no reader or `clear` sees a
    /// partial batch.
    async fn append_all(
        &self,
        turns: Vec<ConversationTurn>
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn list(&self) -> Result<Vec<ConversationTurn>, Box<dyn Error + Send + Sync>>;

    async fn clear(&self) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn len(&self) -> Result<usize, Box<dyn Error + Send + Sync>> {
        Ok(self.list().await?.len())
    }
}

pub fn initialize_history_store() -> Arc<dyn HistoryStore> {
    info!("Conversation history is kept in memory and is lost on restart");
    Arc::new(MemoryHistoryStore::new())
}

/// Newest `limit` turns, still oldest first.
pub fn tail(mut turns: Vec<ConversationTurn>, limit: Option<usize>) -> Vec<ConversationTurn> {
    if let Some(limit) = limit {
        if turns.len() > limit {
            turns.drain(..turns.len() - limit);
        }
    }
    turns
}
