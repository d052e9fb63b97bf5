use async_trait::async_trait;
use std::error::Error;
use tokio::sync::RwLock;
use crate::history::HistoryStore;
use crate::models::chat::ConversationTurn;

/// Process-local log. Unbounded; cleared only on request or restart.
#[derive(Default)]
pub struct MemoryHistoryStore {
    turns: RwLock<Vec<ConversationTurn>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, turn: ConversationTurn) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.turns.write().await.push(turn);
        Ok(())
    }

    async fn append_all(
        &self,
        turns: Vec<ConversationTurn>
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.turns.write().await.extend(turns);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConversationTurn>, Box<dyn Error + Send + Sync>> {
        Ok(self.turns.read().await.clone())
    }

    async fn clear(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.turns.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, Box<dyn Error + Send + Sync>> {
        Ok(self.turns.read().await.len())
    }
}
