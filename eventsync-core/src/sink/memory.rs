use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{OutboundMessage, PublishError, Sink};
use crate::context::ExecContext;

/// Keeps published messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn publish(
        &self,
        ctx: &ExecContext,
        message: &OutboundMessage,
    ) -> Result<(), PublishError> {
        ctx.check()?;
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
