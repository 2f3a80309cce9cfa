//! Multi-turn chat over a query engine
//!
//! The transcript is append-only; an exchange is recorded only when the
//! query succeeds, so a failed call leaves it untouched.

use crate::error::{Error, Result};
use crate::retrieval::QueryEngine;
use crate::types::{ChatMessage, ConversationState, QueryResponse};

/// Chat wrapper owning the conversation transcript
#[derive(Debug, Clone, Default)]
pub struct ChatInterface {
    state: ConversationState,
    /// Prior question/answer turns forwarded with each question (0 = none)
    history_turns: usize,
}

impl ChatInterface {
    pub fn new(history_turns: usize) -> Self {
        Self {
            state: ConversationState::new(),
            history_turns,
        }
    }

    /// Ask `engine` about `text` and record the exchange
    ///
    /// Blank input is a no-op: no provider call, no transcript change, `None`.
    pub async fn process_user_input(
        &mut self,
        engine: &QueryEngine,
        text: &str,
    ) -> Result<Option<QueryResponse>> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let history = self.state.recent(self.history_turns * 2);
        let response = match engine.query_with_history(question, history).await {
            Ok(response) => response,
            Err(Error::EmptyQuestion) => return Ok(None),
            Err(e) => return Err(e),
        };

        self.state.push_exchange(question, response.answer.clone());
        Ok(Some(response))
    }

    /// Reset the transcript
    pub fn clear_chat_history(&mut self) {
        self.state.clear();
    }

    /// Transcript, oldest first
    pub fn display(&self) -> &[ChatMessage] {
        self.state.messages()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}
