//! Response synthesis over retrieved chunks
//!
//! `compact` packs as many chunks into each call as the model's input budget
//! allows; `refine` makes one call per chunk. Either way the first call uses
//! the QA template and later calls refine the running answer.

use std::sync::Arc;

use super::prompt::{PromptBuilder, EMPTY_RESPONSE};
use crate::config::ResponseMode;
use crate::error::Result;
use crate::providers::LlmProvider;
use crate::types::{ChatMessage, ScoredChunk};

/// Rough characters per token for budget estimates
const CHARS_PER_TOKEN: usize = 4;

/// Smallest context budget we will pack against
const MIN_CONTEXT_CHARS: usize = 256;

/// Turns retrieved chunks into an answer
#[derive(Clone)]
pub struct Synthesizer {
    llm: Arc<dyn LlmProvider>,
    mode: ResponseMode,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>, mode: ResponseMode) -> Self {
        Self { llm, mode }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Synthesize an answer; no LLM call is made when `chunks` is empty
    pub async fn synthesize(
        &self,
        question: &str,
        chunks: &[ScoredChunk],
        history: &[ChatMessage],
    ) -> Result<String> {
        if chunks.is_empty() {
            tracing::debug!("No chunks retrieved, skipping LLM call");
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.chunk.text.as_str()).collect();
        let packs = match self.mode {
            ResponseMode::Compact => pack_texts(&texts, self.context_budget(question, history)),
            ResponseMode::Refine => texts
                .iter()
                .map(|t| truncate_chars(t, self.context_budget(question, history)))
                .collect(),
        };

        tracing::debug!(
            "Synthesizing over {} chunks in {} LLM calls ({:?})",
            chunks.len(),
            packs.len(),
            self.mode
        );

        let mut packs = packs.into_iter();
        let first = packs.next().unwrap_or_default();
        let mut answer = self
            .llm
            .complete(&PromptBuilder::build_qa_prompt(question, &first, history))
            .await?;

        for context in packs {
            answer = self
                .llm
                .complete(&PromptBuilder::build_refine_prompt(question, &answer, &context))
                .await?;
        }

        Ok(answer.trim().to_string())
    }

    /// Characters of context one prompt can carry
    fn context_budget(&self, question: &str, history: &[ChatMessage]) -> usize {
        let input_tokens = self
            .llm
            .context_window()
            .saturating_sub(self.llm.max_output_tokens());
        let overhead = PromptBuilder::qa_overhead(question, history)
            .max(PromptBuilder::refine_overhead(question));

        (input_tokens * CHARS_PER_TOKEN)
            .saturating_sub(overhead)
            .max(MIN_CONTEXT_CHARS)
    }
}

/// Greedily pack texts, in order, into blocks of at most `budget` characters
///
/// A text longer than the budget gets a block of its own, truncated.
pub fn pack_texts(texts: &[&str], budget: usize) -> Vec<String> {
    const SEPARATOR: &str = "\n\n";

    let mut packs = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for text in texts {
        let len = text.chars().count();
        let needed = if current.is_empty() { len } else { len + SEPARATOR.len() };

        if !current.is_empty() && current_len + needed > budget {
            packs.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current.is_empty() {
            current = truncate_chars(text, budget);
            current_len = current.chars().count();
        } else {
            current.push_str(SEPARATOR);
            current.push_str(text);
            current_len += len + SEPARATOR.len();
        }
    }

    if !current.is_empty() {
        packs.push(current);
    }
    packs
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkSource};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingLlm {
        context_window: usize,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingLlm {
        fn new(context_window: usize) -> Arc<Self> {
            Arc::new(Self {
                context_window,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn complete(&self, prompt: &str) -> Result<String> {
            let mut prompts = self.prompts.lock();
            prompts.push(prompt.to_string());
            Ok(format!("answer {}", prompts.len()))
        }

        fn context_window(&self) -> usize {
            self.context_window
        }

        fn max_output_tokens(&self) -> usize {
            0
        }

        fn model(&self) -> &str {
            "recording"
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn scored(text: &str) -> ScoredChunk {
        let source = ChunkSource {
            filename: "doc.pdf".to_string(),
            document_hash: "h".to_string(),
            segment_index: 0,
            page_number: Some(1),
            byte_start: 0,
            byte_end: text.len(),
        };
        ScoredChunk {
            chunk: Chunk::new(text.to_string(), source, 0),
            score: 1.0,
        }
    }

    #[test]
    fn test_pack_texts() {
        let packs = pack_texts(&["aaaa", "bbbb", "cccc"], 10);
        assert_eq!(packs, vec!["aaaa\n\nbbbb", "cccc"]);

        let packs = pack_texts(&["aaaaaaaaaaaaaaa", "b"], 10);
        assert_eq!(packs, vec!["aaaaaaaaaa", "b"]);

        assert!(pack_texts(&[], 10).is_empty());
    }

    #[tokio::test]
    async fn test_empty_retrieval_skips_llm() {
        let llm = RecordingLlm::new(32768);
        let synthesizer = Synthesizer::new(llm.clone(), ResponseMode::Compact);

        let answer = synthesizer.synthesize("Anything?", &[], &[]).await.unwrap();
        assert_eq!(answer, "Empty Response");
        assert!(llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_compact_uses_one_call_when_context_fits() {
        let llm = RecordingLlm::new(32768);
        let synthesizer = Synthesizer::new(llm.clone(), ResponseMode::Compact);
        let chunks = vec![scored("First fact."), scored("Second fact."), scored("Third fact.")];

        let answer = synthesizer.synthesize("Facts?", &chunks, &[]).await.unwrap();
        let prompts = llm.prompts.lock();

        assert_eq!(answer, "answer 1");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("First fact.\n\nSecond fact.\n\nThird fact."));
    }

    #[tokio::test]
    async fn test_refine_mode_calls_per_chunk() {
        let llm = RecordingLlm::new(32768);
        let synthesizer = Synthesizer::new(llm.clone(), ResponseMode::Refine);
        let chunks = vec![scored("First fact."), scored("Second fact.")];

        let answer = synthesizer.synthesize("Facts?", &chunks, &[]).await.unwrap();
        let prompts = llm.prompts.lock();

        assert_eq!(answer, "answer 2");
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].starts_with("Context information is below."));
        assert!(prompts[1].contains("existing answer: answer 1"));
        assert!(prompts[1].contains("Second fact."));
    }

    #[tokio::test]
    async fn test_compact_splits_when_budget_is_small() {
        // 64 tokens is below the template overhead, so the budget bottoms out
        let llm = RecordingLlm::new(64);
        let synthesizer = Synthesizer::new(llm.clone(), ResponseMode::Compact);
        let long = "x".repeat(200);
        let chunks = vec![scored(&long), scored(&long)];

        synthesizer.synthesize("Q?", &chunks, &[]).await.unwrap();
        assert_eq!(llm.prompts.lock().len(), 2);
    }
}
