//! Prompt templates for answer synthesis

use crate::types::ChatMessage;

/// Delimiter around context blocks
pub const CONTEXT_DELIMITER: &str = "---------------------";

/// Answer returned when retrieval finds nothing
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render prior turns, oldest first
    pub fn build_history(history: &[ChatMessage]) -> String {
        history
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First-pass question answering prompt
    pub fn build_qa_prompt(question: &str, context: &str, history: &[ChatMessage]) -> String {
        let history_block = if history.is_empty() {
            String::new()
        } else {
            format!(
                "Conversation so far:\n{}\n\n",
                Self::build_history(history)
            )
        };

        format!(
            "Context information is below.\n\
             {delim}\n\
             {context}\n\
             {delim}\n\
             {history_block}\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: {question}\n\
             Answer: ",
            delim = CONTEXT_DELIMITER,
            context = context,
            history_block = history_block,
            question = question,
        )
    }

    /// Refine an existing answer with more context
    pub fn build_refine_prompt(question: &str, existing_answer: &str, context: &str) -> String {
        format!(
            "The original query is as follows: {question}\n\
             We have provided an existing answer: {existing_answer}\n\
             We have the opportunity to refine the existing answer (only if needed) with some more context below.\n\
             {delim}\n\
             {context}\n\
             {delim}\n\
             Given the new context, refine the original answer to better answer the query. \
             If the context isn't useful, return the original answer.\n\
             Refined Answer: ",
            delim = CONTEXT_DELIMITER,
            question = question,
            existing_answer = existing_answer,
            context = context,
        )
    }

    /// Characters the QA template adds around its context
    pub fn qa_overhead(question: &str, history: &[ChatMessage]) -> usize {
        Self::build_qa_prompt(question, "", history).chars().count()
    }

    /// Characters the refine template adds around its context and answer
    pub fn refine_overhead(question: &str) -> usize {
        Self::build_refine_prompt(question, "", "").chars().count()
    }
}
