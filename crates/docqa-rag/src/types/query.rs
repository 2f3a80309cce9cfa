//! Request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Question for the document Q&A endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }

    /// Whether the question has any content
    pub fn is_blank(&self) -> bool {
        self.question.trim().is_empty()
    }
}

/// Message for the chat endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message
    pub message: String,
}

/// The two service keys a session needs
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Gemini key (generation and embeddings)
    #[serde(default)]
    pub gemini_api_key: String,
    /// LlamaParse key (document parsing)
    #[serde(default)]
    pub llama_cloud_api_key: String,
}

impl Credentials {
    pub fn new(gemini_api_key: impl Into<String>, llama_cloud_api_key: impl Into<String>) -> Self {
        Self {
            gemini_api_key: gemini_api_key.into(),
            llama_cloud_api_key: llama_cloud_api_key.into(),
        }
    }

    /// Both keys must be present and non-blank; surrounding whitespace is dropped
    pub fn validated(self) -> Result<Self> {
        let gemini_api_key = self.gemini_api_key.trim().to_string();
        let llama_cloud_api_key = self.llama_cloud_api_key.trim().to_string();

        let mut missing = Vec::new();
        if gemini_api_key.is_empty() {
            missing.push("gemini_api_key");
        }
        if llama_cloud_api_key.is_empty() {
            missing.push("llama_cloud_api_key");
        }
        if !missing.is_empty() {
            return Err(Error::MissingCredentials(format!(
                "please enter both API keys (missing: {})",
                missing.join(", ")
            )));
        }

        Ok(Self {
            gemini_api_key,
            llama_cloud_api_key,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &"<redacted>")
            .field("llama_cloud_api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        let creds = Credentials::new(" g-key ", "l-key").validated().unwrap();
        assert_eq!(creds.gemini_api_key, "g-key");

        let err = Credentials::new("g-key", "   ").validated().unwrap_err();
        assert!(matches!(err, Error::MissingCredentials(msg) if msg.contains("llama_cloud_api_key")));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let creds = Credentials::new("secret-gemini", "secret-llama");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_blank_question() {
        assert!(QueryRequest::new("  \n").is_blank());
        assert!(!QueryRequest::new("What is the capital?").is_blank());
    }
}
