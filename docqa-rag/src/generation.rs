//! Generation port: an ordered conversation in, generated text out.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    /// Who wrote the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl Turn {
    /// A system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A language model that continues a conversation.
///
/// # Errors
///
/// Implementations return [`RagError::ModelUnavailable`] when the model is not
/// loaded or cannot be reached and [`RagError::GenerationError`] when
/// inference fails.
///
/// [`RagError::ModelUnavailable`]: crate::RagError::ModelUnavailable
/// [`RagError::GenerationError`]: crate::RagError::GenerationError
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// The model name, used in logs and health reports.
    fn name(&self) -> &str;

    /// Generate the next assistant message for `turns`.
    async fn generate(&self, turns: &[Turn]) -> Result<String>;
}
