//! Grounded question answering over the remote index.

pub mod sanitize;

use crate::openai::{BackendError, GroundedQuery, RetrievalBackend};
use std::sync::Arc;
use thiserror::Error;

pub use sanitize::sanitize;

/// Sentence the model must return verbatim when the documents do not contain the answer.
pub const NOT_FOUND_ANSWER: &str = "PDF’lerde bu bilgi bulunamadı.";

/// Instruction sent as the system message of every question.
pub fn grounding_instructions() -> String {
    format!(
        "You are a Turkish academic PDF reading assistant.\n\
         Answer ONLY using information retrieved from the provided PDF knowledge base.\n\
         If the answer is not present in the PDFs, say exactly: '{NOT_FOUND_ANSWER}'\n\
         Keep answers short, clear, and preferably bullet-pointed.\n\
         Never output internal citation tokens like 'filecite', 'turn0file', or weird symbols.\n\
         If you mention sources, use plain text only (e.g., 'Kaynak: paper1.pdf').\n\
         \n\
         IMPORTANT: Respond in Turkish.\n"
    )
}

/// Errors raised while answering a question.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// The question was blank after trimming.
    #[error("question is empty")]
    EmptyQuestion,
    /// The hosted completion call failed.
    #[error("Answer failed: {0}")]
    Backend(#[from] BackendError),
}

/// Sends questions to the hosted model with retrieval restricted to one index.
pub struct AnswerEngine {
    backend: Arc<dyn RetrievalBackend>,
}

impl AnswerEngine {
    /// Build an engine on top of `backend`.
    pub fn new(backend: Arc<dyn RetrievalBackend>) -> Self {
        Self { backend }
    }

    /// Answer `question` from the contents of `index_id` using `model`.
    ///
    /// Blank questions are rejected before any remote call. Remote failures are returned as-is;
    /// there is no retry and no fallback answer.
    pub async fn ask(
        &self,
        index_id: &str,
        question: &str,
        model: &str,
    ) -> Result<String, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        let query = GroundedQuery {
            model: model.to_string(),
            instructions: grounding_instructions(),
            question: question.to_string(),
            vector_store_id: index_id.to_string(),
        };

        tracing::info!(index_id, model, "Answering question");
        let raw = self.backend.respond(&query).await?;
        let answer = sanitize(&raw);
        tracing::debug!(
            raw_len = raw.len(),
            answer_len = answer.len(),
            "Answer received"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_carry_the_exact_fallback_sentence() {
        let instructions = grounding_instructions();
        assert!(instructions.contains("say exactly: 'PDF’lerde bu bilgi bulunamadı.'"));
        assert!(instructions.contains("Respond in Turkish"));
        assert!(instructions.contains("Answer ONLY using information retrieved"));
    }

    #[test]
    fn fallback_sentence_survives_sanitize() {
        assert_eq!(sanitize(NOT_FOUND_ANSWER), NOT_FOUND_ANSWER);
    }
}
