//! Action layer shared by the CLI and HTTP surfaces.
//!
//! [`Assistant`] owns the collaborators and the loaded [`AppState`], and turns each user action
//! into one awaited operation. Errors from remote calls stop here: they become user-facing
//! messages and leave the persisted state at its last good value. Creating the remote index is
//! one of those calls, so a failed creation at startup is retried by the next action. The chat transcript is a
//! separate [`ChatSession`] owned by the surface and passed in by reference.

use crate::answer::AnswerEngine;
use crate::documents::{DocumentLister, DocumentRef};
use crate::indexing::{IndexError, IndexManager, needs_indexing};
use crate::state::{AppState, StateStore};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;
use time::macros::format_description;

/// Models offered for answering; the first one is the default.
pub const AVAILABLE_MODELS: [&str; 2] = ["gpt-5-mini", "gpt-5"];

/// Warning shown for a blank question.
pub const BLANK_QUESTION: &str = "Please type a question.";

/// Ready-made questions offered alongside free-form input.
pub const PRESET_QUESTIONS: [&str; 4] = [
    "Bu makalenin temel katkısı nedir? 5 maddede özetle.",
    "Önerilen yöntemi adım adım açıkla. Varsayımlar neler?",
    "Deneylerde hangi veri setleri/metrikler kullanılmış? Sonuçları özetle.",
    "Kısıtlar (limitations) ve gelecek çalışmalar kısmı ne diyor?",
];

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking.
    User,
    /// The answering model.
    Assistant,
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    /// Who produced the text.
    pub role: Role,
    /// Message body.
    pub text: String,
}

/// Transient, in-memory chat transcript. Never persisted.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            text: text.into(),
        });
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Turns in the order they were added.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Turns in display order, newest first.
    pub fn turns_newest_first(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter().rev()
    }

    /// Whether the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Snapshot rendered by the surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    /// Remote index identifier, absent until creation succeeds.
    pub index_id: Option<String>,
    /// Filenames currently present in the document directory.
    pub documents: Vec<String>,
    /// Filenames included in the last indexing run.
    pub indexed_files: Vec<String>,
    /// Formatted time of the last indexing run, when there was one.
    pub last_indexed: Option<String>,
    /// Whether the listed documents match the last indexing run.
    pub already_indexed: bool,
    /// Model used for the next question.
    pub model: String,
}

/// Result of an index action, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum IndexOutcome {
    /// There are no documents to upload.
    NoDocuments(String),
    /// The current documents were already indexed.
    AlreadyIndexed(String),
    /// The batch finished; carries the reported status.
    Indexed(String),
    /// Indexing failed; carries the error text.
    Failed(String),
}

impl IndexOutcome {
    /// Text shown to the user.
    pub fn message(&self) -> &str {
        match self {
            Self::NoDocuments(message)
            | Self::AlreadyIndexed(message)
            | Self::Indexed(message)
            | Self::Failed(message) => message,
        }
    }
}

/// Result of an ask action, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum AskOutcome {
    /// The question was rejected before any remote call.
    Rejected(String),
    /// Answer text produced by the model.
    Answered(String),
    /// The remote call failed; carries the error text.
    Failed(String),
}

/// Action facade owned by a presentation surface.
pub struct Assistant {
    store: StateStore,
    lister: DocumentLister,
    indexer: IndexManager,
    engine: AnswerEngine,
    state: AppState,
    model: String,
}

impl Assistant {
    /// Load the persisted state and try to make sure the remote index exists.
    ///
    /// A creation failure is logged and left for the next index or ask action to retry.
    pub async fn start(
        store: StateStore,
        lister: DocumentLister,
        indexer: IndexManager,
        engine: AnswerEngine,
        model: impl Into<String>,
    ) -> Self {
        let mut assistant = Self {
            state: store.load(),
            store,
            lister,
            indexer,
            engine,
            model: model.into(),
        };
        match assistant.ensure_index().await {
            Ok(index_id) => tracing::info!(index_id = %index_id, "Assistant ready"),
            Err(err) => {
                tracing::warn!(error = %err, "Remote index unavailable; retrying on next action");
            }
        }
        assistant
    }

    async fn ensure_index(&mut self) -> Result<String, IndexError> {
        self.indexer.ensure_index(&mut self.state).await
    }

    /// Remote index identifier, once created.
    pub fn index_id(&self) -> Option<&str> {
        self.state.remote_index_id.as_deref()
    }

    /// Currently loaded state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Model used for the next question.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Backing state file location.
    pub fn state_path(&self) -> &std::path::Path {
        self.store.path()
    }

    /// Documents currently available for indexing.
    pub fn documents(&self) -> Vec<DocumentRef> {
        self.lister.list()
    }

    /// Summarize index and document state for display.
    pub fn status(&self) -> StatusSummary {
        let documents = self.documents();
        StatusSummary {
            index_id: self.state.remote_index_id.clone(),
            already_indexed: !documents.is_empty() && !needs_indexing(&self.state, &documents),
            documents: documents
                .iter()
                .map(|document| document.file_name().to_string())
                .collect(),
            indexed_files: self.state.indexed_files.iter().cloned().collect(),
            last_indexed: self.state.last_index_timestamp.and_then(format_timestamp),
            model: self.model.clone(),
        }
    }

    /// Upload the current documents unless there is nothing new to index.
    pub async fn index(&mut self) -> IndexOutcome {
        let documents = self.documents();
        if documents.is_empty() {
            return IndexOutcome::NoDocuments(format!(
                "No PDFs found in {}. Add PDFs to that folder first.",
                self.lister.dir().display()
            ));
        }
        if !needs_indexing(&self.state, &documents) {
            return IndexOutcome::AlreadyIndexed("These PDFs are already indexed.".into());
        }

        match self.index_and_record(&documents).await {
            Ok(status) => IndexOutcome::Indexed(format!("Indexing finished. Status: {status}")),
            Err(err) => {
                tracing::error!(error = %err, "Indexing failed");
                IndexOutcome::Failed(format!("Indexing error: {err}"))
            }
        }
    }

    async fn index_and_record(&mut self, documents: &[DocumentRef]) -> Result<String, IndexError> {
        let index_id = self.ensure_index().await?;
        let status = self.indexer.index_documents(&index_id, documents).await?;
        let mut updated = self.state.clone();
        self.indexer
            .record_indexed(&mut updated, documents, unix_now())?;
        self.state = updated;
        Ok(status.to_string())
    }

    /// Ask `question`, recording the exchange in `session`.
    ///
    /// A blank question only yields a warning. Otherwise the user turn and then either the
    /// answer or the error text are appended as the assistant turn. A missing remote index is
    /// created first; its failure is reported like any other remote error.
    pub async fn ask(&mut self, session: &mut ChatSession, question: &str) -> AskOutcome {
        let question = question.trim();
        if question.is_empty() {
            return AskOutcome::Rejected(BLANK_QUESTION.into());
        }

        session.push(Role::User, question);
        let answer = match self.ensure_index().await {
            Ok(index_id) => self
                .engine
                .ask(&index_id, question, &self.model)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match answer {
            Ok(answer) => {
                session.push(Role::Assistant, answer.clone());
                AskOutcome::Answered(answer)
            }
            Err(err) => {
                tracing::error!(error = %err, "Question failed");
                let message = format!("Error: {err}");
                session.push(Role::Assistant, message.clone());
                AskOutcome::Failed(message)
            }
        }
    }

    /// Switch to one of [`AVAILABLE_MODELS`]; returns `false` for anything else.
    pub fn select_model(&mut self, name: &str) -> bool {
        match AVAILABLE_MODELS.iter().find(|model| **model == name.trim()) {
            Some(model) => {
                self.model = (*model).to_string();
                true
            }
            None => false,
        }
    }
}

/// Preset question by 1-based position.
pub fn preset_question(position: usize) -> Option<&'static str> {
    position
        .checked_sub(1)
        .and_then(|index| PRESET_QUESTIONS.get(index).copied())
}

/// Format epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_timestamp(epoch_seconds: i64) -> Option<String> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(epoch_seconds)
        .ok()?
        .format(&format)
        .ok()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_renders_newest_first_and_clears() {
        let mut session = ChatSession::new();
        session.push(Role::User, "soru");
        session.push(Role::Assistant, "cevap");

        let rendered: Vec<&str> = session
            .turns_newest_first()
            .map(|turn| turn.text.as_str())
            .collect();
        assert_eq!(rendered, vec!["cevap", "soru"]);
        assert_eq!(session.turns()[0].role, Role::User);

        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn presets_are_one_based() {
        assert_eq!(preset_question(0), None);
        assert_eq!(preset_question(1), Some(PRESET_QUESTIONS[0]));
        assert_eq!(preset_question(4), Some(PRESET_QUESTIONS[3]));
        assert_eq!(preset_question(5), None);
    }

    #[test]
    fn timestamps_format_in_utc() {
        assert_eq!(
            format_timestamp(1_700_000_000).as_deref(),
            Some("2023-11-14 22:13:20")
        );
        assert_eq!(format_timestamp(0).as_deref(), Some("1970-01-01 00:00:00"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = ChatTurn {
            role: Role::Assistant,
            text: "x".into(),
        };
        assert_eq!(
            serde_json::to_value(&turn).expect("json"),
            serde_json::json!({ "role": "assistant", "text": "x" })
        );
    }
}
