//! Reviewer decisions on escalated questions and curation of the results.
//!
//! A document is added to the index only when a person wrote or accepted an
//! answer. The log update comes first and stays authoritative if curation
//! fails afterwards.

use crate::conversation::{ConversationLog, Resolution};
use crate::retrieval::Retriever;
use crate::types::{qa_content, ApprovalStatus, DocumentMetadata, DocumentSource, LogEntry};
use askboard_core::{AppError, AppResult};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<bool>,

    pub log_id: u64,

    /// Whether a document was added to the index
    pub curated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl ModerationOutcome {
    fn approved(log_id: u64, document_id: Option<String>) -> Self {
        Self {
            approved: Some(true),
            rejected: None,
            log_id,
            curated: document_id.is_some(),
            document_id,
        }
    }

    fn rejected(log_id: u64, document_id: Option<String>) -> Self {
        Self {
            approved: None,
            rejected: Some(true),
            log_id,
            curated: document_id.is_some(),
            document_id,
        }
    }
}

pub struct Moderator {
    log: Arc<ConversationLog>,
    retriever: Retriever,
}

impl Moderator {
    pub fn new(log: Arc<ConversationLog>, retriever: Retriever) -> Self {
        Self { log, retriever }
    }

    /// Approve a pending entry with `answer`, or with its draft when no
    /// answer is given, and curate the result.
    pub async fn approve(
        &self,
        log_id: u64,
        answer: Option<&str>,
        category: &str,
        tags: &[String],
    ) -> AppResult<ModerationOutcome> {
        let entry = self.pending_entry(log_id).await?;

        let final_answer = non_blank(answer)
            .or_else(|| non_blank(entry.draft_answer.as_deref()))
            .ok_or(AppError::NothingToApprove(log_id))?
            .to_string();

        let entry = self
            .resolve(log_id, ApprovalStatus::Approved, Some(&final_answer))
            .await?;
        tracing::info!(log_id, "Approved escalated question");

        let document_id = self
            .curate(&entry.question, &final_answer, DocumentSource::AdminApproved, category, tags)
            .await;

        Ok(ModerationOutcome::approved(log_id, document_id))
    }

    /// Reject a pending entry. A non-blank `answer` replaces the log answer
    /// and is curated; without one the entry keeps its current answer.
    pub async fn reject(
        &self,
        log_id: u64,
        answer: Option<&str>,
        category: &str,
        tags: &[String],
    ) -> AppResult<ModerationOutcome> {
        self.pending_entry(log_id).await?;

        let written = non_blank(answer).map(str::to_string);
        let entry = self
            .resolve(log_id, ApprovalStatus::Rejected, written.as_deref())
            .await?;
        tracing::info!(log_id, with_answer = written.is_some(), "Rejected escalated question");

        let document_id = match written {
            Some(ref text) => {
                self.curate(&entry.question, text, DocumentSource::AdminWritten, category, tags)
                    .await
            }
            None => None,
        };

        Ok(ModerationOutcome::rejected(log_id, document_id))
    }

    /// Curate a question/answer pair that never went through the log.
    pub async fn add_feedback(
        &self,
        question: &str,
        answer: &str,
        category: &str,
        source: DocumentSource,
        tags: &[String],
    ) -> AppResult<String> {
        let (question, answer) = (question.trim(), answer.trim());
        if question.is_empty() || answer.is_empty() {
            return Err(AppError::Validation(
                "feedback needs both a question and an answer".to_string(),
            ));
        }

        let ids = self
            .retriever
            .add_documents(
                vec![qa_content(question, answer)],
                Some(vec![DocumentMetadata::new(source, category, tags)]),
                None,
            )
            .await?;

        ids.into_iter()
            .next()
            .ok_or_else(|| AppError::Knowledge("index returned no id".to_string()))
    }

    async fn pending_entry(&self, log_id: u64) -> AppResult<LogEntry> {
        let entry = self
            .log
            .get(log_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("log entry {}", log_id)))?;

        if entry.approval_status != ApprovalStatus::Pending {
            return Err(invalid_transition(log_id, entry.approval_status));
        }
        Ok(entry)
    }

    async fn resolve(
        &self,
        log_id: u64,
        status: ApprovalStatus,
        answer: Option<&str>,
    ) -> AppResult<LogEntry> {
        match self.log.resolve(log_id, status, answer, Utc::now()).await? {
            Resolution::Resolved(entry) => Ok(entry),
            Resolution::NotFound => Err(AppError::NotFound(format!("log entry {}", log_id))),
            Resolution::NotPending(current) => Err(invalid_transition(log_id, current)),
        }
    }

    async fn curate(
        &self,
        question: &str,
        answer: &str,
        source: DocumentSource,
        category: &str,
        tags: &[String],
    ) -> Option<String> {
        match self.add_feedback(question, answer, category, source, tags).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(%source, error = %e, "Log updated but curation failed");
                None
            }
        }
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn invalid_transition(log_id: u64, current: ApprovalStatus) -> AppError {
    AppError::InvalidTransition(format!(
        "log entry {} is {}, only PENDING entries can be moderated",
        log_id, current
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingChain;
    use crate::sqlite_index::SqliteIndex;
    use crate::types::{ConfidenceStatus, NewLogEntry};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        log: Arc<ConversationLog>,
        retriever: Retriever,
        moderator: Moderator,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(ConversationLog::new(dir.path().join("logs.json")));
        let retriever = Retriever::new(
            Arc::new(EmbeddingChain::keyword_only(32, &["패널".to_string()])),
            Arc::new(SqliteIndex::open_in_memory(32).unwrap()),
            Duration::from_secs(5),
        );
        let moderator = Moderator::new(Arc::clone(&log), retriever.clone());
        Fixture {
            _dir: dir,
            log,
            retriever,
            moderator,
        }
    }

    async fn escalate(log: &ConversationLog, draft: Option<&str>) -> u64 {
        log.insert(NewLogEntry {
            question: "폐패널 보관 기간은?".to_string(),
            confidence_status: ConfidenceStatus::EscalateToBoard,
            confidence_score: 0.0,
            top_distance: 1.0,
            draft_answer: draft.map(str::to_string),
            retrieved: Vec::new(),
            asked_at: Utc::now(),
            answered_at: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_approve_with_override_curates_once() {
        let f = fixture();
        let id = escalate(&f.log, Some("초안")).await;

        let outcome = f
            .moderator
            .approve(id, Some("최대 1년입니다."), "보관", &["EPR".to_string()])
            .await
            .unwrap();

        assert_eq!(outcome.approved, Some(true));
        assert!(outcome.curated);

        let entry = f.log.get(id).await.unwrap().unwrap();
        assert_eq!(entry.approval_status, ApprovalStatus::Approved);
        assert_eq!(entry.answer.as_deref(), Some("최대 1년입니다."));
        assert!(entry.answered_at.is_some());

        let curated = f.retriever.list_curated(10).await.unwrap();
        assert_eq!(curated.len(), 1);
        assert_eq!(curated[0].content, "Q: 폐패널 보관 기간은?\nA: 최대 1년입니다.");
        assert_eq!(curated[0].metadata.source, DocumentSource::AdminApproved);
        assert_eq!(curated[0].metadata.category, "보관");
        assert_eq!(curated[0].metadata.tags, vec!["EPR".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_approve_accepts_draft() {
        let f = fixture();
        let id = escalate(&f.log, Some("초안 답변")).await;

        f.moderator.approve(id, Some("  "), "", &[]).await.unwrap();

        let entry = f.log.get(id).await.unwrap().unwrap();
        assert_eq!(entry.answer.as_deref(), Some("초안 답변"));
        assert_eq!(f.retriever.count_curated().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_approve_errors() {
        let f = fixture();
        let bare = escalate(&f.log, None).await;

        assert!(matches!(
            f.moderator.approve(99, Some("x"), "", &[]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.moderator.approve(bare, None, "", &[]).await,
            Err(AppError::NothingToApprove(id)) if id == bare
        ));
        assert_eq!(
            f.log.get(bare).await.unwrap().unwrap().approval_status,
            ApprovalStatus::Pending
        );

        f.moderator.approve(bare, Some("답"), "", &[]).await.unwrap();
        assert!(matches!(
            f.moderator.approve(bare, Some("다시"), "", &[]).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            f.moderator.reject(bare, None, "", &[]).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert_eq!(f.retriever.count_curated().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reject_without_answer_curates_nothing() {
        let f = fixture();
        let id = escalate(&f.log, Some("초안")).await;

        let outcome = f.moderator.reject(id, None, "", &[]).await.unwrap();
        assert_eq!(outcome.rejected, Some(true));
        assert!(!outcome.curated);

        let entry = f.log.get(id).await.unwrap().unwrap();
        assert_eq!(entry.approval_status, ApprovalStatus::Rejected);
        assert!(entry.answer.is_none());
        assert_eq!(f.retriever.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reject_with_answer_curates_admin_written() {
        let f = fixture();
        let id = escalate(&f.log, None).await;

        let outcome = f
            .moderator
            .reject(id, Some("직접 작성한 답변"), "수거", &[])
            .await
            .unwrap();
        assert!(outcome.curated);

        let curated = f.retriever.list_curated(10).await.unwrap();
        assert_eq!(curated.len(), 1);
        assert_eq!(curated[0].metadata.source, DocumentSource::AdminWritten);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_feedback_requires_both_parts() {
        let f = fixture();
        assert!(matches!(
            f.moderator
                .add_feedback("q", " ", "", DocumentSource::AdminWritten, &[])
                .await,
            Err(AppError::Validation(_))
        ));

        let id = f
            .moderator
            .add_feedback("패널 세척제?", "중성 세제", "", DocumentSource::AdminWritten, &[])
            .await
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(f.retriever.count_curated().await.unwrap(), 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ModerationOutcome::approved(3, None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["approved"], true);
        assert_eq!(json["log_id"], 3);
        assert_eq!(json["curated"], false);
        assert!(json.get("rejected").is_none());
    }
}
