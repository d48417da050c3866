//! Conversation log stored as a single JSON array file.
//!
//! Every operation holds one async mutex across read, modify and write, so
//! id assignment and moderation transitions are serialized. Writes go to a
//! sibling temp file that is then renamed over the log.

use crate::types::{ApprovalStatus, ConfidenceStatus, LogEntry, NewLogEntry};
use askboard_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Result of [`ConversationLog::resolve`].
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The entry moved out of PENDING; holds the updated entry
    Resolved(LogEntry),
    NotFound,
    /// The entry was not PENDING; holds its current status
    NotPending(ApprovalStatus),
}

/// Totals per approval status.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LogCounts {
    pub total: usize,
    pub answerable: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub struct ConversationLog {
    path: PathBuf,
    lock: Mutex<()>,
    #[cfg(test)]
    fail_next_write: std::sync::atomic::AtomicBool,
}

impl ConversationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            #[cfg(test)]
            fail_next_write: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make the next write fail with an I/O error, leaving the file as is.
    #[cfg(test)]
    pub(crate) fn fail_next_write(&self) {
        self.fail_next_write
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new entry and return its id (max existing id + 1, or 1).
    pub async fn insert(&self, new: NewLogEntry) -> AppResult<u64> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;

        let id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        entries.push(LogEntry {
            id,
            question: new.question,
            answer: None,
            draft_answer: new.draft_answer,
            confidence_status: new.confidence_status,
            confidence_score: new.confidence_score,
            top_distance: new.top_distance,
            retrieved: new.retrieved,
            approval_status: ApprovalStatus::initial_for(new.confidence_status),
            asked_at: new.asked_at,
            answered_at: new.answered_at,
        });

        self.write_entries(&entries).await?;
        tracing::debug!(log_id = id, "Logged question");
        Ok(id)
    }

    /// Returns `false` when no entry has this id.
    pub async fn set_draft(&self, id: u64, draft: &str) -> AppResult<bool> {
        self.mutate(id, |entry| entry.draft_answer = Some(draft.to_string()))
            .await
    }

    /// Returns `false` when no entry has this id.
    pub async fn update_answer(
        &self,
        id: u64,
        answer: &str,
        answered_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.mutate(id, |entry| {
            entry.answer = Some(answer.to_string());
            entry.answered_at = Some(answered_at);
        })
        .await
    }

    /// Returns `false` when no entry has this id.
    pub async fn set_approval(&self, id: u64, status: ApprovalStatus) -> AppResult<bool> {
        self.mutate(id, |entry| entry.approval_status = status).await
    }

    /// Move a PENDING entry to `status`, optionally writing an answer, in
    /// one critical section.
    pub async fn resolve(
        &self,
        id: u64,
        status: ApprovalStatus,
        answer: Option<&str>,
        answered_at: DateTime<Utc>,
    ) -> AppResult<Resolution> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;

        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return Ok(Resolution::NotFound);
        };

        if entry.approval_status != ApprovalStatus::Pending {
            return Ok(Resolution::NotPending(entry.approval_status));
        }

        if let Some(answer) = answer {
            entry.answer = Some(answer.to_string());
            entry.answered_at = Some(answered_at);
        }
        entry.approval_status = status;
        let updated = entry.clone();

        self.write_entries(&entries).await?;
        Ok(Resolution::Resolved(updated))
    }

    pub async fn get(&self, id: u64) -> AppResult<Option<LogEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read_entries()
            .await?
            .into_iter()
            .find(|e| e.id == id))
    }

    /// Newest `limit` entries.
    pub async fn recent(&self, limit: usize) -> AppResult<Vec<LogEntry>> {
        self.select(limit, |_| true).await
    }

    /// Newest `limit` entries awaiting review.
    pub async fn pending(&self, limit: usize) -> AppResult<Vec<LogEntry>> {
        self.select(limit, |e| e.approval_status == ApprovalStatus::Pending)
            .await
    }

    /// Newest `limit` entries fit for public display.
    pub async fn public(&self, limit: usize) -> AppResult<Vec<LogEntry>> {
        self.select(limit, LogEntry::is_public).await
    }

    pub async fn counts(&self) -> AppResult<LogCounts> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries().await?;

        let mut counts = LogCounts {
            total: entries.len(),
            ..Default::default()
        };
        for entry in &entries {
            if entry.confidence_status == ConfidenceStatus::Answerable {
                counts.answerable += 1;
            }
            match entry.approval_status {
                ApprovalStatus::Pending => counts.pending += 1,
                ApprovalStatus::Approved => counts.approved += 1,
                ApprovalStatus::Rejected => counts.rejected += 1,
                ApprovalStatus::NotApplicable => {}
            }
        }
        Ok(counts)
    }

    async fn select<F>(&self, limit: usize, keep: F) -> AppResult<Vec<LogEntry>>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let _guard = self.lock.lock().await;
        let mut entries: Vec<LogEntry> = self
            .read_entries()
            .await?
            .into_iter()
            .filter(|e| keep(e))
            .collect();

        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn mutate<F>(&self, id: u64, apply: F) -> AppResult<bool>
    where
        F: FnOnce(&mut LogEntry),
    {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;

        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            tracing::debug!(log_id = id, "No log entry to update");
            return Ok(false);
        };
        apply(entry);

        self.write_entries(&entries).await?;
        Ok(true)
    }

    async fn read_entries(&self) -> AppResult<Vec<LogEntry>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            AppError::Knowledge(format!(
                "Conversation log {} is not a valid JSON array of entries: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn write_entries(&self, entries: &[LogEntry]) -> AppResult<()> {
        #[cfg(test)]
        if self
            .fail_next_write
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(std::io::Error::other("injected write failure").into());
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
