//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category used when a curator does not pick one.
pub const DEFAULT_CATEGORY: &str = "기타";

/// Where a document in the index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    /// Bulk-loaded reference material
    Seed,
    /// Reviewer approved an answer (possibly the generated draft)
    AdminApproved,
    /// Reviewer wrote the answer while rejecting
    AdminWritten,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::AdminApproved => "admin_approved",
            Self::AdminWritten => "admin_written",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "seed" => Some(Self::Seed),
            "admin_approved" => Some(Self::AdminApproved),
            "admin_written" => Some(Self::AdminWritten),
            _ => None,
        }
    }

    /// Curated documents carry a human-reviewed answer.
    pub fn is_curated(&self) -> bool {
        matches!(self, Self::AdminApproved | Self::AdminWritten)
    }

    pub const CURATED: [DocumentSource; 2] = [Self::AdminApproved, Self::AdminWritten];
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stored with every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: DocumentSource,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub timestamp: DateTime<Utc>,

    /// Open extension map for caller-defined keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl DocumentMetadata {
    /// Metadata stamped with the current time.
    ///
    /// A blank category becomes [`DEFAULT_CATEGORY`]; blank tags are dropped.
    pub fn new(source: DocumentSource, category: &str, tags: &[String]) -> Self {
        let category = category.trim();
        Self {
            source,
            category: if category.is_empty() {
                default_category()
            } else {
                category.to_string()
            },
            tags: tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            timestamp: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    pub fn is_curated(&self) -> bool {
        self.source.is_curated()
    }
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self::new(DocumentSource::Seed, DEFAULT_CATEGORY, &[])
    }
}

/// A stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// A nearest-neighbour result; smaller distance means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedHit {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub distance: f32,
}

/// Render a question/answer pair as document content.
pub fn qa_content(question: &str, answer: &str) -> String {
    format!("Q: {}\nA: {}", question.trim(), answer.trim())
}

/// A curated document split back into its question and answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedQa {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub metadata: DocumentMetadata,
}

impl CuratedQa {
    /// Parse `"Q: …\nA: …"` content. Content in any other shape becomes the
    /// question, cut to 200 characters, with an empty answer.
    pub fn from_document(doc: &Document) -> Self {
        let (question, answer) = split_qa(&doc.content).unwrap_or_else(|| {
            (
                doc.content.chars().take(200).collect::<String>(),
                String::new(),
            )
        });

        Self {
            id: doc.id.clone(),
            question,
            answer,
            metadata: doc.metadata.clone(),
        }
    }
}

fn split_qa(content: &str) -> Option<(String, String)> {
    let rest = content.strip_prefix("Q:")?;
    let (question, answer) = rest.split_once("\nA:")?;
    Some((question.trim().to_string(), answer.trim().to_string()))
}

/// Outcome of the confidence gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceStatus {
    #[serde(rename = "ANSWERABLE")]
    Answerable,
    #[serde(rename = "ESCALATE_TO_BOARD")]
    EscalateToBoard,
}

impl ConfidenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answerable => "ANSWERABLE",
            Self::EscalateToBoard => "ESCALATE_TO_BOARD",
        }
    }
}

impl fmt::Display for ConfidenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a conversation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Answered automatically; never reviewed
    #[serde(rename = "N/A")]
    NotApplicable,
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "REJECTED")]
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotApplicable => "N/A",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Initial state for a freshly gated question.
    pub fn initial_for(status: ConfidenceStatus) -> Self {
        match status {
            ConfidenceStatus::Answerable => Self::NotApplicable,
            ConfidenceStatus::EscalateToBoard => Self::Pending,
        }
    }

    /// No moderation transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asked question and everything that happened to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub question: String,
    pub answer: Option<String>,
    pub draft_answer: Option<String>,
    pub confidence_status: ConfidenceStatus,
    pub confidence_score: f32,
    pub top_distance: f32,
    #[serde(default)]
    pub retrieved: Vec<RetrievedHit>,
    pub approval_status: ApprovalStatus,
    pub asked_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// Whether the entry may be shown to the public.
    pub fn is_public(&self) -> bool {
        let has_answer = self
            .answer
            .as_deref()
            .map(|a| !a.trim().is_empty())
            .unwrap_or(false);

        has_answer
            && self.approval_status != ApprovalStatus::Pending
            && (self.confidence_status == ConfidenceStatus::Answerable
                || matches!(
                    self.approval_status,
                    ApprovalStatus::Approved | ApprovalStatus::Rejected | ApprovalStatus::NotApplicable
                ))
    }
}

/// Fields supplied when a question is first logged.
///
/// The approval status is derived from `confidence_status`.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub question: String,
    pub confidence_status: ConfidenceStatus,
    pub confidence_score: f32,
    pub top_distance: f32,
    pub draft_answer: Option<String>,
    pub retrieved: Vec<RetrievedHit>,
    pub asked_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        answer: Option<&str>,
        status: ConfidenceStatus,
        approval: ApprovalStatus,
    ) -> LogEntry {
        LogEntry {
            id: 1,
            question: "q".to_string(),
            answer: answer.map(str::to_string),
            draft_answer: None,
            confidence_status: status,
            confidence_score: 0.5,
            top_distance: 0.5,
            retrieved: Vec::new(),
            approval_status: approval,
            asked_at: Utc::now(),
            answered_at: None,
        }
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ApprovalStatus::NotApplicable).unwrap(),
            "\"N/A\""
        );
        assert_eq!(
            serde_json::to_string(&ConfidenceStatus::EscalateToBoard).unwrap(),
            "\"ESCALATE_TO_BOARD\""
        );
        assert_eq!(
            serde_json::to_string(&DocumentSource::AdminWritten).unwrap(),
            "\"admin_written\""
        );
    }

    #[test]
    fn test_initial_approval() {
        assert_eq!(
            ApprovalStatus::initial_for(ConfidenceStatus::Answerable),
            ApprovalStatus::NotApplicable
        );
        assert_eq!(
            ApprovalStatus::initial_for(ConfidenceStatus::EscalateToBoard),
            ApprovalStatus::Pending
        );
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_public_visibility() {
        use ApprovalStatus::*;
        use ConfidenceStatus::*;

        assert!(entry(Some("a"), Answerable, NotApplicable).is_public());
        assert!(entry(Some("a"), EscalateToBoard, Approved).is_public());
        assert!(entry(Some("a"), EscalateToBoard, Rejected).is_public());
        assert!(!entry(Some("a"), EscalateToBoard, Pending).is_public());
        assert!(!entry(None, EscalateToBoard, Rejected).is_public());
        assert!(!entry(Some("  "), Answerable, NotApplicable).is_public());
    }

    #[test]
    fn test_metadata_defaults() {
        let meta = DocumentMetadata::new(
            DocumentSource::AdminApproved,
            "  ",
            &["EPR".to_string(), " ".to_string()],
        );
        assert_eq!(meta.category, DEFAULT_CATEGORY);
        assert_eq!(meta.tags, vec!["EPR".to_string()]);
        assert!(meta.is_curated());
        assert!(!DocumentMetadata::default().is_curated());
    }

    #[test]
    fn test_curated_qa_parsing() {
        let doc = Document {
            id: "d1".to_string(),
            content: qa_content(" 폐패널 수거는? ", "지자체에 신청합니다."),
            metadata: DocumentMetadata::new(DocumentSource::AdminWritten, "수거", &[]),
            embedding: Vec::new(),
        };
        let qa = CuratedQa::from_document(&doc);
        assert_eq!(qa.question, "폐패널 수거는?");
        assert_eq!(qa.answer, "지자체에 신청합니다.");

        let free_text = Document {
            content: "x".repeat(300),
            ..doc
        };
        let qa = CuratedQa::from_document(&free_text);
        assert_eq!(qa.question.chars().count(), 200);
        assert!(qa.answer.is_empty());
    }
}
