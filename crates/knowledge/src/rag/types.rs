//! Ask response types.

use crate::types::{ConfidenceStatus, RetrievedHit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message shown to the asker when a question goes to the board.
pub const ESCALATION_MESSAGE: &str = "관련 문서가 부족하거나 도메인과 무관하여 게시판 이관이 필요합니다. 관리자 답변 후 지식베이스에 반영됩니다.";

/// Message shown to the asker when answering failed internally.
pub const SYSTEM_ERROR_MESSAGE: &str = "(시스템 오류) 잠시 후 다시 시도해주세요.";

/// Answer recorded in the log when answering failed internally.
pub const SYSTEM_ERROR_LOG_ANSWER: &str = "(시스템 오류) 관리자 확인 필요";

/// Result of asking a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// Generated answer, or a notice that the question was escalated
    pub answer: String,

    pub confidence_status: ConfidenceStatus,

    pub confidence_score: f32,

    pub top_distance: f32,

    /// Context the decision was based on
    pub retrieved: Vec<RetrievedHit>,

    pub asked_at: DateTime<Utc>,

    pub answered_at: DateTime<Utc>,

    /// Conversation log id; absent if the question never reached the log
    pub log_id: Option<u64>,
}

impl AskResponse {
    pub fn is_escalated(&self) -> bool {
        self.confidence_status == ConfidenceStatus::EscalateToBoard
    }

    /// Response for an internal failure.
    pub fn system_error(asked_at: DateTime<Utc>, log_id: Option<u64>) -> Self {
        Self {
            answer: SYSTEM_ERROR_MESSAGE.to_string(),
            confidence_status: ConfidenceStatus::EscalateToBoard,
            confidence_score: 0.0,
            top_distance: 1.0,
            retrieved: Vec::new(),
            asked_at,
            answered_at: Utc::now(),
            log_id,
        }
    }
}
