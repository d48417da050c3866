//! Board post summaries of a conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a summary body, in characters.
pub const SUMMARY_MAX_CHARS: usize = 400;

/// Title used when the reply has no `제목:` line.
pub const DEFAULT_SUMMARY_TITLE: &str = "요약";

pub const FALLBACK_SUMMARY_TITLE: &str = "요약(LLM 미연결)";
pub const FALLBACK_SUMMARY_BODY: &str = "LLM 연결 시 요약 고도화가 활성화됩니다.";

const TITLE_MARKER: &str = "제목:";
const BODY_MARKER: &str = "본문:";

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Speaker, e.g. `user` or `assistant`
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl BoardSummary {
    pub fn fallback(created_at: DateTime<Utc>) -> Self {
        Self {
            title: FALLBACK_SUMMARY_TITLE.to_string(),
            body: FALLBACK_SUMMARY_BODY.to_string(),
            created_at,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.title == FALLBACK_SUMMARY_TITLE
    }
}

/// `role: content` lines, skipping blank messages.
pub fn format_conversation(conversation: &[ConversationTurn]) -> String {
    conversation
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .map(|turn| format!("{}: {}", turn.role.trim(), turn.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a `제목: ... 본문: ...` reply into a summary.
///
/// A reply without a title marker becomes the body under
/// [`DEFAULT_SUMMARY_TITLE`]. Returns `None` when no body text remains.
pub fn parse_summary(reply: &str) -> Option<BoardSummary> {
    let reply = reply.trim();

    let (title, body) = match reply.split_once(TITLE_MARKER) {
        Some((_, rest)) => match rest.split_once(BODY_MARKER) {
            Some((title, body)) => (first_line(title), body.trim()),
            None => (first_line(rest), ""),
        },
        None => (String::new(), reply),
    };

    if body.is_empty() {
        return None;
    }

    let title = if title.is_empty() {
        DEFAULT_SUMMARY_TITLE.to_string()
    } else {
        title
    };

    Some(BoardSummary {
        title,
        body: body.chars().take(SUMMARY_MAX_CHARS).collect(),
        created_at: Utc::now(),
    })
}

fn first_line(text: &str) -> String {
    text.trim().lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_conversation_skips_blank_messages() {
        let conversation = vec![
            ConversationTurn::new("user", " 패널이 깨졌어요 "),
            ConversationTurn::new("assistant", "  "),
            ConversationTurn::new("assistant", "사진을 올려주세요."),
        ];
        assert_eq!(
            format_conversation(&conversation),
            "user: 패널이 깨졌어요\nassistant: 사진을 올려주세요."
        );
        assert!(format_conversation(&[]).is_empty());
    }

    #[test]
    fn test_parse_title_and_body() {
        let summary = parse_summary("제목: 파손 패널 처리 문의\n본문: 우박으로 파손된 패널의 수거 절차 문의.").unwrap();
        assert_eq!(summary.title, "파손 패널 처리 문의");
        assert_eq!(summary.body, "우박으로 파손된 패널의 수거 절차 문의.");
        assert!(!summary.is_fallback());
    }

    #[test]
    fn test_parse_without_markers_keeps_text_as_body() {
        let summary = parse_summary("수거 일정 문의입니다.").unwrap();
        assert_eq!(summary.title, DEFAULT_SUMMARY_TITLE);
        assert_eq!(summary.body, "수거 일정 문의입니다.");
    }

    #[test]
    fn test_parse_without_body_is_rejected() {
        assert!(parse_summary("제목: 제목만 있음").is_none());
        assert!(parse_summary("제목: 빈 본문\n본문:   ").is_none());
        assert!(parse_summary("   ").is_none());
    }

    #[test]
    fn test_body_is_capped() {
        let reply = format!("제목: 긴 글\n본문: {}", "가".repeat(600));
        let summary = parse_summary(&reply).unwrap();
        assert_eq!(summary.body.chars().count(), SUMMARY_MAX_CHARS);
    }

    #[test]
    fn test_title_keeps_first_line_only() {
        let summary = parse_summary("제목: 첫 줄\n둘째 줄\n본문: 내용").unwrap();
        assert_eq!(summary.title, "첫 줄");
    }
}
