//! Confidence gate: decide whether retrieved context is good enough to
//! answer automatically.

use crate::types::{ConfidenceStatus, RetrievedHit};
use askboard_core::GateSettings;
use serde::Serialize;

/// Distance reported when nothing was retrieved.
pub const EMPTY_TOP_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateDecision {
    pub status: ConfidenceStatus,
    pub confidence_score: f32,
    pub top_distance: f32,
    pub domain_ok: bool,
}

/// Apply the gate to a ranked retrieval result.
///
/// Answerable iff something was retrieved, the top distance is within
/// `max_distance`, the derived confidence reaches `min_confidence`, and an
/// allow-listed keyword appears in the question or any retrieved content.
pub fn decide(question: &str, retrieved: &[RetrievedHit], settings: &GateSettings) -> GateDecision {
    let domain_ok = domain_check(question, retrieved, &settings.allowed_keywords);

    let Some(top) = retrieved.first() else {
        return GateDecision {
            status: ConfidenceStatus::EscalateToBoard,
            confidence_score: 0.0,
            top_distance: EMPTY_TOP_DISTANCE,
            domain_ok,
        };
    };

    let top_distance = top.distance.max(0.0);
    let confidence_score = confidence_from_distance(top_distance);

    let answerable = top_distance <= settings.max_distance
        && confidence_score >= settings.min_confidence
        && domain_ok;

    GateDecision {
        status: if answerable {
            ConfidenceStatus::Answerable
        } else {
            ConfidenceStatus::EscalateToBoard
        },
        confidence_score,
        top_distance,
        domain_ok,
    }
}

/// `1 - distance`, clamped to `[0, 1]`.
pub fn confidence_from_distance(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Whether any keyword occurs (case-insensitively) in the question or the
/// retrieved contents.
pub fn domain_check(question: &str, retrieved: &[RetrievedHit], keywords: &[String]) -> bool {
    let haystack = std::iter::once(question)
        .chain(retrieved.iter().map(|hit| hit.content.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| haystack.contains(&k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;

    fn hit(content: &str, distance: f32) -> RetrievedHit {
        RetrievedHit {
            content: content.to_string(),
            metadata: DocumentMetadata::default(),
            distance,
        }
    }

    fn settings() -> GateSettings {
        GateSettings::default()
    }

    #[test]
    fn test_empty_retrieval_escalates() {
        let decision = decide("태양광 패널 수명은?", &[], &settings());
        assert_eq!(decision.status, ConfidenceStatus::EscalateToBoard);
        assert_eq!(decision.confidence_score, 0.0);
        assert_eq!(decision.top_distance, 1.0);
        assert!(decision.domain_ok);
    }

    #[test]
    fn test_close_domain_hit_is_answerable() {
        let retrieved = vec![hit("Q: 패널 청소 주기\nA: 분기별", 0.40), hit("other", 0.7)];
        let decision = decide("패널 청소는 얼마나 자주 하나요?", &retrieved, &settings());

        assert_eq!(decision.status, ConfidenceStatus::Answerable);
        assert!((decision.confidence_score - 0.60).abs() < 1e-6);
        assert!((decision.top_distance - 0.40).abs() < 1e-6);
    }

    #[test]
    fn test_off_domain_escalates_even_when_close() {
        let retrieved = vec![hit("Q: 점심 메뉴\nA: 김밥", 0.05)];
        let decision = decide("오늘 점심 뭐 먹지?", &retrieved, &settings());

        assert!(!decision.domain_ok);
        assert_eq!(decision.status, ConfidenceStatus::EscalateToBoard);
    }

    #[test]
    fn test_keyword_in_context_is_enough() {
        let retrieved = vec![hit("Q: 인버터 고장\nA: 교체", 0.2)];
        let decision = decide("이거 고장났어요", &retrieved, &settings());
        assert!(decision.domain_ok);
        assert_eq!(decision.status, ConfidenceStatus::Answerable);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let decision = decide("epr 보고서 제출 기한", &[hit("x", 0.1)], &settings());
        assert!(decision.domain_ok);
    }

    #[test]
    fn test_distance_threshold_boundary() {
        let at_limit = decide("패널", &[hit("x", 0.65)], &settings());
        assert_eq!(at_limit.status, ConfidenceStatus::Answerable);

        let beyond = decide("패널", &[hit("x", 0.66)], &settings());
        assert_eq!(beyond.status, ConfidenceStatus::EscalateToBoard);
    }

    #[test]
    fn test_min_confidence_applies_independently() {
        let strict = GateSettings {
            max_distance: 0.9,
            min_confidence: 0.5,
            ..settings()
        };
        let decision = decide("패널", &[hit("x", 0.6)], &strict);
        assert_eq!(decision.status, ConfidenceStatus::EscalateToBoard);
    }

    #[test]
    fn test_score_clamped() {
        assert_eq!(confidence_from_distance(1.7), 0.0);
        assert_eq!(confidence_from_distance(0.0), 1.0);
        let far = decide("패널", &[hit("x", 1.7)], &settings());
        assert_eq!(far.confidence_score, 0.0);
    }

    #[test]
    fn test_monotonic_in_distance() {
        // Once a distance escalates, every larger distance escalates too
        let mut seen_escalation = false;
        for step in 0..=40 {
            let distance = step as f32 * 0.05;
            let decision = decide("패널", &[hit("x", distance)], &settings());
            if decision.status == ConfidenceStatus::EscalateToBoard {
                seen_escalation = true;
            } else {
                assert!(!seen_escalation, "answerable again at distance {}", distance);
            }
        }
        assert!(seen_escalation);
    }

    #[test]
    fn test_monotonic_in_thresholds() {
        let retrieved = vec![hit("패널", 0.5)];
        let loose = GateSettings {
            max_distance: 0.6,
            ..settings()
        };
        let tight = GateSettings {
            max_distance: 0.4,
            ..settings()
        };
        assert_eq!(
            decide("q", &retrieved, &loose).status,
            ConfidenceStatus::Answerable
        );
        assert_eq!(
            decide("q", &retrieved, &tight).status,
            ConfidenceStatus::EscalateToBoard
        );
    }
}
