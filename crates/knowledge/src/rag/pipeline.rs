//! Question answering pipeline: retrieve, gate, log, then answer or escalate.

use crate::conversation::ConversationLog;
use crate::gate;
use crate::rag::answer::{AnswerGenerator, AnswerMode};
use crate::rag::types::{AskResponse, ESCALATION_MESSAGE, SYSTEM_ERROR_LOG_ANSWER};
use crate::retrieval::Retriever;
use crate::types::{ConfidenceStatus, NewLogEntry};
use askboard_core::{AppError, AppResult, GateSettings};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct QaPipeline {
    retriever: Retriever,
    generator: Arc<AnswerGenerator>,
    log: Arc<ConversationLog>,
    gate: GateSettings,
}

impl QaPipeline {
    pub fn new(
        retriever: Retriever,
        generator: Arc<AnswerGenerator>,
        log: Arc<ConversationLog>,
        gate: GateSettings,
    ) -> Self {
        Self {
            retriever,
            generator,
            log,
            gate,
        }
    }

    /// Answer a question or escalate it to the board.
    ///
    /// Only a blank question is an error. Any later failure still yields a
    /// well-formed escalated response, and an already logged question is
    /// marked for manual review.
    pub async fn ask(&self, question: &str) -> AppResult<AskResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("question is empty".to_string()));
        }

        let asked_at = Utc::now();
        let mut log_id = None;

        match self.answer(question, asked_at, &mut log_id).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!(error = %e, ?log_id, "Answering failed");

                if let Some(id) = log_id {
                    if let Err(log_err) = self
                        .log
                        .update_answer(id, SYSTEM_ERROR_LOG_ANSWER, Utc::now())
                        .await
                    {
                        tracing::error!(log_id = id, error = %log_err, "Could not record system error");
                    }
                }

                Ok(AskResponse::system_error(asked_at, log_id))
            }
        }
    }

    async fn answer(
        &self,
        question: &str,
        asked_at: DateTime<Utc>,
        log_id: &mut Option<u64>,
    ) -> AppResult<AskResponse> {
        let retrieved = self.retriever.retrieve(question, self.gate.top_k).await?;
        let decision = gate::decide(question, &retrieved, &self.gate);

        tracing::info!(
            status = %decision.status,
            score = decision.confidence_score,
            top_distance = decision.top_distance,
            domain_ok = decision.domain_ok,
            "Gate decision"
        );

        let id = self
            .log
            .insert(NewLogEntry {
                question: question.to_string(),
                confidence_status: decision.status,
                confidence_score: decision.confidence_score,
                top_distance: decision.top_distance,
                draft_answer: None,
                retrieved: retrieved.clone(),
                asked_at,
                answered_at: None,
            })
            .await?;
        *log_id = Some(id);

        let answer = match decision.status {
            ConfidenceStatus::Answerable => {
                let answer = self
                    .generator
                    .generate(question, &retrieved, AnswerMode::Final)
                    .await
                    .unwrap_or_default();
                self.log.update_answer(id, &answer, Utc::now()).await?;
                answer
            }
            ConfidenceStatus::EscalateToBoard => {
                match self
                    .generator
                    .generate(question, &retrieved, AnswerMode::Draft)
                    .await
                {
                    Some(draft) => {
                        self.log.set_draft(id, &draft).await?;
                    }
                    None => tracing::debug!(log_id = id, "No draft generated"),
                }
                ESCALATION_MESSAGE.to_string()
            }
        };

        Ok(AskResponse {
            answer,
            confidence_status: decision.status,
            confidence_score: decision.confidence_score,
            top_distance: decision.top_distance,
            retrieved,
            asked_at,
            answered_at: Utc::now(),
            log_id: Some(id),
        })
    }
}
