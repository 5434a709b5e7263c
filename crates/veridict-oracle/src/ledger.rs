use crate::error::{OracleError, Result};
use crate::history::Fingerprint;
use crate::types::{Answer, ContentId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use veridict_stake::AccountAddress;

/// Holds the current leading answer per question plus the rolling
/// commitment over every submission ever accepted. Submissions overwrite
/// the leader but nothing ever leaves the chain.
pub struct AnswerLedger {
    answers: Arc<RwLock<HashMap<u64, Answer>>>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self {
            answers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create the empty record when a question is opened.
    pub async fn init(&self, question_id: u64) {
        self.answers.write().await.insert(question_id, Answer::empty());
    }

    pub async fn get(&self, question_id: u64) -> Option<Answer> {
        let answers = self.answers.read().await;
        answers.get(&question_id).cloned()
    }

    /// Overwrite the leading answer and fold the submission's fingerprint
    /// into the commitment.
    pub async fn record_submission(
        &self,
        question_id: u64,
        response: ContentId,
        responder: AccountAddress,
        fingerprint: Fingerprint,
    ) -> Result<()> {
        let mut answers = self.answers.write().await;
        let answer = answers
            .get_mut(&question_id)
            .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

        answer.response = response;
        answer.responder = responder;
        answer.history_hash = answer.history_hash.fold(&fingerprint);

        info!(
            question_id,
            responder = %responder,
            response = %response,
            history_hash = %answer.history_hash,
            "📝 Answer recorded"
        );
        Ok(())
    }

    /// One-way transition: open → finalized. Never unset.
    pub async fn mark_finalized(&self, question_id: u64, now: i64) -> Result<()> {
        let mut answers = self.answers.write().await;
        let answer = answers
            .get_mut(&question_id)
            .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

        if answer.is_finalized() {
            return Err(OracleError::AnswerAlreadyFinalized(question_id));
        }
        answer.finalized_at = now;

        info!(
            question_id,
            finalized_at = now,
            responder = %answer.responder,
            "🏁 Answer finalized"
        );
        Ok(())
    }
}

impl Default for AnswerLedger {
    fn default() -> Self {
        Self::new()
    }
}
