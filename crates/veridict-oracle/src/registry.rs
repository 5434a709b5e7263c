use crate::error::{OracleError, Result};
use crate::types::Question;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use veridict_stake::{AccountAddress, Amount};

/// Owns question records, per-question observers, and the monotonic id
/// counter. Ids are assigned arena-style and never reused; a failed open
/// assigns none, so every id below the counter resolves to a record.
pub struct QuestionRegistry {
    questions: Arc<RwLock<HashMap<u64, Question>>>,
    observers: Arc<RwLock<HashMap<u64, AccountAddress>>>,
    next_id: Arc<RwLock<u64>>,
}

impl QuestionRegistry {
    pub fn new() -> Self {
        Self {
            questions: Arc::new(RwLock::new(HashMap::new())),
            observers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Insert a fully validated question under the next id.
    pub async fn create(&self, question: Question) -> u64 {
        let mut next_id = self.next_id.write().await;
        let question_id = *next_id;
        *next_id += 1;

        let asker = question.asker;
        let bounty = question.bounty;
        let deadline = question.deadline();
        self.questions.write().await.insert(question_id, question);

        info!(
            question_id,
            asker = %asker,
            bounty = bounty.to_tokens(),
            deadline,
            "📋 Question opened"
        );
        question_id
    }

    pub async fn get(&self, question_id: u64) -> Option<Question> {
        let questions = self.questions.read().await;
        questions.get(&question_id).cloned()
    }

    pub async fn next_question_id(&self) -> u64 {
        *self.next_id.read().await
    }

    /// Restrict who may answer. Only the asker may assign, and only while
    /// the answer window has not opened.
    pub async fn set_observer(
        &self,
        question_id: u64,
        observer: AccountAddress,
        caller: AccountAddress,
        now: i64,
    ) -> Result<()> {
        {
            let questions = self.questions.read().await;
            let question = questions
                .get(&question_id)
                .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

            if caller != question.asker {
                return Err(OracleError::NotAuthorized(question_id));
            }
            if now >= question.opening_time {
                return Err(OracleError::ObserverNotAssignable(question_id));
            }
        }

        self.observers.write().await.insert(question_id, observer);
        info!(question_id, observer = %observer, "👁️ Observer assigned");
        Ok(())
    }

    pub async fn observer(&self, question_id: u64) -> Option<AccountAddress> {
        let observers = self.observers.read().await;
        observers.get(&question_id).copied()
    }

    /// Push the deadline out; the last-call rule.
    pub async fn extend_expiry(&self, question_id: u64, extra_secs: i64) -> Result<()> {
        let mut questions = self.questions.write().await;
        let question = questions
            .get_mut(&question_id)
            .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

        question.expiry_secs += extra_secs;
        debug!(
            question_id,
            extra_secs,
            new_deadline = question.deadline(),
            "⏱️ Answer window extended"
        );
        Ok(())
    }

    pub async fn raise_min_bond(&self, question_id: u64, new_min: Amount) -> Result<()> {
        let mut questions = self.questions.write().await;
        let question = questions
            .get_mut(&question_id)
            .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

        question.min_bond = new_min;
        debug!(question_id, min_bond = new_min.to_tokens(), "Minimum bond raised");
        Ok(())
    }

    /// Zero the bounty and return what was escrowed. Payout paths draw
    /// from the returned value, never from the record, so a second claim
    /// observes zero.
    pub async fn take_bounty(&self, question_id: u64) -> Result<Amount> {
        let mut questions = self.questions.write().await;
        let question = questions
            .get_mut(&question_id)
            .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

        let amount = question.bounty;
        question.bounty = Amount::ZERO;
        Ok(amount)
    }

    /// Put a taken bounty back; compensation for a failed payout transfer.
    pub async fn restore_bounty(&self, question_id: u64, amount: Amount) -> Result<()> {
        let mut questions = self.questions.write().await;
        let question = questions
            .get_mut(&question_id)
            .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

        question.bounty = amount;
        Ok(())
    }

    pub async fn accumulate_bounty(&self, question_id: u64, amount: Amount) -> Result<Amount> {
        let mut questions = self.questions.write().await;
        let question = questions
            .get_mut(&question_id)
            .ok_or(OracleError::QuestionDoesNotExist(question_id))?;

        let total = question
            .bounty
            .checked_add(amount)
            .ok_or(OracleError::AmountOverflow(question_id))?;
        question.bounty = total;

        info!(
            question_id,
            added = amount.to_tokens(),
            bounty = total.to_tokens(),
            "💰 Bounty increased"
        );
        Ok(total)
    }
}

impl Default for QuestionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentId, StakeSource};

    fn sample_question(asker: AccountAddress, opening_time: i64) -> Question {
        Question {
            asker,
            content: ContentId::new(b"sample"),
            opening_time,
            expiry_secs: 3_600,
            bounty: Amount::from_tokens(5.0),
            min_bond: Amount::from_tokens(1.0),
            stake_source: StakeSource::Native,
            created_at: opening_time - 100,
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let registry = QuestionRegistry::new();
        let asker = AccountAddress::from_bytes([1; 32]);

        assert_eq!(registry.next_question_id().await, 0);
        let a = registry.create(sample_question(asker, 1_000)).await;
        let b = registry.create(sample_question(asker, 2_000)).await;

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(registry.next_question_id().await, 2);
        assert!(registry.get(0).await.is_some());
        assert!(registry.get(2).await.is_none());
    }

    #[tokio::test]
    async fn test_observer_rules() {
        let registry = QuestionRegistry::new();
        let asker = AccountAddress::from_bytes([1; 32]);
        let observer = AccountAddress::from_bytes([2; 32]);
        let stranger = AccountAddress::from_bytes([3; 32]);

        let id = registry.create(sample_question(asker, 1_000)).await;

        assert!(matches!(
            registry.set_observer(id, observer, stranger, 500).await,
            Err(OracleError::NotAuthorized(_))
        ));

        // Opening time reached, too late to assign
        assert!(matches!(
            registry.set_observer(id, observer, asker, 1_000).await,
            Err(OracleError::ObserverNotAssignable(_))
        ));

        registry.set_observer(id, observer, asker, 999).await.unwrap();
        assert_eq!(registry.observer(id).await, Some(observer));

        assert!(matches!(
            registry.set_observer(99, observer, asker, 500).await,
            Err(OracleError::QuestionDoesNotExist(99))
        ));
    }

    #[tokio::test]
    async fn test_bounty_take_and_restore() {
        let registry = QuestionRegistry::new();
        let asker = AccountAddress::from_bytes([1; 32]);
        let id = registry.create(sample_question(asker, 1_000)).await;

        let taken = registry.take_bounty(id).await.unwrap();
        assert_eq!(taken, Amount::from_tokens(5.0));
        assert_eq!(registry.take_bounty(id).await.unwrap(), Amount::ZERO);

        registry.restore_bounty(id, taken).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().bounty, taken);
    }

    #[tokio::test]
    async fn test_extension_moves_deadline() {
        let registry = QuestionRegistry::new();
        let asker = AccountAddress::from_bytes([1; 32]);
        let id = registry.create(sample_question(asker, 1_000)).await;

        registry.extend_expiry(id, 300).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().deadline(), 1_000 + 3_600 + 300);
    }
}
