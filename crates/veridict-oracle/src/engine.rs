use crate::bonds::BondStore;
use crate::error::{OracleError, Result};
use crate::history::{verify_history, Fingerprint};
use crate::ledger::AnswerLedger;
use crate::registry::QuestionRegistry;
use crate::types::{Answer, ContentId, OracleConfig, Question, QuestionParams, StakeSource};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use veridict_stake::{AccountAddress, Amount, BalanceBook, NativeVault, StakeVault};

/// Central coordinator for the oracle. Owns the question registry, answer
/// ledger, and bond store, and routes all value movement through the stake
/// vaults. Every mutating operation runs under a single guard so state
/// transitions execute atomically in one global order; reads do not take
/// the guard.
pub struct OracleEngine {
    config: OracleConfig,
    registry: Arc<QuestionRegistry>,
    ledger: Arc<AnswerLedger>,
    bonds: Arc<BondStore>,
    native: Arc<NativeVault>,
    assets: Arc<RwLock<HashMap<AccountAddress, Arc<dyn StakeVault>>>>,
    op_guard: Mutex<()>,
}

impl OracleEngine {
    pub fn new(config: OracleConfig, book: Arc<BalanceBook>) -> Self {
        Self {
            config,
            registry: Arc::new(QuestionRegistry::new()),
            ledger: Arc::new(AnswerLedger::new()),
            bonds: Arc::new(BondStore::new()),
            native: Arc::new(NativeVault::new(book)),
            assets: Arc::new(RwLock::new(HashMap::new())),
            op_guard: Mutex::new(()),
        }
    }

    /// Install a bonded-asset vault so questions may reference it as their
    /// stake source.
    pub async fn register_asset(&self, address: AccountAddress, vault: Arc<dyn StakeVault>) {
        self.assets.write().await.insert(address, vault);
        info!(asset = %address, "🪙 Slashable asset registered");
    }

    async fn vault_for(&self, source: StakeSource) -> Result<Arc<dyn StakeVault>> {
        match source {
            StakeSource::Native => Ok(self.native.clone()),
            StakeSource::Bonded(address) => {
                let assets = self.assets.read().await;
                assets
                    .get(&address)
                    .cloned()
                    .ok_or(OracleError::UnknownAsset(address))
            }
        }
    }

    async fn check_native_funds(&self, caller: AccountAddress, required: Amount) -> Result<()> {
        let available = self.native.book().available(caller).await;
        if available < required {
            return Err(OracleError::InsufficientFunds {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Open a question, escrowing the bounty from the caller. The id
    /// counter only advances on success.
    pub async fn open_question(
        &self,
        caller: AccountAddress,
        params: QuestionParams,
        now: i64,
    ) -> Result<u64> {
        let _guard = self.op_guard.lock().await;

        self.config.validate_expiry(params.expiry_secs)?;
        // A bonded stake source must already be registered
        self.vault_for(params.stake_source).await?;
        self.check_native_funds(caller, params.bounty).await?;

        self.native
            .escrow(caller, params.bounty)
            .await
            .map_err(|e| OracleError::Ledger(e.to_string()))?;

        let question_id = self
            .registry
            .create(Question {
                asker: caller,
                content: params.content,
                opening_time: params.opening_time,
                expiry_secs: params.expiry_secs,
                bounty: params.bounty,
                min_bond: params.min_bond,
                stake_source: params.stake_source,
                created_at: now,
            })
            .await;
        self.ledger.init(question_id).await;

        Ok(question_id)
    }

    /// Cancel an unanswered question, refunding the full bounty to the
    /// asker and closing the answer window for good.
    pub async fn cancel_question(
        &self,
        caller: AccountAddress,
        question_id: u64,
        now: i64,
    ) -> Result<Amount> {
        let _guard = self.op_guard.lock().await;

        let question = self.require_question(question_id).await?;
        if caller != question.asker {
            return Err(OracleError::NotAuthorized(question_id));
        }
        let answer = self.require_answer(question_id).await?;
        if answer.is_finalized() || !answer.is_unanswered() {
            return Err(OracleError::NotCancellable(question_id));
        }

        // Zero strictly before the transfer; restore on transfer failure
        let refund = self.registry.take_bounty(question_id).await?;
        if let Err(e) = self.native.pay_out(question.asker, refund).await {
            self.registry.restore_bounty(question_id, refund).await?;
            return Err(OracleError::Ledger(e.to_string()));
        }
        self.ledger.mark_finalized(question_id, now).await?;

        info!(
            question_id,
            refund = refund.to_tokens(),
            "🚫 Question cancelled"
        );
        Ok(refund)
    }

    pub async fn set_observer(
        &self,
        caller: AccountAddress,
        question_id: u64,
        observer: AccountAddress,
        now: i64,
    ) -> Result<()> {
        let _guard = self.op_guard.lock().await;
        self.registry
            .set_observer(question_id, observer, caller, now)
            .await
    }

    /// Top up an open question's bounty.
    pub async fn add_bounty(
        &self,
        caller: AccountAddress,
        question_id: u64,
        amount: Amount,
    ) -> Result<Amount> {
        let _guard = self.op_guard.lock().await;

        self.require_question(question_id).await?;
        let answer = self.require_answer(question_id).await?;
        if answer.is_finalized() {
            return Err(OracleError::AnswerAlreadyFinalized(question_id));
        }
        self.check_native_funds(caller, amount).await?;

        self.native
            .escrow(caller, amount)
            .await
            .map_err(|e| OracleError::Ledger(e.to_string()))?;
        self.registry.accumulate_bounty(question_id, amount).await
    }

    /// Submit (or improve) an answer, staking `bond_amount` on it. Returns
    /// the accepted submission's fingerprint so the caller can maintain
    /// the off-system proof log.
    pub async fn submit_answer(
        &self,
        caller: AccountAddress,
        question_id: u64,
        response: ContentId,
        bond_amount: Amount,
        now: i64,
    ) -> Result<Fingerprint> {
        let _guard = self.op_guard.lock().await;

        if let Some(observer) = self.registry.observer(question_id).await {
            if caller != observer {
                return Err(OracleError::NotAuthorized(question_id));
            }
        }

        let question = self.require_question(question_id).await?;
        if now < question.opening_time {
            return Err(OracleError::OpeningTimeNotReached(question_id));
        }
        let answer = self.require_answer(question_id).await?;
        // Cancellation finalizes early, closing the window administratively
        if answer.is_finalized() || now > question.deadline() {
            return Err(OracleError::AnswerPeriodClosed(question_id));
        }

        let accumulated = self
            .bonds
            .get(question_id, caller)
            .await
            .checked_add(bond_amount)
            .ok_or(OracleError::AmountOverflow(question_id))?;
        if accumulated < question.min_bond {
            return Err(OracleError::BondTooLow {
                accumulated,
                required: question.min_bond,
            });
        }

        // Last-call extension: a near-deadline submission pushes the
        // deadline out so competitors can react
        let last_call = question.deadline() - now <= self.config.last_call_window_secs;

        let vault = self.vault_for(question.stake_source).await?;
        vault
            .encumber_from(caller, AccountAddress::escrow_pool(), bond_amount)
            .await
            .map_err(|e| OracleError::Ledger(e.to_string()))?;

        self.bonds.put(question_id, caller, accumulated).await;
        if last_call {
            self.registry
                .extend_expiry(question_id, self.config.last_call_extension_secs)
                .await?;
        }
        let next_min = self.config.ratchet.next_min_bond(accumulated);
        self.registry.raise_min_bond(question_id, next_min).await?;

        let fingerprint = Fingerprint::compute(&response, &caller, accumulated);
        self.ledger
            .record_submission(question_id, response, caller, fingerprint)
            .await?;

        debug!(
            question_id,
            responder = %caller,
            bond = accumulated.to_tokens(),
            next_min_bond = next_min.to_tokens(),
            extended = last_call,
            "Answer accepted"
        );
        Ok(fingerprint)
    }

    /// Lock in the last-submitted answer once the window has elapsed.
    /// Callable by anyone. An unanswered question refunds the bounty to
    /// the asker.
    pub async fn finalize(&self, question_id: u64, now: i64) -> Result<()> {
        let _guard = self.op_guard.lock().await;

        let question = self.require_question(question_id).await?;
        let answer = self.require_answer(question_id).await?;
        if answer.is_finalized() {
            return Err(OracleError::AnswerAlreadyFinalized(question_id));
        }
        if now < question.deadline() {
            return Err(OracleError::FinalizationDeadlineNotReached(question_id));
        }

        if answer.is_unanswered() {
            let refund = self.registry.take_bounty(question_id).await?;
            if let Err(e) = self.native.pay_out(question.asker, refund).await {
                self.registry.restore_bounty(question_id, refund).await?;
                return Err(OracleError::Ledger(e.to_string()));
            }
            info!(
                question_id,
                refund = refund.to_tokens(),
                "🏁 Finalized unanswered, bounty refunded"
            );
        }
        self.ledger.mark_finalized(question_id, now).await
    }

    /// Pay the bounty to the finalized leading responder, exactly once.
    pub async fn withdraw_bounty(
        &self,
        caller: AccountAddress,
        question_id: u64,
    ) -> Result<Amount> {
        let _guard = self.op_guard.lock().await;

        let question = self.require_question(question_id).await?;
        let answer = self.require_answer(question_id).await?;
        if !answer.is_finalized() {
            return Err(OracleError::FinalizationDeadlineNotReached(question_id));
        }
        if caller != answer.responder {
            return Err(OracleError::InvalidAnswerer(question_id));
        }
        if question.bounty.is_zero() {
            return Err(OracleError::BountyAlreadyClaimed(question_id));
        }

        let bounty = self.registry.take_bounty(question_id).await?;
        if let Err(e) = self.native.pay_out(caller, bounty).await {
            self.registry.restore_bounty(question_id, bounty).await?;
            return Err(OracleError::Ledger(e.to_string()));
        }

        info!(
            question_id,
            winner = %caller,
            bounty = bounty.to_tokens(),
            "🏆 Bounty withdrawn"
        );
        Ok(bounty)
    }

    /// Resolve the caller's own bond after finalization. The supplied
    /// fingerprint list must recompute to the committed history hash and
    /// contain the caller's fingerprint, built from `(response, caller,
    /// current bond)`. The stake is released only if `response` matches
    /// the finalized answer; otherwise it is forfeited silently and the
    /// returned amount is zero.
    pub async fn reclaim_bond(
        &self,
        caller: AccountAddress,
        question_id: u64,
        response: ContentId,
        fingerprints: &[Fingerprint],
    ) -> Result<Amount> {
        let _guard = self.op_guard.lock().await;

        let question = self.require_question(question_id).await?;
        let answer = self.require_answer(question_id).await?;
        if !answer.is_finalized() {
            return Err(OracleError::AnswerNotFinalized(question_id));
        }

        let bond = self.bonds.get(question_id, caller).await;
        let target = Fingerprint::compute(&response, &caller, bond);
        verify_history(&answer.history_hash, fingerprints, &target)?;

        let vault = self.vault_for(question.stake_source).await?;
        let taken = self.bonds.take(question_id, caller).await;

        if response == answer.response {
            if let Err(e) = vault.release(caller, taken).await {
                self.bonds.restore(question_id, caller, taken).await;
                return Err(OracleError::Ledger(e.to_string()));
            }
            info!(
                question_id,
                responder = %caller,
                released = taken.to_tokens(),
                "🔓 Winning bond reclaimed"
            );
            Ok(taken)
        } else {
            // Losing stake: proof verifies but nothing is released
            if let Err(e) = vault.slash(caller, taken).await {
                self.bonds.restore(question_id, caller, taken).await;
                return Err(OracleError::Ledger(e.to_string()));
            }
            warn!(
                question_id,
                responder = %caller,
                forfeited = taken.to_tokens(),
                "⚔️ Losing bond forfeited on reclaim"
            );
            Ok(Amount::ZERO)
        }
    }

    /// Confiscate a non-winning responder's bond via the asset's slashing
    /// primitive. Only available for bonded stake sources; any caller, the
    /// history proof is the only authorization.
    pub async fn slash_bond(
        &self,
        question_id: u64,
        response: ContentId,
        target: AccountAddress,
        fingerprints: &[Fingerprint],
    ) -> Result<Amount> {
        let _guard = self.op_guard.lock().await;

        let question = self.require_question(question_id).await?;
        if !question.stake_source.is_slashable() {
            return Err(OracleError::StakeNotSlashable(question_id));
        }
        let answer = self.require_answer(question_id).await?;
        if !answer.is_finalized() {
            return Err(OracleError::AnswerNotFinalized(question_id));
        }

        let bond = self.bonds.get(question_id, target).await;
        let fingerprint = Fingerprint::compute(&response, &target, bond);
        verify_history(&answer.history_hash, fingerprints, &fingerprint)?;

        // The winner's stake is never slashable; it stays reclaimable
        if response == answer.response {
            return Err(OracleError::InvalidAnswerer(question_id));
        }

        let vault = self.vault_for(question.stake_source).await?;
        let taken = self.bonds.take(question_id, target).await;
        if let Err(e) = vault.slash(target, taken).await {
            self.bonds.restore(question_id, target, taken).await;
            return Err(OracleError::Ledger(e.to_string()));
        }

        warn!(
            question_id,
            responder = %target,
            slashed = taken.to_tokens(),
            "⚔️ Bond slashed"
        );
        Ok(taken)
    }

    // --- read surface ---

    pub async fn question(&self, question_id: u64) -> Option<Question> {
        self.registry.get(question_id).await
    }

    pub async fn answer(&self, question_id: u64) -> Option<Answer> {
        self.ledger.get(question_id).await
    }

    pub async fn bond(&self, question_id: u64, responder: AccountAddress) -> Amount {
        self.bonds.get(question_id, responder).await
    }

    pub async fn observer(&self, question_id: u64) -> Option<AccountAddress> {
        self.registry.observer(question_id).await
    }

    pub async fn next_question_id(&self) -> u64 {
        self.registry.next_question_id().await
    }

    pub async fn is_finalized(&self, question_id: u64) -> Result<bool> {
        Ok(self.require_answer(question_id).await?.is_finalized())
    }

    /// The committed response, once finalization has locked it in.
    pub async fn final_response(&self, question_id: u64) -> Result<ContentId> {
        let answer = self.require_answer(question_id).await?;
        if !answer.is_finalized() {
            return Err(OracleError::AnswerNotFinalized(question_id));
        }
        Ok(answer.response)
    }

    async fn require_question(&self, question_id: u64) -> Result<Question> {
        self.registry
            .get(question_id)
            .await
            .ok_or(OracleError::QuestionDoesNotExist(question_id))
    }

    async fn require_answer(&self, question_id: u64) -> Result<Answer> {
        self.ledger
            .get(question_id)
            .await
            .ok_or(OracleError::QuestionDoesNotExist(question_id))
    }
}
