use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use veridict_stake::{AccountAddress, Amount};

/// Per-(question, responder) staked amounts. Bonds accumulate across
/// repeated submissions by the same responder and are zeroed exactly once,
/// by reclaim or slash.
pub struct BondStore {
    bonds: Arc<RwLock<HashMap<(u64, AccountAddress), Amount>>>,
}

impl BondStore {
    pub fn new() -> Self {
        Self {
            bonds: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, question_id: u64, responder: AccountAddress) -> Amount {
        let bonds = self.bonds.read().await;
        bonds
            .get(&(question_id, responder))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub async fn put(&self, question_id: u64, responder: AccountAddress, amount: Amount) {
        self.bonds
            .write()
            .await
            .insert((question_id, responder), amount);
        debug!(question_id, responder = %responder, bond = amount.to_tokens(), "Bond updated");
    }

    /// Zero the bond and return what was staked. Resolution paths draw
    /// from the returned value, never from the record, so a repeat call
    /// observes zero.
    pub async fn take(&self, question_id: u64, responder: AccountAddress) -> Amount {
        let mut bonds = self.bonds.write().await;
        bonds
            .remove(&(question_id, responder))
            .unwrap_or(Amount::ZERO)
    }

    /// Put a taken bond back; compensation for a failed release/slash.
    pub async fn restore(&self, question_id: u64, responder: AccountAddress, amount: Amount) {
        self.bonds
            .write()
            .await
            .insert((question_id, responder), amount);
    }
}

impl Default for BondStore {
    fn default() -> Self {
        Self::new()
    }
}
