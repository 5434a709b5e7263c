use crate::error::{OracleError, Result};
use crate::history::HistoryHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use veridict_stake::{AccountAddress, Amount};

/// Blake3 fingerprint of off-system content (question or answer text).
/// Only the fingerprint ever enters oracle state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId([u8; 32]);

impl ContentId {
    pub fn new(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Sentinel for a question nobody has answered yet.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s).ok()?;
        let bytes: [u8; 32] = raw.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Where a question's bonds are staked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeSource {
    /// Bonds move through the native escrow pool; forfeits are retained
    /// by the treasury.
    Native,
    /// Bonds are encumbered in place on a registered slashable asset;
    /// forfeits and slashes are burned.
    Bonded(AccountAddress),
}

impl StakeSource {
    pub fn is_slashable(&self) -> bool {
        matches!(self, StakeSource::Bonded(_))
    }
}

/// A question opened by a requester. The record persists after the bounty
/// is zeroed so committed history stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub asker: AccountAddress,
    pub content: ContentId,
    /// No answer is accepted before this instant (unix seconds).
    pub opening_time: i64,
    /// Answer window length after `opening_time`; grows under the
    /// last-call rule.
    pub expiry_secs: i64,
    /// Escrowed reward, zeroed exactly once by cancel, refund, or claim.
    pub bounty: Amount,
    /// Minimum accumulated stake for the next accepted answer.
    pub min_bond: Amount,
    pub stake_source: StakeSource,
    pub created_at: i64,
}

impl Question {
    /// Saturating so a pathological `opening_time` near `i64::MAX` cannot
    /// wrap the deadline into the past.
    pub fn deadline(&self) -> i64 {
        self.opening_time.saturating_add(self.expiry_secs)
    }
}

/// Parameters supplied by a requester when opening a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionParams {
    pub content: ContentId,
    pub opening_time: i64,
    pub expiry_secs: i64,
    pub min_bond: Amount,
    pub bounty: Amount,
    pub stake_source: StakeSource,
}

/// The current leading answer for a question, plus the rolling commitment
/// over every submission ever accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub response: ContentId,
    pub responder: AccountAddress,
    /// Zero while open; set exactly once.
    pub finalized_at: i64,
    pub history_hash: HistoryHash,
}

impl Answer {
    pub fn empty() -> Self {
        Self {
            response: ContentId::zero(),
            responder: AccountAddress::zero(),
            finalized_at: 0,
            history_hash: HistoryHash::ZERO,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_at != 0
    }

    pub fn is_unanswered(&self) -> bool {
        self.history_hash.is_zero()
    }
}

/// Escalation rule applied to `min_bond` after each accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatchetRule {
    /// Next answer must stake at least twice the current accumulated bond.
    Doubling,
    /// Sub-linear escalation: accumulated + sqrt(accumulated), floored at
    /// one base unit.
    SqrtStep,
}

impl RatchetRule {
    pub fn next_min_bond(&self, accumulated: Amount) -> Amount {
        match self {
            RatchetRule::Doubling => accumulated.saturating_mul(2),
            RatchetRule::SqrtStep => {
                let step = accumulated.to_base_units().isqrt().max(1);
                accumulated.saturating_add(Amount::from_base_units(step))
            }
        }
    }
}

/// Timing and escalation knobs for an oracle instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Longest answer window a question may be opened with.
    pub max_expiry_secs: i64,
    /// Distance from the deadline inside which a submission extends it.
    pub last_call_window_secs: i64,
    /// How far the deadline moves on a last-call submission.
    pub last_call_extension_secs: i64,
    pub ratchet: RatchetRule,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_expiry_secs: chrono::Duration::days(365).num_seconds(),
            last_call_window_secs: chrono::Duration::minutes(1).num_seconds(),
            last_call_extension_secs: chrono::Duration::minutes(5).num_seconds(),
            ratchet: RatchetRule::Doubling,
        }
    }
}

impl OracleConfig {
    pub fn validate_expiry(&self, expiry_secs: i64) -> Result<()> {
        if expiry_secs <= 0 || expiry_secs > self.max_expiry_secs {
            return Err(OracleError::InvalidExpiry(expiry_secs));
        }
        Ok(())
    }
}
