//! Staked question-answering oracle core.
//!
//! Lifecycle:
//! 1. A requester opens a question, escrowing a bounty
//! 2. Responders submit competing answers, each staking an escalating bond
//! 3. Near-deadline submissions extend the window (last-call rule)
//! 4. After the window elapses anyone finalizes, locking in the last answer
//! 5. The winning responder withdraws the bounty, exactly once
//! 6. Responders reclaim their bonds by proving membership in the rolling
//!    hash chain; non-winning bonds are forfeited or explicitly slashed
//!
//! Full answer history is never stored: every accepted submission folds a
//! fingerprint into a single rolling hash, and reclaim/slash callers supply
//! the ordered fingerprint list for recomputation.

pub mod bonds;
pub mod engine;
pub mod error;
pub mod history;
pub mod ledger;
pub mod registry;
pub mod types;

pub use bonds::BondStore;
pub use engine::OracleEngine;
pub use error::{OracleError, Result};
pub use history::{recompute_history_hash, verify_history, Fingerprint, HistoryHash};
pub use ledger::AnswerLedger;
pub use registry::QuestionRegistry;
pub use types::{
    Answer, ContentId, OracleConfig, Question, QuestionParams, RatchetRule, StakeSource,
};
