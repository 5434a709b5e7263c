use thiserror::Error;
use veridict_stake::{AccountAddress, Amount};

/// Failure conditions for oracle operations. Every failure aborts the
/// whole operation with no partial state change; retries are the caller's
/// responsibility.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Question not found: {0}")]
    QuestionDoesNotExist(u64),

    #[error("Answer window for question {0} has not opened yet")]
    OpeningTimeNotReached(u64),

    #[error("Answer window for question {0} is closed")]
    AnswerPeriodClosed(u64),

    #[error("Answer window for question {0} has not elapsed yet")]
    FinalizationDeadlineNotReached(u64),

    #[error("Caller is not authorized to act on question {0}")]
    NotAuthorized(u64),

    #[error("Wrong answerer for question {0}")]
    InvalidAnswerer(u64),

    #[error("Observer can no longer be assigned for question {0}")]
    ObserverNotAssignable(u64),

    #[error("Accumulated bond {accumulated} is below the required minimum {required}")]
    BondTooLow {
        accumulated: Amount,
        required: Amount,
    },

    #[error("Bounty for question {0} has already been claimed")]
    BountyAlreadyClaimed(u64),

    #[error("Question {0} is not cancellable")]
    NotCancellable(u64),

    #[error("Answer for question {0} is already finalized")]
    AnswerAlreadyFinalized(u64),

    #[error("Answer for question {0} is not finalized")]
    AnswerNotFinalized(u64),

    #[error("Invalid expiry duration: {0}s")]
    InvalidExpiry(i64),

    #[error("Fingerprint not found in the supplied history")]
    NotFound,

    #[error("Supplied history does not match the committed hash")]
    InvalidHistoryHash,

    #[error("Unknown stake asset: {0}")]
    UnknownAsset(AccountAddress),

    #[error("Stake for question {0} is not held in a slashable asset")]
    StakeNotSlashable(u64),

    #[error("Bond amount overflow on question {0}")]
    AmountOverflow(u64),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Amount,
        available: Amount,
    },

    #[error("Stake ledger error: {0}")]
    Ledger(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;
