// Errors - Erreurs du ledger de staking
use super::bank::BankError;
use crate::types::{AccountId, Balance, BlockNumber, InvalidConsensusKey, Rate, Shares, Timestamp};

/// Caller-facing category of a staking failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    InsufficientFunds,
    InsufficientShares,
    LimitExceeded,
    InvalidState,
    /// Ledger corruption; the block must not be committed.
    Fatal,
}

/// Erreurs de staking
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StakingError {
    #[error("Validator {0} not found")]
    ValidatorNotFound(AccountId),

    #[error("Validator {0} already exists")]
    ValidatorAlreadyExists(AccountId),

    #[error("Consensus key already registered to validator {0}")]
    ConsensusKeyInUse(AccountId),

    #[error(transparent)]
    InvalidConsensusKey(#[from] InvalidConsensusKey),

    #[error("Invalid commission: {0}")]
    CommissionInvalid(&'static str),

    #[error("Commission rate {rate} exceeds max rate {max_rate}")]
    CommissionRateTooHigh { rate: Rate, max_rate: Rate },

    #[error("Commission rate {rate} below minimum {min}")]
    CommissionRateTooLow { rate: Rate, min: Rate },

    #[error("Commission change {change} exceeds max change rate {max_change_rate}")]
    CommissionChangeTooLarge { change: Rate, max_change_rate: Rate },

    #[error("Commission cannot be changed more than once per day (last update at {last_update})")]
    CommissionUpdateTooFrequent { last_update: Timestamp },

    #[error("Self-delegation {self_bond} below minimum {minimum}")]
    SelfDelegationBelowMinimum { self_bond: Balance, minimum: Balance },

    #[error("Minimum self-delegation cannot be decreased ({current} -> {requested})")]
    MinSelfDelegationDecreased { current: Balance, requested: Balance },

    #[error("Validator {0} is jailed")]
    ValidatorJailed(AccountId),

    #[error("Validator {0} is not jailed")]
    ValidatorNotJailed(AccountId),

    #[error("No delegation from {delegator} to {validator}")]
    DelegationNotFound { delegator: AccountId, validator: AccountId },

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: Shares, available: Shares },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(#[from] BankError),

    #[error("Too many unbonding entries for ({delegator}, {validator})")]
    MaxUnbondingEntriesExceeded { delegator: AccountId, validator: AccountId },

    #[error("Too many redelegation entries for ({delegator}, {src} -> {dst})")]
    MaxRedelegationEntriesExceeded { delegator: AccountId, src: AccountId, dst: AccountId },

    #[error("Cannot redelegate to jailed validator {0}")]
    RedelegationToJailedValidator(AccountId),

    #[error("Redelegation out of {src} blocked by an unmatured redelegation into it")]
    RedelegationLoop { src: AccountId },

    #[error("Source and destination validator are identical")]
    SelfRedelegation,

    #[error("No unbonding entry at height {creation_height}")]
    EntryNotFound { creation_height: BlockNumber },

    #[error("Amount {requested} exceeds unbonding entry balance {balance}")]
    AmountExceedsEntry { requested: Balance, balance: Balance },

    #[error("Invalid amount: {0}")]
    InvalidAmount(&'static str),

    #[error("Validator {0} has no tokens backing its shares")]
    InvalidExchangeRate(AccountId),

    #[error("Slash fraction {0} outside [0, 1)")]
    InvalidSlashFraction(Rate),

    #[error("Infraction height {infraction} is in the future (current {current})")]
    FutureInfraction { infraction: BlockNumber, current: BlockNumber },

    #[error("Invalid params: {0}")]
    InvalidParams(&'static str),

    #[error("Description field {field} exceeds {max} characters")]
    DescriptionTooLong { field: &'static str, max: usize },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl StakingError {
    pub fn kind(&self) -> ErrorKind {
        use StakingError::*;
        match self {
            ValidatorNotFound(_) | DelegationNotFound { .. } | EntryNotFound { .. } => {
                ErrorKind::NotFound
            }
            ValidatorAlreadyExists(_) | ConsensusKeyInUse(_) => ErrorKind::AlreadyExists,
            InvalidConsensusKey(_)
            | CommissionInvalid(_)
            | CommissionRateTooHigh { .. }
            | CommissionRateTooLow { .. }
            | SelfRedelegation
            | AmountExceedsEntry { .. }
            | InvalidAmount(_)
            | InvalidSlashFraction(_)
            | FutureInfraction { .. }
            | InvalidParams(_)
            | DescriptionTooLong { .. }
            | ArithmeticOverflow => ErrorKind::InvalidArgument,
            InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            InsufficientShares { .. } => ErrorKind::InsufficientShares,
            CommissionChangeTooLarge { .. }
            | CommissionUpdateTooFrequent { .. }
            | SelfDelegationBelowMinimum { .. }
            | MinSelfDelegationDecreased { .. }
            | MaxUnbondingEntriesExceeded { .. }
            | MaxRedelegationEntriesExceeded { .. } => ErrorKind::LimitExceeded,
            ValidatorJailed(_)
            | ValidatorNotJailed(_)
            | RedelegationToJailedValidator(_)
            | RedelegationLoop { .. }
            | InvalidExchangeRate(_) => ErrorKind::InvalidState,
            InvariantViolation(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

pub type StakingResult<T> = Result<T, StakingError>;
