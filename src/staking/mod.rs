// Staking - Ledger de bonding: validateurs, délégations, files de déliaison
// Principe: Comptabilité en parts, tokens détenus par le bank, un bloc à la fois

pub mod bank;
pub mod delegation;
pub mod error;
pub mod exchange;
pub mod historical;
pub mod invariants;
pub mod keeper;
pub mod params;
pub mod redelegation;
pub mod registry;
pub mod selector;
pub mod slashing;
pub mod state;
pub mod unbonding;
pub mod validator;

pub use bank::{BankError, BankKeeper, MemoryBank, PoolKind};
pub use delegation::Delegation;
pub use error::{ErrorKind, StakingError, StakingResult};
pub use historical::HistoricalInfo;
pub use keeper::StakingKeeper;
pub use params::*;
pub use redelegation::{Redelegation, RedelegationEntry};
pub use registry::{NewValidator, ValidatorEdit};
pub use selector::{ValidatorSetDelta, ValidatorUpdate};
pub use slashing::SlashOutcome;
pub use state::{DvPair, DvvTriplet, QueueIndexes, StakingState};
pub use unbonding::{UnbondingDelegation, UnbondingDelegationEntry};
pub use validator::*;
