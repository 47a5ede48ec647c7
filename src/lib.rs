// KratOs staking - Ledger de bonding pour validateurs et délégateurs
// Principe: Déterministe, auditable, aucun fonds détenu hors du bank

pub mod config;
pub mod staking;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::StakingConfig;
pub use staking::{
    BankKeeper, ErrorKind, MemoryBank, Params, StakingError, StakingKeeper, StakingResult,
};
pub use types::{AccountId, Balance, BlockContext, BlockHeader, ConsensusPubKey, Shares};
