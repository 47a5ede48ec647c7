// Types fondamentaux du staking KratOs
// Principe: Minimal, auditable, déterministe

pub mod primitives;
pub mod account;
pub mod decimal;

pub use primitives::*;
pub use account::*;
pub use decimal::*;
