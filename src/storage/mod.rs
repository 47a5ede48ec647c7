// Storage - Couche de persistance (RocksDB)
// Principe: Auditabilité, Reproductibilité

pub mod db;
pub mod state;

pub use db::*;
pub use state::*;
