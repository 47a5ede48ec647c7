// Primitives KratOs - Types fondamentaux du ledger de staking
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash universel (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash des données avec Blake3
    pub fn hash(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

/// Numéro de bloc (hauteur)
pub type BlockNumber = u64;

/// Timestamp Unix en secondes (temps du bloc fourni par le driver de consensus)
pub type Timestamp = u64;

/// Montant en unités de base de la dénomination de bond
pub type Balance = u128;

/// Constantes monétaires
pub const KRAT: Balance = 1_000_000_000_000; // 10^12
pub const MILLIKRAT: Balance = 1_000_000_000; // 10^9
pub const MICROKRAT: Balance = 1_000_000; // 10^6

/// Une journée, fenêtre minimale entre deux changements de commission
pub const SECONDS_PER_DAY: Timestamp = 24 * 3600;

/// Contexte d'exécution d'une opération: hauteur et temps du bloc courant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: BlockNumber,
    pub time: Timestamp,
}

impl BlockContext {
    pub fn new(height: BlockNumber, time: Timestamp) -> Self {
        Self { height, time }
    }
}

/// En-tête de bloc tel que fourni par le driver de consensus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: BlockNumber,
    pub time: Timestamp,
    pub chain_id: String,
    pub app_hash: Hash,
}

impl BlockHeader {
    pub fn context(&self) -> BlockContext {
        BlockContext::new(self.height, self.time)
    }
}
