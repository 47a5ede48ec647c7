// Account - Adresses des délégateurs, opérateurs et clés de consensus
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// AccountId = clé publique Ed25519 (32 bytes)
/// Sert à la fois d'adresse de délégateur et d'adresse d'opérateur de validateur.
/// L'ordre des octets définit l'ordre déterministe de tous les parcours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }
}

/// Clé publique de consensus d'un validateur (Ed25519)
///
/// Only constructible from bytes that decode to a valid curve point, so a
/// registered key is always usable by the consensus driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 32]")]
pub struct ConsensusPubKey([u8; 32]);

impl ConsensusPubKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, InvalidConsensusKey> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| InvalidConsensusKey)?;
        Ok(ConsensusPubKey(bytes))
    }

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        ConsensusPubKey(key.to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<[u8; 32]> for ConsensusPubKey {
    type Error = InvalidConsensusKey;

    fn try_from(bytes: [u8; 32]) -> Result<Self, Self::Error> {
        ConsensusPubKey::from_bytes(bytes)
    }
}

impl fmt::Display for ConsensusPubKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ed25519:{}", hex::encode(&self.0[..8]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Clé de consensus invalide (point Ed25519 non décodable)")]
pub struct InvalidConsensusKey;
