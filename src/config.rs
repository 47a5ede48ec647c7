// Configuration du module de staking
use crate::staking::{Params, StakingResult};
use serde::{Deserialize, Serialize};

/// Configuration du ledger de staking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Nom de la chaîne
    pub chain_name: String,

    /// Paramètres du module
    pub params: Params,

    /// Répertoire RocksDB (None = état en mémoire uniquement)
    #[serde(default)]
    pub storage_path: Option<String>,
}

impl StakingConfig {
    pub fn mainnet() -> Self {
        Self {
            chain_name: "KratOs".to_string(),
            params: Params::default(),
            storage_path: None,
        }
    }

    /// Rejects configurations whose params the keeper would refuse.
    pub fn validate(&self) -> StakingResult<()> {
        self.params.validate()
    }

    /// Charge depuis un fichier JSON
    pub fn from_file(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Sauvegarde vers un fichier JSON
    pub fn to_file(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}
