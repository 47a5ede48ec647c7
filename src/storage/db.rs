// Database - Abstraction RocksDB pour le ledger de staking
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

/// Wrapper autour de RocksDB
pub struct Database {
    db: Arc<DB>,
}

impl Database {
    /// Ouvre ou crée une base de données
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // Limiter l'accumulation de fichiers de log
        opts.set_keep_log_file_num(5);
        opts.set_max_background_jobs(2);

        let db = DB::open(&opts, path).map_err(|e| DatabaseError::OpenFailed(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Lit une valeur
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        self.db
            .get(key)
            .map_err(|e| DatabaseError::ReadFailed(e.to_string()))
    }

    /// Batch write (transaction atomique)
    pub fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        let mut batch = WriteBatch::default();

        for op in ops {
            match op {
                WriteOp::Put { key, value } => batch.put(&key, &value),
                WriteOp::Delete { key } => batch.delete(&key),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| DatabaseError::WriteFailed(e.to_string()))
    }

    /// Toutes les paires (clé, valeur) sous un préfixe, dans l'ordre des clés.
    /// Une erreur de lecture interrompt le parcours.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError> {
        let mut rows = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item.map_err(|e| DatabaseError::ReadFailed(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }
        Ok(rows)
    }
}

/// Opération d'écriture pour batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Erreurs de base de données
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Échec d'ouverture de la DB: {0}")]
    OpenFailed(String),

    #[error("Échec de lecture: {0}")]
    ReadFailed(String),

    #[error("Échec d'écriture: {0}")]
    WriteFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_batch_write_puts_and_deletes() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path()).unwrap();

        db.batch_write(vec![
            WriteOp::Put { key: b"validator:a".to_vec(), value: b"1".to_vec() },
            WriteOp::Put { key: b"validator:b".to_vec(), value: b"2".to_vec() },
        ])
        .unwrap();
        assert_eq!(db.get(b"validator:a").unwrap(), Some(b"1".to_vec()));

        db.batch_write(vec![
            WriteOp::Delete { key: b"validator:a".to_vec() },
            WriteOp::Put { key: b"validator:b".to_vec(), value: b"3".to_vec() },
        ])
        .unwrap();
        assert_eq!(db.get(b"validator:a").unwrap(), None);
        assert_eq!(db.get(b"validator:b").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn test_scan_prefix_stops_at_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path()).unwrap();

        db.batch_write(vec![
            WriteOp::Put { key: b"ubd:1".to_vec(), value: b"a".to_vec() },
            WriteOp::Put { key: b"ubd:2".to_vec(), value: b"b".to_vec() },
            WriteOp::Put { key: b"validator:1".to_vec(), value: b"c".to_vec() },
        ])
        .unwrap();

        let rows = db.scan_prefix(b"ubd:").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, b"ubd:1".to_vec());
        assert_eq!(rows[1].1, b"b".to_vec());
        assert!(db.scan_prefix(b"red:").unwrap().is_empty());
    }
}
