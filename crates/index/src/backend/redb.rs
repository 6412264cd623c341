//! redb backend: a single-file, pure-Rust embedded store.
//!
//! Every write is its own committed transaction, so an acknowledged insert
//! survives a crash.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{IndexBackend, IndexError};

const FINGERPRINT_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("plagcheck_fingerprints");

pub struct RedbBackend {
    db: Arc<Database>,
}

fn backend_err(err: impl std::fmt::Display) -> IndexError {
    IndexError::backend(err)
}

impl RedbBackend {
    /// Open or create the database file at `path`.
    ///
    /// ```no_run
    /// use index::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/plagcheck-index.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = Database::create(path).map_err(backend_err)?;

        // Creating the table up front lets read transactions open it on an
        // empty database.
        let write_txn = db.begin_write().map_err(backend_err)?;
        {
            let _table = write_txn
                .open_table(FINGERPRINT_TABLE)
                .map_err(backend_err)?;
        }
        write_txn.commit().map_err(backend_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn begin_write(&self) -> Result<redb::WriteTransaction, IndexError> {
        self.db.begin_write().map_err(backend_err)
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn
                .open_table(FINGERPRINT_TABLE)
                .map_err(backend_err)?;
            table.insert(key, value).map_err(backend_err)?;
        }
        write_txn.commit().map_err(backend_err)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let read_txn = self.db.begin_read().map_err(backend_err)?;
        let table = read_txn
            .open_table(FINGERPRINT_TABLE)
            .map_err(backend_err)?;
        let value = table.get(key).map_err(backend_err)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn
                .open_table(FINGERPRINT_TABLE)
                .map_err(backend_err)?;
            table.remove(key).map_err(backend_err)?;
        }
        write_txn.commit().map_err(backend_err)
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn
                .open_table(FINGERPRINT_TABLE)
                .map_err(backend_err)?;
            for (key, value) in &entries {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(backend_err)?;
            }
        }
        write_txn.commit().map_err(backend_err)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let read_txn = self.db.begin_read().map_err(backend_err)?;
        let table = read_txn
            .open_table(FINGERPRINT_TABLE)
            .map_err(backend_err)?;

        for item in table.iter().map_err(backend_err)? {
            let (key, value) = item.map_err(backend_err)?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }
}
