use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, Options, WriteOptions, DB};
use tracing::info;

use crate::error::StoreError;
use crate::store::{KeyValueStore, ScanResult};

/// RocksDB-backed store. Keys are stored as-is, so prefix scans are plain
/// forward iteration from the prefix.
pub struct RocksDbStore {
    db: Arc<DB>,
    sync_writes: bool,
    closed: AtomicBool,
}

impl RocksDbStore {
    /// Open (creating if needed) a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, path.as_ref())?;
        info!(path = %path.as_ref().display(), "rocksdb store opened");
        Ok(Self {
            db: Arc::new(db),
            sync_writes: true,
            closed: AtomicBool::new(false),
        })
    }

    /// Skip fsync on every write. Tests only.
    pub fn without_sync(mut self) -> Self {
        self.sync_writes = false;
        self
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&DB) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(db.as_ref()))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl KeyValueStore for RocksDbStore {
    async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        let key = key.to_vec();
        self.blocking(move |db| match db.get(&key)? {
            Some(v) => Ok(v),
            None => Err(StoreError::not_found(&key)),
        })
        .await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let (key, value) = (key.to_vec(), value.to_vec());
        let sync = self.sync_writes;
        self.blocking(move |db| {
            let mut write_opts = WriteOptions::default();
            write_opts.set_sync(sync);
            Ok(db.put_opt(key, value, &write_opts)?)
        })
        .await
    }

    async fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let key = key.to_vec();
        self.blocking(move |db| Ok(db.delete(key)?)).await
    }

    async fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        let prefix = prefix.to_vec();
        self.blocking(move |db| {
            let mut results = Vec::new();
            for item in db.iterator(IteratorMode::From(&prefix[..], Direction::Forward)) {
                let (key, value) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                results.push((key.to_vec(), value.to_vec()));
            }
            Ok(results)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.blocking(|db| Ok(db.flush()?)).await?;
        info!("rocksdb store closed");
        Ok(())
    }
}
