//! Typed per-session user data on top of a raw [`KeyValueStore`].

use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::store::keys::{decode_user_data_key, user_data_key, DataType, Partition};
use crate::store::list::{decode_list, encode_list};
use crate::store::KeyValueStore;

/// `(sessionId, DataType) -> bytes` mapping shared by every session.
#[derive(Clone)]
pub struct UserDataStore {
    kv: Arc<dyn KeyValueStore>,
    log: Option<LogChannel>,
}

impl UserDataStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, log: None }
    }

    /// Mirror every write to an advisory log channel.
    pub fn with_log(mut self, log: LogChannel) -> Self {
        self.log = Some(log);
        self
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    pub async fn read(&self, session_id: &str, dt: DataType) -> Result<Vec<u8>, StoreError> {
        self.kv.get(&user_data_key(dt, session_id.as_bytes())).await
    }

    /// Read a field as text. Invalid UTF-8 is replaced, never rejected.
    pub async fn read_string(&self, session_id: &str, dt: DataType) -> Result<String, StoreError> {
        let raw = self.read(session_id, dt).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    pub async fn write(
        &self,
        session_id: &str,
        dt: DataType,
        value: impl AsRef<[u8]>,
    ) -> Result<(), StoreError> {
        let value = value.as_ref();
        self.kv
            .put(&user_data_key(dt, session_id.as_bytes()), value)
            .await?;
        if let Some(log) = &self.log {
            log.write(session_id, dt, value).await;
        }
        Ok(())
    }

    /// Remove a field. Removing an unset field is not an error.
    pub async fn delete(&self, session_id: &str, dt: DataType) -> Result<(), StoreError> {
        self.kv
            .delete(&user_data_key(dt, session_id.as_bytes()))
            .await
    }

    /// Every stored field of a session whose data type starts with `prefix`
    /// (big-endian data type bytes; empty for all fields).
    pub async fn dump(
        &self,
        session_id: &str,
        prefix: &[u8],
    ) -> Result<Vec<(DataType, Vec<u8>)>, StoreError> {
        let mut scan_prefix = vec![Partition::UserData as u8];
        scan_prefix.extend_from_slice(prefix);
        let entries = self.kv.prefix_scan(&scan_prefix).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, value)| {
                let (dt, id) = decode_user_data_key(&key)?;
                (id == session_id.as_bytes()).then_some((dt, value))
            })
            .collect())
    }

    /// A view whose keys are transparently prefixed with `prefix`.
    pub fn sub_prefix(&self, prefix: &[u8]) -> SubPrefixStore {
        SubPrefixStore {
            kv: Arc::clone(&self.kv),
            prefix: prefix.to_vec(),
            log: self.log.clone(),
        }
    }

    /// The list family `dt` belongs to: every user data type sharing its
    /// high byte. Columns written through it land on their usual user data
    /// keys.
    pub fn list_family(&self, dt: DataType) -> SubPrefixStore {
        self.sub_prefix(&[Partition::UserData as u8, dt.to_be_bytes()[0]])
    }

    /// Record `address -> session_id`. The address must already be
    /// normalized (lowercase hex without `0x`).
    pub async fn write_reverse(&self, address: &str, session_id: &str) -> Result<(), StoreError> {
        self.write(address, DataType::PUBLIC_KEY_REVERSE, session_id)
            .await
    }

    pub async fn delete_reverse(&self, address: &str) -> Result<(), StoreError> {
        self.delete(address, DataType::PUBLIC_KEY_REVERSE).await
    }

    pub async fn read_reverse(&self, address: &str) -> Result<String, StoreError> {
        self.read_string(address, DataType::PUBLIC_KEY_REVERSE)
            .await
    }
}

/// Restricted view of the store scoped under a fixed key prefix.
///
/// Used for list-shaped records so a whole family of columns can be scanned
/// or replaced together. `read` and `write` address a column by the low byte
/// of its data type; the family's high byte belongs to the prefix.
#[derive(Clone)]
pub struct SubPrefixStore {
    kv: Arc<dyn KeyValueStore>,
    prefix: Vec<u8>,
    log: Option<LogChannel>,
}

impl SubPrefixStore {
    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    fn column_key(dt: DataType, session_id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + session_id.len());
        key.push(dt.to_be_bytes()[1]);
        key.extend_from_slice(session_id.as_bytes());
        key
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.kv.get(&self.full_key(key)).await
    }

    pub async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.kv.put(&self.full_key(key), value).await
    }

    pub async fn read(&self, session_id: &str, dt: DataType) -> Result<String, StoreError> {
        let raw = self.get(&Self::column_key(dt, session_id)).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// A list column; unset columns read as empty.
    pub async fn read_list(&self, session_id: &str, dt: DataType) -> Result<Vec<String>, StoreError> {
        match self.read(session_id, dt).await {
            Ok(raw) => Ok(decode_list(&raw)),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn write(&self, session_id: &str, dt: DataType, value: &str) -> Result<(), StoreError> {
        self.put(&Self::column_key(dt, session_id), value.as_bytes())
            .await?;
        if let Some(log) = &self.log {
            log.write(session_id, dt, value.as_bytes()).await;
        }
        Ok(())
    }

    pub async fn write_list<S: AsRef<str>>(
        &self,
        session_id: &str,
        dt: DataType,
        items: &[S],
    ) -> Result<(), StoreError> {
        self.write(session_id, dt, &encode_list(items)).await
    }
}

/// Append-only advisory log of user data writes.
///
/// Failures are reported at debug level and never fail the caller.
#[derive(Clone)]
pub struct LogChannel {
    kv: Arc<dyn KeyValueStore>,
}

impl LogChannel {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn write(&self, session_id: &str, dt: DataType, value: &[u8]) {
        let ts = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default() as u64;
        let mut key = vec![Partition::Log as u8];
        key.extend_from_slice(&dt.to_be_bytes());
        key.extend_from_slice(session_id.as_bytes());
        key.extend_from_slice(&ts.to_be_bytes());
        if let Err(e) = self.kv.put(&key, value).await {
            debug!(session_id, data_type = %dt, error = %e, "log channel write missed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> UserDataStore {
        UserDataStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_read_write_scoped_by_session() {
        let store = store();
        store
            .write("+254700000000", DataType::FIRST_NAME, "Amina")
            .await
            .unwrap();
        assert_eq!(
            store
                .read_string("+254700000000", DataType::FIRST_NAME)
                .await
                .unwrap(),
            "Amina"
        );
        let err = store
            .read_string("+254700000001", DataType::FIRST_NAME)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_dump_filters_other_sessions() {
        let store = store();
        store.write("254", DataType::PUBLIC_KEY, "0xabc").await.unwrap();
        store.write("254", DataType::TX_VALUES, "1:2.00").await.unwrap();
        // Shares a suffix with "254" but is a different session.
        store.write("0254", DataType::PUBLIC_KEY, "0xdef").await.unwrap();

        let all = store.dump("254", &[]).await.unwrap();
        assert_eq!(
            all,
            vec![
                (DataType::PUBLIC_KEY, b"0xabc".to_vec()),
                (DataType::TX_VALUES, b"1:2.00".to_vec()),
            ]
        );

        let txs = store.dump("254", &[0x02]).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].0, DataType::TX_VALUES);
    }

    #[tokio::test]
    async fn test_sub_prefix_is_isolated() {
        let store = store();
        let vouchers = store.sub_prefix(b"vouchers");
        vouchers
            .write("254", DataType::VOUCHER_SYMBOLS, "1:SRF")
            .await
            .unwrap();
        assert_eq!(
            vouchers.read("254", DataType::VOUCHER_SYMBOLS).await.unwrap(),
            "1:SRF"
        );
        assert!(store
            .read("254", DataType::VOUCHER_SYMBOLS)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_list_family_shares_user_data_keys() {
        let store = store();
        let family = store.list_family(DataType::VOUCHER_SYMBOLS);
        family
            .write_list("254", DataType::VOUCHER_BALANCES, &["10.96", "2.00"])
            .await
            .unwrap();
        assert_eq!(
            store.read_string("254", DataType::VOUCHER_BALANCES).await.unwrap(),
            "1:10.96\n2:2.00"
        );
        assert_eq!(
            family.read_list("254", DataType::VOUCHER_BALANCES).await.unwrap(),
            vec!["10.96", "2.00"]
        );
        assert!(family
            .read_list("254", DataType::VOUCHER_SYMBOLS)
            .await
            .unwrap()
            .is_empty());

        // Scanning the family finds only its own columns.
        store.write("254", DataType::TX_VALUES, "1:1.00").await.unwrap();
        let scanned = store.backend().prefix_scan(family.prefix()).await.unwrap();
        assert_eq!(scanned.len(), 1);
    }

    #[tokio::test]
    async fn test_reverse_mapping() {
        let store = store();
        store.write_reverse("abcdef", "+254700000000").await.unwrap();
        assert_eq!(store.read_reverse("abcdef").await.unwrap(), "+254700000000");
    }

    #[tokio::test]
    async fn test_log_channel_records_writes() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = UserDataStore::new(Arc::clone(&kv)).with_log(LogChannel::new(Arc::clone(&kv)));
        store.write("254", DataType::AMOUNT, "1.00").await.unwrap();
        let logged = kv.prefix_scan(&[Partition::Log as u8]).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].1, b"1.00");

        store
            .list_family(DataType::TX_VALUES)
            .write("254", DataType::TX_VALUES, "1:1.00")
            .await
            .unwrap();
        let logged = kv.prefix_scan(&[Partition::Log as u8]).await.unwrap();
        assert_eq!(logged.len(), 2);
    }
}
