//! Snapshot of a session's state and cache, saved once per turn.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::Cache;
use crate::error::StoreError;
use crate::state::State;
use crate::store::keys::state_key;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: State,
    pub cache: Cache,
}

/// Loads and saves [`Snapshot`]s under the state partition.
#[derive(Clone)]
pub struct Persister {
    kv: Arc<dyn KeyValueStore>,
}

impl Persister {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// The saved snapshot, or `None` for a session never seen before.
    pub async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, StoreError> {
        match self.kv.get(&state_key(session_id)).await {
            Ok(raw) => {
                let snapshot: Snapshot = serde_json::from_slice(&raw)?;
                debug!(session_id, path = ?snapshot.state.path(), "snapshot loaded");
                Ok(Some(snapshot))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, session_id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(snapshot)?;
        self.kv.put(&state_key(session_id), &raw).await?;
        debug!(session_id, bytes = raw.len(), "snapshot saved");
        Ok(())
    }
}
