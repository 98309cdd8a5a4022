//! Per-turn orchestration shared by every transport adapter.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::{Engine, MenuSystem};
use crate::error::{EngineError, Result};
use crate::persist::Persister;
use crate::store::KeyValueStore;

/// What a transport sends back for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutput {
    pub content: String,
    /// The session ended; the next input starts over at the root.
    pub terminal: bool,
}

/// Runs turns: load snapshot, execute, render, reset if terminal, save.
///
/// Turns of different sessions run in parallel. Turns of one session are
/// serialized by a per-session lock held from load to save.
pub struct SessionLoop {
    system: Arc<MenuSystem>,
    persister: Persister,
    store: Arc<dyn KeyValueStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    cancel: CancellationToken,
}

impl SessionLoop {
    pub fn new(system: Arc<MenuSystem>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_cancel(system, store, CancellationToken::new())
    }

    /// Tie the loop to an existing shutdown token.
    pub fn with_cancel(
        system: Arc<MenuSystem>,
        store: Arc<dyn KeyValueStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            system,
            persister: Persister::new(Arc::clone(&store)),
            store,
            locks: Mutex::new(HashMap::new()),
            cancel,
        }
    }

    pub fn system(&self) -> &Arc<MenuSystem> {
        &self.system
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn lock_for(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    fn release(&self, session_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        // One reference in the map plus ours: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(session_id);
        }
    }

    /// Run one turn for `session_id`.
    ///
    /// # Errors
    ///
    /// Any error, including cancellation through [`SessionLoop::shutdown`],
    /// leaves the persisted snapshot untouched.
    pub async fn handle(&self, session_id: &str, input: &str) -> Result<TurnOutput> {
        if session_id.is_empty() {
            return Err(EngineError::MissingSessionId);
        }
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let lock = self.lock_for(session_id);
        let result = {
            let _guard = lock.lock().await;
            tokio::select! {
                _ = self.cancel.cancelled() => Err(EngineError::Cancelled),
                res = self.turn(session_id, input) => res,
            }
        };
        self.release(session_id, lock);

        match &result {
            Ok(out) => info!(session_id, terminal = out.terminal, bytes = out.content.len(), "turn complete"),
            Err(e) => warn!(session_id, error = %e, "turn failed"),
        }
        result
    }

    async fn turn(&self, session_id: &str, input: &str) -> Result<TurnOutput> {
        let snapshot = self.persister.load(session_id).await?;
        let mut engine = Engine::new(Arc::clone(&self.system), session_id, snapshot);
        let more = engine.exec(input).await?;
        let mut out = Vec::new();
        engine.flush(&mut out)?;
        if !more {
            engine.reset();
        }
        self.persister.save(session_id, &engine.snapshot()).await?;
        Ok(TurnOutput {
            content: String::from_utf8_lossy(&out).into_owned(),
            terminal: !more,
        })
    }

    /// Cancel in-flight turns and close the store.
    pub async fn shutdown(&self) -> Result<()> {
        info!("session loop shutting down");
        self.cancel.cancel();
        self.store.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::flags::FlagManager;
    use crate::menu::{go, MenuTree, NodeBuilder};
    use crate::registry::HandlerRegistry;
    use crate::result::HandlerResult;
    use crate::store::MemoryStore;

    fn looped() -> (SessionLoop, Arc<MemoryStore>) {
        let flags = FlagManager::from_csv("").unwrap();
        let mut registry = HandlerRegistry::new();
        registry.register("count", |_req, _sym, input| async move {
            Ok(HandlerResult::with_content(format!("got {input}")))
        });
        let mut tree = MenuTree::new("root");
        tree.insert(
            NodeBuilder::new(&flags, "root")
                .text("Welcome", "Karibu")
                .item("1", "Next", "Endelea", go("next"))
                .item("9", "Quit", "Ondoka", go("quit"))
                .build()
                .unwrap(),
        )
        .unwrap();
        tree.insert(
            NodeBuilder::new(&flags, "next")
                .load("count")
                .text("{count}", "{count}")
                .build()
                .unwrap(),
        )
        .unwrap();
        tree.insert(
            NodeBuilder::new(&flags, "quit")
                .text("Bye", "Kwaheri")
                .terminal()
                .build()
                .unwrap(),
        )
        .unwrap();
        let system = MenuSystem::new(EngineConfig::default(), tree, registry, &flags, "eng").unwrap();
        let store = Arc::new(MemoryStore::new());
        let kv: Arc<dyn KeyValueStore> = store.clone();
        (SessionLoop::new(Arc::new(system), kv), store)
    }

    #[tokio::test]
    async fn test_turns_resume_from_snapshot() {
        let (sessions, _) = looped();
        let out = sessions.handle("254", "").await.unwrap();
        assert_eq!(out.content, "Welcome\n1:Next\n9:Quit");
        let out = sessions.handle("254", "1").await.unwrap();
        assert_eq!(out.content, "got 1");
        assert!(!out.terminal);
    }

    #[tokio::test]
    async fn test_terminal_turn_resets() {
        let (sessions, _) = looped();
        sessions.handle("254", "").await.unwrap();
        let out = sessions.handle("254", "9").await.unwrap();
        assert!(out.terminal);
        assert_eq!(out.content, "Bye");
        let out = sessions.handle("254", "1").await.unwrap();
        assert_eq!(out.content, "Welcome\n1:Next\n9:Quit");
    }

    #[tokio::test]
    async fn test_missing_session_id() {
        let (sessions, _) = looped();
        assert!(matches!(
            sessions.handle("", "").await,
            Err(EngineError::MissingSessionId)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_and_closes() {
        let (sessions, store) = looped();
        sessions.handle("254", "").await.unwrap();
        sessions.shutdown().await.unwrap();
        assert!(matches!(
            sessions.handle("254", "1").await,
            Err(EngineError::Cancelled)
        ));
        assert!(store.put(b"k", b"v").await.is_err());
    }

    #[tokio::test]
    async fn test_locks_are_released() {
        let (sessions, _) = looped();
        sessions.handle("254", "").await.unwrap();
        sessions.handle("255", "").await.unwrap();
        assert!(sessions.locks.lock().is_empty());
    }
}
