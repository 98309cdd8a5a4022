//! Wiring of the complete self-service application.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{AppConfig, EngineConfig};
use crate::engine::MenuSystem;
use crate::error::Result;
use crate::flags::FlagManager;
use crate::handlers::{register_all, MenuHandlers};
use crate::menu::app::app_menu;
use crate::registry::HandlerRegistry;
use crate::services::AccountService;
use crate::session::SessionLoop;
use crate::store::{KeyValueStore, LogChannel, UserDataStore};

/// Build the menu system: flag table, handlers, menu tree.
///
/// User data, its advisory write log and session snapshots share `store`
/// under separate partitions.
///
/// # Errors
///
/// Fails if the menu references unknown flags, nodes or handlers, or if the
/// flag table does not fit `engine.flag_count`.
pub fn build_menu_system(
    engine: EngineConfig,
    app: AppConfig,
    store: Arc<dyn KeyValueStore>,
    service: Arc<dyn AccountService>,
) -> Result<Arc<MenuSystem>> {
    let flags = Arc::new(FlagManager::builtin()?);
    let default_language = app.default_language.clone();
    let handlers = Arc::new(MenuHandlers::new(
        UserDataStore::new(Arc::clone(&store)).with_log(LogChannel::new(store)),
        Arc::clone(&flags),
        service,
        app,
        &engine.menu_separator,
    ));

    let mut registry = HandlerRegistry::new();
    register_all(handlers, &mut registry);
    let tree = app_menu(&flags)?;
    info!(
        nodes = tree.len(),
        handlers = registry.len(),
        flags = flags.len(),
        "menu loaded"
    );

    let system = MenuSystem::new(engine, tree, registry, &flags, &default_language)?;
    Ok(Arc::new(system))
}

/// Build a session loop over a fresh menu system, cancelled by `cancel`.
///
/// # Errors
///
/// See [`build_menu_system`].
pub fn build_session_loop(
    engine: EngineConfig,
    app: AppConfig,
    store: Arc<dyn KeyValueStore>,
    service: Arc<dyn AccountService>,
    cancel: CancellationToken,
) -> Result<SessionLoop> {
    let system = build_menu_system(engine, app, Arc::clone(&store), service)?;
    Ok(SessionLoop::with_cancel(system, store, cancel))
}
