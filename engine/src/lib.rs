pub mod app;
pub mod cache;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod flags;
pub mod handlers;
pub mod l10n;
pub mod menu;
pub mod persist;
pub mod pin;
pub mod profile;
pub mod registry;
pub mod request;
pub mod result;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
pub mod testing;
pub mod validate;

// ---- Top-level re-exports for ergonomic usage ----

// Wiring
pub use app::{build_menu_system, build_session_loop};
pub use config::{AppConfig, EngineConfig};
pub use error::{EngineError, Result, ServiceError, StoreError};

// Engine
pub use engine::{Engine, MenuSystem};
pub use flags::FlagManager;
pub use menu::{MenuTree, Node, NodeBuilder, Target};
pub use registry::HandlerRegistry;
pub use request::Request;
pub use result::HandlerResult;
pub use session::{SessionLoop, TurnOutput};
pub use state::{FlagSet, State};

// Storage
pub use persist::{Persister, Snapshot};
pub use store::{DataType, KeyValueStore, MemoryStore, RocksDbStore, UserDataStore};

// Services
pub use services::{AccountService, HttpAccountService};
pub use testing::FakeAccountService;
