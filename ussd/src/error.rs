use thiserror::Error;
use ussd_engine::{EngineError, ServiceError, StoreError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
