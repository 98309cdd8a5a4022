use thiserror::Error;

/// Failures of the key-value layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("rocksdb error: {0}")]
    Db(#[from] rocksdb::Error),

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn not_found(key: &[u8]) -> Self {
        StoreError::NotFound {
            key: hex::encode(key),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Failures talking to the remote account and data services.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("api error: {description}")]
    Api { description: String },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Turn-level failures of the menu engine and its handlers.
///
/// Input validation problems and remote service failures are not errors at
/// this level: handlers turn them into flags. Everything here aborts the turn
/// without persisting state.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("unknown menu node: {0}")]
    UnknownNode(String),

    #[error("unknown handler: {0}")]
    UnknownHandler(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("flag {index} out of range (capacity {capacity})")]
    FlagOutOfRange { index: u32, capacity: u32 },

    #[error("session id missing from request")]
    MissingSessionId,

    #[error("data error encountered: {0}")]
    Data(String),

    #[error("decimal error: {0}")]
    Decimal(String),

    #[error("pin error: {0}")]
    Pin(String),

    #[error("menu error: {0}")]
    Menu(String),

    #[error("flag table error: {0}")]
    FlagTable(String),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("turn cancelled")]
    Cancelled,
}

impl From<rust_decimal::Error> for EngineError {
    fn from(e: rust_decimal::Error) -> Self {
        EngineError::Decimal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
