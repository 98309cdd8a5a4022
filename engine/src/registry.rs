//! Name to handler table consulted by the menu engine.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::request::Request;
use crate::result::HandlerResult;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HandlerResult>> + Send>>;

/// A handler receives the turn's request, the symbol of the node it runs
/// for, and the user input.
pub type HandlerFn = dyn Fn(Request, String, String) -> HandlerFuture + Send + Sync;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<HandlerFn>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`, replacing any previous handler.
    pub fn register<F, Fut>(&mut self, name: &str, f: F)
    where
        F: Fn(Request, String, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerResult>> + Send + 'static,
    {
        let handler: Arc<HandlerFn> = Arc::new(move |req, sym, input| Box::pin(f(req, sym, input)));
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke a handler by name.
    pub async fn call(
        &self,
        name: &str,
        req: Request,
        symbol: &str,
        input: &str,
    ) -> Result<HandlerResult> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| EngineError::UnknownHandler(name.to_string()))?;
        handler(req, symbol.to_string(), input.to_string()).await
    }
}
