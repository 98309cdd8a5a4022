//! Per-turn request context handed to every handler.

use crate::error::{EngineError, Result};
use crate::state::FlagSet;

/// What a handler knows about the turn it runs in.
///
/// Built fresh by the engine for every handler call; the flag snapshot
/// reflects every result merged earlier in the same turn.
#[derive(Debug, Clone)]
pub struct Request {
    session_id: String,
    language: String,
    flags: FlagSet,
}

impl Request {
    pub fn new(session_id: impl Into<String>, language: impl Into<String>, flags: FlagSet) -> Self {
        Self {
            session_id: session_id.into(),
            language: language.into(),
            flags,
        }
    }

    /// The session this turn belongs to.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MissingSessionId` if the transport did not supply one.
    pub fn session_id(&self) -> Result<&str> {
        if self.session_id.is_empty() {
            return Err(EngineError::MissingSessionId);
        }
        Ok(&self.session_id)
    }

    /// Rendering language code (`eng`, `swa`).
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_set(&self, bit: u32) -> bool {
        self.flags.is_set(bit)
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_session_id() {
        let req = Request::new("", "eng", FlagSet::new(128));
        assert!(matches!(req.session_id(), Err(EngineError::MissingSessionId)));
        let req = Request::new("+254700000000", "swa", FlagSet::new(128));
        assert_eq!(req.session_id().unwrap(), "+254700000000");
        assert_eq!(req.language(), "swa");
    }
}
