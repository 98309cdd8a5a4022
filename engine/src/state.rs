//! Per-session execution state.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::result::HandlerResult;

/// Fixed-capacity bitset of engine and application flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    capacity: u32,
    bits: Vec<u8>,
}

impl FlagSet {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            bits: vec![0; capacity.div_ceil(8) as usize],
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn check(&self, index: u32) -> Result<()> {
        if index >= self.capacity {
            return Err(EngineError::FlagOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn set(&mut self, index: u32) -> Result<()> {
        self.check(index)?;
        self.bits[(index / 8) as usize] |= 1 << (index % 8);
        Ok(())
    }

    pub fn reset(&mut self, index: u32) -> Result<()> {
        self.check(index)?;
        self.bits[(index / 8) as usize] &= !(1 << (index % 8));
        Ok(())
    }

    /// Whether a bit is set. Bits beyond capacity read as unset.
    pub fn is_set(&self, index: u32) -> bool {
        if index >= self.capacity {
            return false;
        }
        self.bits[(index / 8) as usize] & (1 << (index % 8)) != 0
    }

    /// Indices of all set bits, ascending.
    pub fn iter_set(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.capacity).filter(|&i| self.is_set(i))
    }
}

/// Execution state of one session: where it is in the menu and which flags
/// are raised. Snapshotted to the store at the end of every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    path: Vec<String>,
    flags: FlagSet,
    history: Vec<String>,
    language: Option<String>,
    debug: bool,
}

/// Inputs kept for back navigation and debugging.
const MAX_HISTORY: usize = 32;

impl State {
    pub fn new(root: &str, flag_count: u32) -> Self {
        Self {
            path: vec![root.to_string()],
            flags: FlagSet::new(flag_count),
            history: Vec::new(),
            language: None,
            debug: false,
        }
    }

    /// Symbol of the current node.
    pub fn current(&self) -> &str {
        // The path is never empty.
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn push(&mut self, symbol: &str) {
        self.path.push(symbol.to_string());
    }

    /// Replace the current node without growing the path.
    pub fn replace_top(&mut self, symbol: &str) {
        match self.path.last_mut() {
            Some(top) => *top = symbol.to_string(),
            None => self.path.push(symbol.to_string()),
        }
    }

    /// Drop the current node. The root is never popped.
    pub fn pop(&mut self) -> Option<String> {
        if self.path.len() > 1 {
            self.path.pop()
        } else {
            None
        }
    }

    /// Return to `root`, clearing history and engine flags. Application
    /// flags survive; handlers own them.
    pub fn reset_to(&mut self, root: &str) {
        self.path = vec![root.to_string()];
        self.history.clear();
        for bit in 0..crate::flags::USERFLAG_START.min(self.flags.capacity()) {
            // In range by construction.
            let _ = self.flags.reset(bit);
        }
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn set_flag(&mut self, index: u32) -> Result<()> {
        self.flags.set(index)
    }

    pub fn reset_flag(&mut self, index: u32) -> Result<()> {
        self.flags.reset(index)
    }

    pub fn is_set(&self, index: u32) -> bool {
        self.flags.is_set(index)
    }

    /// Merge a handler result: every bit in `flag_set` is raised, then every
    /// bit in `flag_reset` is cleared, so a bit named in both ends up clear.
    pub fn apply(&mut self, result: &HandlerResult) -> Result<()> {
        for &bit in &result.flag_set {
            self.flags.set(bit)?;
        }
        for &bit in &result.flag_reset {
            self.flags.reset(bit)?;
        }
        Ok(())
    }

    pub fn append_input(&mut self, input: &str) {
        if self.history.len() == MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(input.to_string());
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, code: &str) {
        self.language = Some(code.to_string());
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flagset_bounds() {
        let mut flags = FlagSet::new(128);
        flags.set(0).unwrap();
        flags.set(127).unwrap();
        assert!(flags.is_set(127));
        assert!(flags.set(128).is_err());
        assert!(!flags.is_set(500));
        assert_eq!(flags.iter_set().collect::<Vec<_>>(), vec![0, 127]);
    }

    #[test]
    fn test_apply_set_then_reset() {
        let mut state = State::new("root", 128);
        let res = HandlerResult {
            content: String::new(),
            flag_set: vec![20, 21],
            flag_reset: vec![21, 22],
        };
        state.set_flag(22).unwrap();
        state.apply(&res).unwrap();
        assert!(state.is_set(20));
        assert!(!state.is_set(21));
        assert!(!state.is_set(22));
    }

    #[test]
    fn test_path_never_empty() {
        let mut state = State::new("root", 128);
        assert_eq!(state.pop(), None);
        state.push("main");
        state.replace_top("send");
        assert_eq!(state.path(), &["root".to_string(), "send".to_string()]);
        assert_eq!(state.pop().as_deref(), Some("send"));
        assert_eq!(state.current(), "root");
    }

    #[test]
    fn test_reset_keeps_application_flags() {
        let mut state = State::new("root", 128);
        state.push("main");
        state.set_flag(crate::flags::FLAG_TERMINATE).unwrap();
        state.set_flag(30).unwrap();
        state.append_input("1");
        state.reset_to("root");
        assert_eq!(state.current(), "root");
        assert_eq!(state.depth(), 1);
        assert!(!state.is_set(crate::flags::FLAG_TERMINATE));
        assert!(state.is_set(30));
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = State::new("root", 128);
        for i in 0..40 {
            state.append_input(&i.to_string());
        }
        assert_eq!(state.history().len(), MAX_HISTORY);
        assert_eq!(state.history()[0], "8");
    }

    #[test]
    fn test_serde_round_trip() {
        let mut state = State::new("root", 128);
        state.push("main");
        state.set_flag(40).unwrap();
        state.set_language("swa");
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
