//! Symbolic flag names and their bit indices.
//!
//! The table is loaded once from a CSV definition with lines of the form
//! `flag,<name>,<index>[,<description>]` and is read-only afterwards. Bits
//! below [`USERFLAG_START`] belong to the engine.

use std::collections::HashMap;

use crate::error::{EngineError, Result};

/// An input edge matched on the last turn.
pub const FLAG_INMATCH: u32 = 1;
/// The session ended on the last turn.
pub const FLAG_TERMINATE: u32 = 2;
/// The engine is waiting for input.
pub const FLAG_WAIT: u32 = 3;
/// The rendering language changed; the handler content carries the code.
pub const FLAG_LANG: u32 = 4;
/// First bit available to application flags.
pub const USERFLAG_START: u32 = 16;

/// Flag definitions shipped with the application menu.
pub const BUILTIN_FLAGS: &str = include_str!("../resources/flags.csv");

/// Read-only `name -> bit index` table.
#[derive(Debug, Clone, Default)]
pub struct FlagManager {
    by_name: HashMap<String, u32>,
}

impl FlagManager {
    /// The application flag table.
    pub fn builtin() -> Result<Self> {
        Self::from_csv(BUILTIN_FLAGS)
    }

    /// Parse a CSV flag definition. Blank lines and `#` comments are skipped.
    pub fn from_csv(source: &str) -> Result<Self> {
        let mut by_name = HashMap::new();
        let mut taken = HashMap::new();
        for (lineno, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.splitn(4, ',').map(str::trim).collect();
            if fields.len() < 3 || fields[0] != "flag" {
                return Err(EngineError::FlagTable(format!(
                    "line {}: expected flag,<name>,<index>",
                    lineno + 1
                )));
            }
            let name = fields[1];
            let index: u32 = fields[2].parse().map_err(|_| {
                EngineError::FlagTable(format!("line {}: bad index {:?}", lineno + 1, fields[2]))
            })?;
            if index < USERFLAG_START {
                return Err(EngineError::FlagTable(format!(
                    "line {}: {name} uses reserved bit {index}",
                    lineno + 1
                )));
            }
            if let Some(other) = taken.insert(index, name.to_string()) {
                return Err(EngineError::FlagTable(format!(
                    "line {}: bit {index} already used by {other}",
                    lineno + 1
                )));
            }
            if by_name.insert(name.to_string(), index).is_some() {
                return Err(EngineError::FlagTable(format!(
                    "line {}: duplicate flag {name}",
                    lineno + 1
                )));
            }
        }
        Ok(Self { by_name })
    }

    /// Bit index of a named flag.
    pub fn get(&self, name: &str) -> Result<u32> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownFlag(name.to_string()))
    }

    /// Name of a bit, if it is defined.
    pub fn name_of(&self, index: u32) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, &i)| i == index)
            .map(|(n, _)| n.as_str())
    }

    /// Highest defined bit index plus one.
    pub fn required_capacity(&self) -> u32 {
        self.by_name
            .values()
            .max()
            .map(|m| m + 1)
            .unwrap_or(USERFLAG_START)
    }

    /// Check that every defined flag fits a bitset of `capacity` bits.
    pub fn validate(&self, capacity: u32) -> Result<()> {
        let needed = self.required_capacity();
        if needed > capacity {
            return Err(EngineError::FlagOutOfRange {
                index: needed - 1,
                capacity,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
