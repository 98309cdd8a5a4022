//! The value every handler returns.

/// Content plus flag deltas produced by one handler invocation.
///
/// The engine applies `flag_set` before `flag_reset`, so a bit listed in both
/// ends up clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerResult {
    pub content: String,
    pub flag_set: Vec<u32>,
    pub flag_reset: Vec<u32>,
}

impl HandlerResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn set(mut self, bit: u32) -> Self {
        self.flag_set.push(bit);
        self
    }

    pub fn reset(mut self, bit: u32) -> Self {
        self.flag_reset.push(bit);
        self
    }

    pub fn set_flag(&mut self, bit: u32) {
        self.flag_set.push(bit);
    }

    pub fn reset_flag(&mut self, bit: u32) {
        self.flag_reset.push(bit);
    }

    /// Whether the result would leave `bit` set once applied.
    pub fn leaves_set(&self, bit: u32) -> bool {
        self.flag_set.contains(&bit) && !self.flag_reset.contains(&bit)
    }

    /// Whether the result would leave `bit` clear once applied.
    pub fn leaves_reset(&self, bit: u32) -> bool {
        self.flag_reset.contains(&bit)
    }
}
