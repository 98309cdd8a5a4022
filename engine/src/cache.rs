//! Memory cache of handler output, one frame per node on the path.
//!
//! Frames are pushed and popped in lockstep with the state path. The total
//! size of every live fragment never exceeds the configured capacity: when a
//! new fragment does not fit, fragments of older frames are evicted and those
//! frames are marked stale, so that navigating back to them reloads instead
//! of rendering stale bytes.

use serde::{Deserialize, Serialize};

/// Output of one node: `(handler, content)` pairs in load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub symbol: String,
    fragments: Vec<(String, String)>,
    /// Bytes this frame was allowed when its content was stored.
    budget: usize,
    stale: bool,
}

impl Frame {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            fragments: Vec::new(),
            budget: 0,
            stale: false,
        }
    }

    pub fn size(&self) -> usize {
        self.fragments.iter().map(|(_, c)| c.len()).sum()
    }

    /// Content a handler produced for this frame, if any survives.
    pub fn get(&self, handler: &str) -> Option<&str> {
        self.fragments
            .iter()
            .rev()
            .find(|(h, _)| h == handler)
            .map(|(_, c)| c.as_str())
    }

    pub fn fragments(&self) -> &[(String, String)] {
        &self.fragments
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    capacity: usize,
    frames: Vec<Frame>,
}

impl Cache {
    pub fn new(root: &str, capacity: usize) -> Self {
        Self {
            capacity,
            frames: vec![Frame::new(root)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bytes held by every live frame.
    pub fn total(&self) -> usize {
        self.frames.iter().map(Frame::size).sum()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn push(&mut self, symbol: &str) {
        self.frames.push(Frame::new(symbol));
    }

    /// Hand the current frame over to `symbol`, keeping its fragments so a
    /// pass-through node's output is still visible on the screen it leads to.
    pub fn replace_top(&mut self, symbol: &str) {
        match self.frames.last_mut() {
            Some(top) => top.symbol = symbol.to_string(),
            None => self.frames.push(Frame::new(symbol)),
        }
    }

    /// Drop the current frame. The root frame is never popped.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Drop the fragments of the current frame before its node reloads.
    pub fn clear_top(&mut self) {
        if let Some(top) = self.frames.last_mut() {
            top.fragments.clear();
            top.budget = 0;
            top.stale = false;
        }
    }

    /// Record handler output on the current frame.
    ///
    /// The fragment is cut to fit the whole capacity, then older frames are
    /// evicted (oldest first) until everything fits.
    pub fn append(&mut self, handler: &str, content: &str) {
        let Some(top_idx) = self.frames.len().checked_sub(1) else {
            return;
        };
        let own = self.frames[top_idx].size();
        let room = self.capacity.saturating_sub(own);
        let content = truncate_str(content, room).to_string();

        let mut others: usize = self.frames[..top_idx].iter().map(Frame::size).sum();
        let mut i = 0;
        while others + own + content.len() > self.capacity && i < top_idx {
            let evicted = self.frames[i].size();
            if evicted > 0 {
                self.frames[i].fragments.clear();
                self.frames[i].stale = true;
                others -= evicted;
            }
            i += 1;
        }

        let top = &mut self.frames[top_idx];
        top.budget = self.capacity - others;
        top.fragments.push((handler.to_string(), content));
    }

    /// Return to a single empty root frame.
    pub fn reset(&mut self, root: &str) {
        self.frames = vec![Frame::new(root)];
    }
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char
/// boundary.
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
