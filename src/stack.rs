//! Dependency Stack
//!
//! Chain of targets currently being built. Owned by the caller and passed
//! through processors; a processor may push its own frame but must pop it
//! before returning.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyStack {
    frames: Vec<String>,
}

impl DependencyStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: impl Into<String>) {
        self.frames.push(target.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    /// Innermost target
    pub fn top(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether `target` is already in progress somewhere up the chain
    pub fn contains(&self, target: &str) -> bool {
        self.frames.iter().any(|f| f == target)
    }

    /// Outermost first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(String::as_str)
    }
}
