//! Processor Registry - Ordered First-Claim Dispatch
//!
//! Families are registered once at startup and queried in registration
//! order. The first family whose `search` claims a filename wins, so the
//! order of `register` calls decides which rules get emitted.

use tracing::debug;

use crate::processor::{ImageMagick, Processor, ProcessorFamily};

pub struct ProcessorRegistry {
    families: Vec<Box<dyn ProcessorFamily>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self { families: vec![] }
    }

    /// Registry holding every built-in family
    pub fn boot() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ImageMagick::boot()));
        registry
    }

    pub fn register(&mut self, family: Box<dyn ProcessorFamily>) {
        debug!(family = family.name(), position = self.families.len(), "registered processor");
        self.families.push(family);
    }

    /// Ask each family in turn; `None` means nobody claimed the file
    pub fn dispatch(&self, filename: &str) -> Option<Box<dyn Processor>> {
        self.families.iter().find_map(|f| f.search(filename))
    }

    /// Family names in dispatch order
    pub fn names(&self) -> Vec<&str> {
        self.families.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::boot()
    }
}
