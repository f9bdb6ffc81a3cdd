//! Processor System - Filename-Claimed Rule Generators
//!
//! A family probes filenames with `search`. A successful probe yields a
//! configured `Processor` (the claim) that lives for one `process` call.

pub mod imagemagick;

pub use imagemagick::ImageMagick;

use thiserror::Error;

use crate::makefile::{Makefile, MakefileError};
use crate::stack::DependencyStack;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Bad cachedir for image: {filename}")]
    MissingCacheMarker { filename: String },

    #[error("Build description error: {0}")]
    Sink(#[from] MakefileError),
}

/// A booted processor family, held by the registry
pub trait ProcessorFamily {
    fn name(&self) -> &str;

    /// Inspect the filename string only. Must not touch the filesystem.
    fn search(&self, filename: &str) -> Option<Box<dyn Processor>>;
}

/// A claim on one filename
pub trait Processor {
    fn name(&self) -> &str;

    /// Emit the rule fragment for `filename`.
    ///
    /// `stack` must be as it was on entry. Anything written to `makefile`
    /// before an error is rolled back by the pipeline.
    fn process(
        &self,
        filename: &str,
        stack: &mut DependencyStack,
        makefile: &mut Makefile,
    ) -> Result<(), ProcessError>;
}
