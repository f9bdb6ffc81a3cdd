//! Tek Rules - Build-Rule Generation from Filenames
//!
//! A filename goes in; a makefile fragment comes out. Nothing is built here.
//!
//! 1. The registry asks each processor family, in registration order,
//!    whether it claims the filename.
//! 2. The claim derives every related path from the filename alone.
//! 3. The claim emits targets, prerequisites and commands into the makefile.

pub mod config;
pub mod digest;
pub mod makefile;
pub mod paths;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod stack;

pub use config::{Config, ConfigError};
pub use digest::{description_digest, sha256_hex};
pub use makefile::{Command, Makefile, MakefileError, Target};
pub use pipeline::{Outcome, PipelineError, Report, RulePipeline};
pub use processor::{ImageMagick, ProcessError, Processor, ProcessorFamily};
pub use registry::ProcessorRegistry;
pub use stack::DependencyStack;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path segment every cached, derived filename contains
pub const CACHE_MARKER: &str = ".tek_cache/";
