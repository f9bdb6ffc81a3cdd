//! Rule Pipeline - Single Entry Point
//!
//! Dispatches one filename at a time and guarantees that each filename
//! contributes either its whole fragment or nothing.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::Config;
use crate::makefile::{Makefile, MakefileError};
use crate::processor::ProcessError;
use crate::registry::ProcessorRegistry;
use crate::stack::DependencyStack;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{filename}: {source}")]
    Process {
        filename: String,
        #[source]
        source: ProcessError,
    },

    #[error("{filename}: processor {processor} left the dependency stack at depth {found}, expected {expected}")]
    UnbalancedStack {
        filename: String,
        processor: String,
        expected: usize,
        found: usize,
    },

    #[error("Build description error: {0}")]
    Sink(#[from] MakefileError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No registered processor claimed the file
    Unclaimed,
    Emitted { processor: String, targets: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

/// Per-run summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub emitted: Vec<String>,
    pub unclaimed: Vec<String>,
    pub failed: Vec<FileFailure>,
}

impl Report {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct RulePipeline {
    registry: ProcessorRegistry,
    config: Config,
}

impl RulePipeline {
    pub fn new(registry: ProcessorRegistry, config: Config) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Empty build description honoring the configured verbosity
    pub fn makefile(&self) -> Makefile {
        Makefile::new(self.config.verbose)
    }

    /// Emit the fragment for one filename.
    ///
    /// On error the makefile is restored to what it held before the call.
    pub fn generate(
        &self,
        filename: &str,
        stack: &mut DependencyStack,
        makefile: &mut Makefile,
    ) -> Result<Outcome, PipelineError> {
        let Some(processor) = self.registry.dispatch(filename) else {
            debug!(filename, "unclaimed");
            return Ok(Outcome::Unclaimed);
        };
        debug!(filename, processor = processor.name(), "claimed");

        let checkpoint = makefile.checkpoint()?;
        let depth = stack.depth();

        let result = processor
            .process(filename, stack, makefile)
            .and_then(|()| makefile.finish().map_err(ProcessError::from));

        if result.is_ok() && stack.depth() != depth {
            makefile.rollback(checkpoint);
            return Err(PipelineError::UnbalancedStack {
                filename: filename.to_string(),
                processor: processor.name().to_string(),
                expected: depth,
                found: stack.depth(),
            });
        }

        match result {
            Ok(()) => Ok(Outcome::Emitted {
                processor: processor.name().to_string(),
                targets: makefile.since(checkpoint).len(),
            }),
            Err(source) => {
                makefile.rollback(checkpoint);
                Err(PipelineError::Process {
                    filename: filename.to_string(),
                    source,
                })
            }
        }
    }

    /// Process every filename, logging failures and carrying on
    pub fn generate_all<I, S>(&self, filenames: I, makefile: &mut Makefile) -> Report
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = Report::default();

        for filename in filenames {
            let filename = filename.as_ref();
            let mut stack = DependencyStack::new();

            match self.generate(filename, &mut stack, makefile) {
                Ok(Outcome::Emitted { .. }) => report.emitted.push(filename.to_string()),
                Ok(Outcome::Unclaimed) if self.config.strict => {
                    error!(filename, "no processor claims this file");
                    report.failed.push(FileFailure {
                        filename: filename.to_string(),
                        error: "unclaimed".to_string(),
                    });
                }
                Ok(Outcome::Unclaimed) => report.unclaimed.push(filename.to_string()),
                Err(e) => {
                    error!(filename, error = %e, "skipping file");
                    report.failed.push(FileFailure {
                        filename: filename.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

impl Default for RulePipeline {
    fn default() -> Self {
        Self::new(ProcessorRegistry::boot(), Config::default())
    }
}
