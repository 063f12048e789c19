// Pipeline Module
// An ordered list of steps shared read-only by every repository task

pub mod commands;

pub use commands::{PipelineCommand, PipelineOptions};

use crate::steps::Step;

use std::sync::Arc;

/// Ordered steps applied to every repository of a run.
///
/// A pipeline is built once and wrapped in an `Arc`; the scheduler never
/// mutates it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step (builder style)
    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.push(step);
        self
    }

    /// Append a step
    pub fn push(&mut self, step: impl Step + 'static) {
        self.steps.push(Arc::new(step));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}
