//! The common capability every pipeline stage implements.
//!
//! Each stage is a small configuration value (threshold, tolerances,
//! canvas size) that transforms one typed intermediate into the next.
//! Stages are composed in-process by
//! [`crate::diagnostics::process_staged_with_diagnostics`]; an
//! external tool, if one is ever needed, belongs behind an adapter that
//! implements this same trait.

use crate::types::PipelineError;

/// A pure transformation from `Input` to [`Stage::Output`].
///
/// Implementations must not mutate their input and must be
/// deterministic: the same input always yields the same output.
pub trait Stage<Input> {
    /// What the stage produces.
    type Output;

    /// Short stage name, used as the label in diagnostics reports.
    fn name(&self) -> &'static str;

    /// Run the stage.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the input cannot be processed.
    /// Stages fed by a previous stage's output are total in practice.
    fn run(&self, input: Input) -> Result<Self::Output, PipelineError>;
}
