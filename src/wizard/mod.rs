//! Linear wizard navigation
//!
//! The wizard is an ordered list of steps walked by index. Each step returns
//! exactly one [`ScreenResult`] per invocation:
//!
//! ```text
//! Forward(data) -> merge data into the context, index + 1 (past the end = Completed)
//! Back          -> index - 1 (before the first step = Aborted)
//! Exit          -> stop immediately (Exited)
//! Repeat        -> run the same step again
//! ```
//!
//! The controller never catches step errors; they propagate to the caller,
//! which decides whether the whole run is over.

pub mod screens;

use crate::context::Context;
use anyhow::Result;
use serde_json::{Map, Value};
use strum::Display;
use tracing::{debug, info};

/// Navigation outcome of a single step invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenResult {
    /// Accept the step; the payload is merged into the context.
    Forward(Map<String, Value>),
    /// Return to the previous step.
    Back,
    /// Leave the wizard, skipping all remaining steps.
    Exit,
    /// Run the same step again (validation failed).
    Repeat,
}

impl ScreenResult {
    /// Forward with no payload.
    pub fn next() -> Self {
        Self::Forward(Map::new())
    }

    /// Forward with a single key/value payload.
    pub fn forward_with(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut data = Map::new();
        data.insert(key.into(), value.into());
        Self::Forward(data)
    }
}

/// A wizard screen or scripted step.
pub trait Step {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Run the step once against the shared context.
    fn run(&mut self, ctx: &mut Context) -> Result<ScreenResult>;
}

/// Final status of a wizard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WizardOutcome {
    /// Walked forward past the last step.
    #[strum(serialize = "success")]
    Completed,
    /// Walked back past the first step.
    #[strum(serialize = "aborted")]
    Aborted,
    /// A step returned `Exit`.
    #[strum(serialize = "exited")]
    Exited,
}

/// Walks an ordered sequence of steps.
pub struct WizardController {
    steps: Vec<Box<dyn Step>>,
}

impl WizardController {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step identifiers in order.
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    /// Run the wizard from the first step until it completes, aborts or exits.
    ///
    /// # Errors
    ///
    /// Any error returned by a step is returned unchanged; the context keeps
    /// whatever earlier steps merged into it.
    pub fn run(&mut self, ctx: &mut Context) -> Result<WizardOutcome> {
        let total = self.steps.len();
        let mut index = 0usize;

        while index < total {
            let step = &mut self.steps[index];
            let result = step.run(ctx)?;
            debug!(step = step.id(), index, ?result, "wizard step finished");

            match result {
                ScreenResult::Forward(data) => {
                    ctx.merge(data);
                    index += 1;
                }
                ScreenResult::Back => {
                    if index == 0 {
                        info!("Wizard aborted at first step");
                        return Ok(WizardOutcome::Aborted);
                    }
                    index -= 1;
                }
                ScreenResult::Exit => {
                    info!(step = step.id(), "Wizard exited");
                    return Ok(WizardOutcome::Exited);
                }
                ScreenResult::Repeat => {}
            }
        }

        info!("Wizard completed ({} steps)", total);
        Ok(WizardOutcome::Completed)
    }
}

/// Adapts a closure into a [`Step`].
pub struct FnStep<F> {
    id: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: FnMut(&mut Context) -> Result<ScreenResult>,
{
    pub fn new(id: impl Into<String>, func: F) -> Self {
        Self { id: id.into(), func }
    }
}

impl<F> Step for FnStep<F>
where
    F: FnMut(&mut Context) -> Result<ScreenResult>,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&mut self, ctx: &mut Context) -> Result<ScreenResult> {
        (self.func)(ctx)
    }
}
