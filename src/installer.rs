//! Installer orchestration
//!
//! Drives one install or upgrade run: fires the lifecycle events in their
//! fixed order around the package transaction and keeps the marker files
//! current for the supervisor.
//!
//! # Step Flow
//!
//! ```text
//! install: PreInstall -> PrepareInstall -> Payload -> PostInstall -> Completed
//! upgrade: Payload -> PostUpgrade -> Completed
//! ```
//!
//! Any failing step ends the run: `install-failed` gets the message, and the
//! error is returned to the caller.

use crate::context::Context;
use crate::error::{InstallerError, Result};
use crate::hooks::{HookEvent, LifecycleHookRunner};
use crate::sentinel::Sentinels;
use strum::Display;
use tracing::{error, info};

/// Steps of an install or upgrade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InstallStep {
    #[strum(serialize = "Checking installation target")]
    PreInstall,
    #[strum(serialize = "Preparing target system")]
    PrepareInstall,
    /// Package transaction, supplied by the caller
    #[strum(serialize = "Installing packages")]
    Payload,
    #[strum(serialize = "Configuring installed system")]
    PostInstall,
    #[strum(serialize = "Updating system configuration")]
    PostUpgrade,
    #[strum(serialize = "Complete")]
    Completed,
}

impl InstallStep {
    pub const INSTALL: &'static [Self] = &[
        Self::PreInstall,
        Self::PrepareInstall,
        Self::Payload,
        Self::PostInstall,
    ];

    pub const UPGRADE: &'static [Self] = &[Self::Payload, Self::PostUpgrade];

    /// Lifecycle event fired by this step, if any.
    pub const fn event(self) -> Option<HookEvent> {
        match self {
            Self::PreInstall => Some(HookEvent::PreInstall),
            Self::PrepareInstall => Some(HookEvent::PrepareInstall),
            Self::PostInstall => Some(HookEvent::PostInstall),
            Self::PostUpgrade => Some(HookEvent::PostUpgrade),
            Self::Payload | Self::Completed => None,
        }
    }

    /// Line written to `install-info` when the step starts.
    pub fn info(self) -> String {
        match self.event() {
            Some(event) => format!("Running {} hooks", event),
            None if self == Self::Payload => "Running package transaction".to_string(),
            None => self.to_string(),
        }
    }

    /// Approximate progress when the step starts.
    pub const fn progress_percent(self) -> u8 {
        match self {
            Self::PreInstall => 0,
            Self::PrepareInstall => 5,
            Self::Payload => 10,
            Self::PostInstall => 85,
            Self::PostUpgrade => 90,
            Self::Completed => 100,
        }
    }
}

/// Runs install and upgrade flows over a hook runner.
pub struct Installer {
    runner: LifecycleHookRunner,
    sentinels: Sentinels,
}

impl Installer {
    pub fn new(runner: LifecycleHookRunner, sentinels: Sentinels) -> Self {
        Self { runner, sentinels }
    }

    pub fn sentinels(&self) -> &Sentinels {
        &self.sentinels
    }

    /// Full installation around `payload`.
    pub fn install<F>(&mut self, ctx: &mut Context, payload: F) -> Result<()>
    where
        F: FnOnce(&mut Context) -> anyhow::Result<()>,
    {
        self.run(InstallStep::INSTALL, ctx, payload)
    }

    /// Upgrade of an installed system around `payload`.
    pub fn upgrade<F>(&mut self, ctx: &mut Context, payload: F) -> Result<()>
    where
        F: FnOnce(&mut Context) -> anyhow::Result<()>,
    {
        self.run(InstallStep::UPGRADE, ctx, payload)
    }

    fn run<F>(&mut self, steps: &[InstallStep], ctx: &mut Context, payload: F) -> Result<()>
    where
        F: FnOnce(&mut Context) -> anyhow::Result<()>,
    {
        self.sentinels.clear()?;
        let mut payload = Some(payload);

        for &step in steps {
            info!("{}", step);
            self.sentinels
                .write_progress(step.progress_percent(), &step.to_string())?;
            self.sentinels.write_info(&step.info())?;

            if let Err(e) = self.run_step(step, ctx, &mut payload) {
                error!("Installation failed at '{}': {}", step, e);
                if let Err(marker) = self.sentinels.mark_failed(&e.to_string()) {
                    error!("Could not record failure in marker: {}", marker);
                }
                return Err(e);
            }
        }

        let done = InstallStep::Completed;
        self.sentinels
            .write_progress(done.progress_percent(), &done.to_string())?;
        self.sentinels.mark_success()?;
        info!("Run completed");
        Ok(())
    }

    fn run_step<F>(
        &mut self,
        step: InstallStep,
        ctx: &mut Context,
        payload: &mut Option<F>,
    ) -> Result<()>
    where
        F: FnOnce(&mut Context) -> anyhow::Result<()>,
    {
        if let Some(event) = step.event() {
            self.runner.fire(event, ctx)?;
            return Ok(());
        }

        if let Some(payload) = payload.take() {
            payload(ctx).map_err(InstallerError::Payload)?;
        }
        Ok(())
    }
}
