//! Lifecycle hook dispatch
//!
//! Configuration modules act at four fixed points of an install or upgrade
//! run. The orchestrator fires an event; the runner calls every registered
//! module that declares the event, in registration order.
//!
//! # Failure Policy
//!
//! The first failing module aborts the event. Its error is logged with the
//! full chain and returned as a [`HookError`] tagged with phase, module and
//! event. Modules after it do not run.
//!
//! # Ordering
//!
//! Order is caller-defined and significant: `network` must run before `ntp`,
//! and the runner never reorders.

pub mod bootloader;
pub mod network;
pub mod ntp;
pub mod selinux;
pub mod target;

use crate::context::Context;
use crate::error::HookError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, error, info};

/// Named lifecycle points. The string forms are part of the external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HookEvent {
    PreInstall,
    PrepareInstall,
    PostInstall,
    PostUpgrade,
}

impl HookEvent {
    /// The run type this event belongs to.
    pub const fn phase(self) -> Phase {
        match self {
            Self::PreInstall | Self::PrepareInstall | Self::PostInstall => Phase::Install,
            Self::PostUpgrade => Phase::Upgrade,
        }
    }
}

/// Kind of run a hook failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Install,
    Upgrade,
}

/// A configuration module reacting to lifecycle events.
///
/// A module declares the events it handles in [`events`](HookModule::events);
/// the runner only calls those handlers. Every handler defaults to a no-op, and
/// a handler must also succeed as a no-op when the context holds nothing for it
/// to act on.
pub trait HookModule {
    fn name(&self) -> &str;

    /// Events this module handles.
    fn events(&self) -> &[HookEvent];

    fn implements(&self, event: HookEvent) -> bool {
        self.events().contains(&event)
    }

    fn pre_install(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    fn prepare_install(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    fn post_install(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    fn post_upgrade(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Route an event to its handler.
    fn handle(&mut self, event: HookEvent, ctx: &mut Context) -> Result<()> {
        match event {
            HookEvent::PreInstall => self.pre_install(ctx),
            HookEvent::PrepareInstall => self.prepare_install(ctx),
            HookEvent::PostInstall => self.post_install(ctx),
            HookEvent::PostUpgrade => self.post_upgrade(ctx),
        }
    }
}

/// Dispatches lifecycle events to registered modules.
#[derive(Default)]
pub struct LifecycleHookRunner {
    modules: Vec<Box<dyn HookModule>>,
}

impl LifecycleHookRunner {
    pub fn new(modules: Vec<Box<dyn HookModule>>) -> Self {
        Self { modules }
    }

    /// Append a module; it runs after every module registered before it.
    pub fn register(&mut self, module: Box<dyn HookModule>) {
        self.modules.push(module);
    }

    /// Registered module names, in dispatch order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Fire `event` at every module that implements it.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] for the first module that fails; later modules
    /// are not called.
    pub fn fire(&mut self, event: HookEvent, ctx: &mut Context) -> Result<(), HookError> {
        let phase = event.phase();
        info!(%phase, %event, "Firing lifecycle event");

        for module in self.modules.iter_mut().filter(|m| m.implements(event)) {
            debug!(module = module.name(), %event, "running hook");

            if let Err(source) = module.handle(event, ctx) {
                error!(
                    %phase,
                    module = module.name(),
                    %event,
                    "Hook failed: {:?}",
                    source
                );
                return Err(HookError {
                    phase,
                    module: module.name().to_string(),
                    event,
                    source,
                });
            }
        }

        Ok(())
    }
}

/// Target root for modules that need one, or an error naming the module.
pub(crate) fn require_mount_dir(ctx: &Context, module: &str) -> Result<PathBuf> {
    ctx.mount_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "{} needs '{}' in the install context",
            module,
            crate::context::keys::MOUNT_DIR
        )
    })
}

/// The built-in modules in their required order.
pub fn default_modules() -> Vec<Box<dyn HookModule>> {
    vec![
        Box::new(target::TargetRoot::default()),
        Box::new(network::Network::default()),
        Box::new(ntp::Ntp::default()),
        Box::new(selinux::Selinux::default()),
        Box::new(bootloader::Bootloader::default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_event_names_are_exact() {
        let names: Vec<String> = HookEvent::iter().map(|e| e.to_string()).collect();
        assert_eq!(
            names,
            vec!["pre_install", "prepare_install", "post_install", "post_upgrade"]
        );
        for name in &names {
            assert_eq!(HookEvent::from_str(name).unwrap().to_string(), *name);
        }
        assert!(HookEvent::from_str("postinstall").is_err());
    }

    #[test]
    fn test_event_phase() {
        assert_eq!(HookEvent::PreInstall.phase(), Phase::Install);
        assert_eq!(HookEvent::PostInstall.phase(), Phase::Install);
        assert_eq!(HookEvent::PostUpgrade.phase(), Phase::Upgrade);
        assert_eq!(Phase::Upgrade.to_string(), "upgrade");
    }

    #[test]
    fn test_default_module_order() {
        let runner = LifecycleHookRunner::new(default_modules());
        assert_eq!(
            runner.module_names(),
            vec!["target", "network", "ntp", "selinux", "bootloader"]
        );
    }

    #[test]
    fn test_require_mount_dir_message() {
        let ctx = Context::new();
        let err = require_mount_dir(&ctx, "ntp").unwrap_err();
        assert_eq!(err.to_string(), "ntp needs 'mountDir' in the install context");
    }
}
