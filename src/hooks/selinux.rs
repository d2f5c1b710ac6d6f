//! SELinux relabel request
//!
//! Files laid down by the package transaction carry no labels. Touching
//! `.autorelabel` at the target root makes the first boot relabel the
//! filesystem. Skipped when SELinux is disabled for the target.

use super::{require_mount_dir, HookEvent, HookModule};
use crate::context::{keys, Context};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;
use strum::{Display, EnumString};
use tracing::{info, warn};

const AUTORELABEL: &str = ".autorelabel";

/// SELinux mode of the installed system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SelinuxMode {
    #[default]
    Enforcing,
    Permissive,
    Disabled,
}

#[derive(Debug, Default)]
pub struct Selinux;

impl Selinux {
    fn mode(ctx: &Context) -> SelinuxMode {
        match ctx.get_str(keys::SELINUX) {
            Some(raw) => SelinuxMode::from_str(raw).unwrap_or_else(|_| {
                warn!("Unknown SELinux mode '{}', assuming enforcing", raw);
                SelinuxMode::Enforcing
            }),
            None => SelinuxMode::default(),
        }
    }

    fn request_relabel(&self, ctx: &Context) -> Result<()> {
        let mode = Self::mode(ctx);
        if mode == SelinuxMode::Disabled {
            info!("SELinux disabled on target, no relabel needed");
            return Ok(());
        }

        let root = require_mount_dir(ctx, self.name())?;
        let marker = root.join(AUTORELABEL);
        fs::write(&marker, b"")
            .with_context(|| format!("Failed to create {}", marker.display()))?;
        info!("Requested SELinux relabel on first boot (mode: {})", mode);
        Ok(())
    }
}

impl HookModule for Selinux {
    fn name(&self) -> &str {
        "selinux"
    }

    fn events(&self) -> &[HookEvent] {
        &[HookEvent::PostInstall, HookEvent::PostUpgrade]
    }

    fn post_install(&mut self, ctx: &mut Context) -> Result<()> {
        self.request_relabel(ctx)
    }

    fn post_upgrade(&mut self, ctx: &mut Context) -> Result<()> {
        self.request_relabel(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mode_parsing() {
        let mut ctx = Context::new();
        assert_eq!(Selinux::mode(&ctx), SelinuxMode::Enforcing);

        ctx.insert(keys::SELINUX, "Disabled");
        assert_eq!(Selinux::mode(&ctx), SelinuxMode::Disabled);

        ctx.insert(keys::SELINUX, "bogus");
        assert_eq!(Selinux::mode(&ctx), SelinuxMode::Enforcing);
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut ctx = Context::new();
        ctx.insert(keys::SELINUX, "disabled");
        assert!(Selinux.post_install(&mut ctx).is_ok());
    }

    #[test]
    fn test_touches_autorelabel() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = Context::new();
        ctx.insert(keys::MOUNT_DIR, tmp.path().to_string_lossy().to_string());

        Selinux.post_install(&mut ctx).unwrap();
        assert!(tmp.path().join(AUTORELABEL).exists());
    }
}
