//! Target root checks
//!
//! Runs first. Before the install it makes sure the context names a target
//! root; during prepare it creates the root and `etc/` so later modules can
//! write configuration without caring whether the directories exist yet.

use super::{require_mount_dir, HookEvent, HookModule};
use crate::context::Context;
use anyhow::{Context as _, Result};
use std::fs;
use tracing::info;

#[derive(Debug, Default)]
pub struct TargetRoot;

impl HookModule for TargetRoot {
    fn name(&self) -> &str {
        "target"
    }

    fn events(&self) -> &[HookEvent] {
        &[HookEvent::PreInstall, HookEvent::PrepareInstall]
    }

    fn pre_install(&mut self, ctx: &mut Context) -> Result<()> {
        let root = require_mount_dir(ctx, self.name())?;
        if !root.is_absolute() {
            anyhow::bail!("Target root {} is not an absolute path", root.display());
        }
        info!("Install target: {}", root.display());
        Ok(())
    }

    fn prepare_install(&mut self, ctx: &mut Context) -> Result<()> {
        let root = require_mount_dir(ctx, self.name())?;
        let etc = root.join("etc");
        fs::create_dir_all(&etc)
            .with_context(|| format!("Failed to create {}", etc.display()))?;
        info!("Prepared target root {}", root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::keys;
    use tempfile::TempDir;

    #[test]
    fn test_pre_install_requires_mount_dir() {
        let mut ctx = Context::new();
        assert!(TargetRoot.pre_install(&mut ctx).is_err());

        ctx.insert(keys::MOUNT_DIR, "relative/root");
        assert!(TargetRoot.pre_install(&mut ctx).is_err());

        ctx.insert(keys::MOUNT_DIR, "/mnt/sysimage");
        assert!(TargetRoot.pre_install(&mut ctx).is_ok());
    }

    #[test]
    fn test_prepare_creates_etc() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("sysimage");
        let mut ctx = Context::new();
        ctx.insert(keys::MOUNT_DIR, root.to_string_lossy().to_string());

        TargetRoot.prepare_install(&mut ctx).unwrap();
        assert!(root.join("etc").is_dir());
    }
}
