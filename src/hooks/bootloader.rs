//! Boot loader kernel command line
//!
//! Writes `etc/kernel/cmdline` from `rootDevice` and `bootArgs`. The boot
//! loader installation itself (zipl or grub) is done by the package scripts
//! and reads this file.

use super::{require_mount_dir, HookEvent, HookModule};
use crate::context::{keys, Context};
use anyhow::{Context as _, Result};
use std::fs;
use tracing::info;

const CMDLINE: &str = "etc/kernel/cmdline";

#[derive(Debug, Default)]
pub struct Bootloader;

/// Kernel command line for a root device plus free-form arguments.
pub fn kernel_cmdline(root_device: &str, extra: Option<&str>) -> String {
    let mut args = vec![format!("root={}", root_device)];
    if let Some(extra) = extra {
        args.extend(
            extra
                .split_whitespace()
                .filter(|arg| !arg.starts_with("root="))
                .map(String::from),
        );
    }
    args.join(" ")
}

impl HookModule for Bootloader {
    fn name(&self) -> &str {
        "bootloader"
    }

    fn events(&self) -> &[HookEvent] {
        &[HookEvent::PostInstall]
    }

    fn post_install(&mut self, ctx: &mut Context) -> Result<()> {
        let Some(root_device) = ctx.get_str(keys::ROOT_DEVICE) else {
            info!("No root device in context, leaving kernel command line alone");
            return Ok(());
        };

        let cmdline = kernel_cmdline(root_device, ctx.get_str(keys::BOOT_ARGS));
        let root = require_mount_dir(ctx, self.name())?;
        let path = root.join(CMDLINE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, format!("{}\n", cmdline))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Kernel command line: {}", cmdline);
        Ok(())
    }
}
