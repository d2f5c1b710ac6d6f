//! NTP server configuration
//!
//! Writes the servers from `ntpservers` into the target's `etc/ntp.conf`, on
//! install and again on upgrade so a changed server list is picked up.

use super::{require_mount_dir, HookEvent, HookModule};
use crate::context::Context;
use anyhow::{Context as _, Result};
use std::fs;
use tracing::info;

const NTP_CONF: &str = "etc/ntp.conf";

#[derive(Debug, Default)]
pub struct Ntp;

impl Ntp {
    fn write_config(&self, ctx: &Context) -> Result<()> {
        let servers = ctx.ntp_servers();
        if servers.is_empty() {
            info!("No NTP servers configured, skipping");
            return Ok(());
        }

        let root = require_mount_dir(ctx, self.name())?;
        let path = root.join(NTP_CONF);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, render(&servers))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} NTP server(s) to {}", servers.len(), path.display());
        Ok(())
    }
}

fn render(servers: &[String]) -> String {
    let mut out = String::from("driftfile /var/lib/ntp/drift\n");
    for server in servers {
        out.push_str(&format!("server {} iburst\n", server));
    }
    out
}

impl HookModule for Ntp {
    fn name(&self) -> &str {
        "ntp"
    }

    fn events(&self) -> &[HookEvent] {
        &[HookEvent::PostInstall, HookEvent::PostUpgrade]
    }

    fn post_install(&mut self, ctx: &mut Context) -> Result<()> {
        self.write_config(ctx)
    }

    fn post_upgrade(&mut self, ctx: &mut Context) -> Result<()> {
        self.write_config(ctx)
    }
}
