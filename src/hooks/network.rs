//! Network configuration for the installed system
//!
//! Writes `etc/hostname` and one ifcfg file per configured interface. Must be
//! registered before `ntp`: time servers are usually only reachable once the
//! interfaces come up with this configuration.

use super::{require_mount_dir, HookEvent, HookModule};
use crate::context::{keys, Context};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum::{Display, EnumString};
use tracing::{info, warn};

/// Relative to the target root.
const IFCFG_DIR: &str = "etc/sysconfig/network-scripts";

/// Address assignment for an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BootProto {
    #[default]
    Dhcp,
    Static,
}

/// One interface definition as stored under the `interfaces` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub device: String,
    #[serde(default)]
    pub bootproto: BootProto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

impl InterfaceConfig {
    /// Static interfaces need an address and a netmask.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.device.trim().is_empty() || self.device.contains('/') {
            return Err(format!("'{}' is not a valid device name", self.device));
        }
        if self.bootproto == BootProto::Static
            && (self.address.is_none() || self.netmask.is_none())
        {
            return Err(format!(
                "Static interface {} needs an address and a netmask",
                self.device
            ));
        }
        Ok(())
    }

    /// ifcfg file contents.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("DEVICE={}\n", self.device));
        out.push_str(&format!("BOOTPROTO={}\n", self.bootproto));
        out.push_str("ONBOOT=yes\n");
        if self.bootproto == BootProto::Static {
            if let Some(address) = &self.address {
                out.push_str(&format!("IPADDR={}\n", address));
            }
            if let Some(netmask) = &self.netmask {
                out.push_str(&format!("NETMASK={}\n", netmask));
            }
            if let Some(gateway) = &self.gateway {
                out.push_str(&format!("GATEWAY={}\n", gateway));
            }
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct Network;

impl Network {
    fn interfaces(ctx: &Context) -> Result<Vec<InterfaceConfig>> {
        match ctx.get(keys::INTERFACES) {
            Some(value) => serde_json::from_value(value.clone())
                .with_context(|| format!("Invalid '{}' entry in install context", keys::INTERFACES)),
            None => Ok(Vec::new()),
        }
    }

    fn write_interface(root: &Path, iface: &InterfaceConfig) -> Result<()> {
        iface.validate().map_err(anyhow::Error::msg)?;
        let dir = root.join(IFCFG_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join(format!("ifcfg-{}", iface.device));
        fs::write(&path, iface.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Configured interface {} ({})", iface.device, iface.bootproto);
        Ok(())
    }
}

impl HookModule for Network {
    fn name(&self) -> &str {
        "network"
    }

    fn events(&self) -> &[HookEvent] {
        &[HookEvent::PostInstall]
    }

    fn post_install(&mut self, ctx: &mut Context) -> Result<()> {
        let hostname = ctx.get_str(keys::HOSTNAME).map(str::to_string);
        let interfaces = Self::interfaces(ctx)?;
        if hostname.is_none() && interfaces.is_empty() {
            info!("No network settings in context, nothing to configure");
            return Ok(());
        }

        let root = require_mount_dir(ctx, self.name())?;

        if let Some(hostname) = hostname {
            let path = root.join("etc/hostname");
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, format!("{}\n", hostname))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Hostname set to {}", hostname);
        } else {
            warn!("No hostname configured; target keeps its default");
        }

        for iface in &interfaces {
            Self::write_interface(&root, iface)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn ctx_for(root: &Path) -> Context {
        let mut ctx = Context::new();
        ctx.insert(keys::MOUNT_DIR, root.to_string_lossy().to_string());
        ctx
    }

    #[test]
    fn test_noop_without_settings() {
        // No mountDir either: a no-op must not need one
        let mut ctx = Context::new();
        assert!(Network.post_install(&mut ctx).is_ok());
    }

    #[test]
    fn test_writes_hostname_and_ifcfg() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_for(tmp.path());
        ctx.insert(keys::HOSTNAME, "zvm01");
        ctx.insert(
            keys::INTERFACES,
            json!([
                {"device": "enc600", "bootproto": "static", "address": "10.0.0.5",
                 "netmask": "255.255.255.0", "gateway": "10.0.0.1"},
                {"device": "enc700"}
            ]),
        );

        Network.post_install(&mut ctx).unwrap();

        let hostname = fs::read_to_string(tmp.path().join("etc/hostname")).unwrap();
        assert_eq!(hostname, "zvm01\n");

        let ifcfg = fs::read_to_string(tmp.path().join(IFCFG_DIR).join("ifcfg-enc600")).unwrap();
        assert!(ifcfg.contains("BOOTPROTO=static"));
        assert!(ifcfg.contains("IPADDR=10.0.0.5"));
        assert!(ifcfg.contains("GATEWAY=10.0.0.1"));

        let dhcp = fs::read_to_string(tmp.path().join(IFCFG_DIR).join("ifcfg-enc700")).unwrap();
        assert!(dhcp.contains("BOOTPROTO=dhcp"));
        assert!(!dhcp.contains("IPADDR"));
    }

    #[test]
    fn test_render_static() {
        let iface = InterfaceConfig {
            device: "enc600".to_string(),
            bootproto: BootProto::Static,
            address: Some("10.0.0.5".to_string()),
            netmask: Some("255.255.255.0".to_string()),
            gateway: None,
        };
        assert_eq!(
            iface.render(),
            "DEVICE=enc600\nBOOTPROTO=static\nONBOOT=yes\nIPADDR=10.0.0.5\nNETMASK=255.255.255.0\n"
        );
    }

    #[test]
    fn test_static_without_address_fails() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_for(tmp.path());
        ctx.insert(keys::INTERFACES, json!([{"device": "enc600", "bootproto": "static"}]));

        let err = Network.post_install(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("needs an address"));
    }

    #[test]
    fn test_malformed_interfaces_fail() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_for(tmp.path());
        ctx.insert(keys::INTERFACES, json!("enc600"));
        assert!(Network.post_install(&mut ctx).is_err());
    }
}
