//! Installation answer files for saving and loading unattended runs.
//!
//! An answer file holds everything the interactive screens would otherwise
//! ask for. Loading one and calling [`InstallationConfig::to_context`] seeds
//! the install context exactly the way the wizard would.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::context::{keys, Context};
use crate::hooks::network::InterfaceConfig;
use crate::hooks::selinux::SelinuxMode;
use crate::partition::{str_to_size, validate_mountpoint, SizeUnit};
use crate::wizard::screens::{validate_hostname, PartitionRequest};

/// One partition line of an answer file, e.g. `{"mountpoint": "/boot", "size": "512M"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub mountpoint: String,
    /// Size string; a bare number is MiB.
    pub size: String,
}

/// Installation configuration that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationConfig {
    // Target
    pub mount_dir: String, // Installed system root, e.g. /mnt/sysimage
    pub root_device: String,
    pub boot_args: String,
    pub partitions: Vec<PartitionSpec>,

    // Network
    pub hostname: String,
    pub interfaces: Vec<InterfaceConfig>,
    pub ntp_servers: Vec<String>,

    // Security
    pub selinux: SelinuxMode,
}

impl InstallationConfig {
    /// Create a new empty configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mount_dir = self.mount_dir.trim();
        if mount_dir.is_empty() {
            anyhow::bail!("Mount directory must be specified");
        }
        if !mount_dir.starts_with('/') {
            anyhow::bail!("Mount directory must be an absolute path");
        }

        if !self.hostname.is_empty() {
            validate_hostname(&self.hostname).map_err(anyhow::Error::msg)?;
        }

        for iface in &self.interfaces {
            iface.validate().map_err(anyhow::Error::msg)?;
        }

        if self
            .ntp_servers
            .iter()
            .any(|s| s.trim().is_empty() || s.contains(char::is_whitespace))
        {
            anyhow::bail!("NTP server entries cannot be empty or contain whitespace");
        }

        self.partition_requests()?;

        Ok(())
    }

    /// Partition lines parsed and checked against each other.
    pub fn partition_requests(&self) -> Result<Vec<PartitionRequest>> {
        let mut requests: Vec<PartitionRequest> = Vec::with_capacity(self.partitions.len());
        for spec in &self.partitions {
            let in_use: Vec<&str> = requests.iter().map(|r| r.mountpoint.as_str()).collect();
            let mountpoint = validate_mountpoint(&spec.mountpoint, &in_use)?;
            let size = str_to_size(&spec.size, SizeUnit::Mib)
                .filter(|s| s.mib() > 0)
                .with_context(|| format!("Invalid size '{}' for {}", spec.size, mountpoint))?;
            requests.push(PartitionRequest {
                mountpoint,
                size_mib: size.mib(),
            });
        }
        Ok(requests)
    }

    /// Seed an install context. Empty settings are left out so hook
    /// modules see them as absent.
    pub fn to_context(&self) -> Result<Context> {
        let mut ctx = Context::new();
        ctx.insert(keys::MOUNT_DIR, self.mount_dir.trim());
        ctx.insert(keys::IS_KICKSTART, true);
        ctx.insert(keys::SELINUX, self.selinux.to_string());

        if !self.hostname.is_empty() {
            ctx.insert(keys::HOSTNAME, self.hostname.as_str());
        }
        if !self.ntp_servers.is_empty() {
            ctx.insert(
                keys::NTP_SERVERS,
                Value::Array(self.ntp_servers.iter().cloned().map(Value::String).collect()),
            );
        }
        if !self.interfaces.is_empty() {
            ctx.insert(keys::INTERFACES, serde_json::to_value(&self.interfaces)?);
        }
        if !self.partitions.is_empty() {
            ctx.insert(keys::PARTITIONS, serde_json::to_value(self.partition_requests()?)?);
        }
        if !self.root_device.is_empty() {
            ctx.insert(keys::ROOT_DEVICE, self.root_device.as_str());
        }
        if !self.boot_args.is_empty() {
            ctx.insert(keys::BOOT_ARGS, self.boot_args.as_str());
        }

        Ok(ctx)
    }

    /// Capture the answers of an interactive run so it can be replayed.
    pub fn from_context(ctx: &Context) -> Self {
        let partitions: Vec<PartitionRequest> = ctx
            .get(keys::PARTITIONS)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let interfaces: Vec<InterfaceConfig> = ctx
            .get(keys::INTERFACES)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Self {
            mount_dir: ctx
                .mount_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            root_device: ctx.get_str(keys::ROOT_DEVICE).unwrap_or_default().to_string(),
            boot_args: ctx.get_str(keys::BOOT_ARGS).unwrap_or_default().to_string(),
            partitions: partitions
                .into_iter()
                .map(|p| PartitionSpec {
                    mountpoint: p.mountpoint,
                    size: format!("{}M", p.size_mib),
                })
                .collect(),
            hostname: ctx.get_str(keys::HOSTNAME).unwrap_or_default().to_string(),
            interfaces,
            ntp_servers: ctx.ntp_servers(),
            selinux: ctx
                .get_str(keys::SELINUX)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}
