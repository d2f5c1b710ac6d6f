//! Shared installation context
//!
//! One `Context` lives for a full install or upgrade run. Wizard screens and
//! hook modules read and write it in turn; access is strictly sequential.
//!
//! Values are `serde_json::Value` so screens can forward arbitrary payloads.
//! The keys that cross module boundaries have named constants in [`keys`] and
//! typed accessors on `Context`.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Well-known context keys shared between modules.
pub mod keys {
    /// Root of the installed system (string path).
    pub const MOUNT_DIR: &str = "mountDir";
    /// Ordered list of NTP server hostnames or addresses.
    pub const NTP_SERVERS: &str = "ntpservers";
    /// Whether the run is unattended (boolean).
    pub const IS_KICKSTART: &str = "isKickstart";
    /// Target hostname.
    pub const HOSTNAME: &str = "hostname";
    /// Interface definitions for the network module.
    pub const INTERFACES: &str = "interfaces";
    /// Partition requests collected by the disk screens.
    pub const PARTITIONS: &str = "partitions";
    /// SELinux mode of the target system.
    pub const SELINUX: &str = "selinux";
    /// Root block device for the boot loader.
    pub const ROOT_DEVICE: &str = "rootDevice";
    /// Extra kernel command line arguments.
    pub const BOOT_ARGS: &str = "bootArgs";
}

/// Key/value blackboard passed through the wizard and the hook runner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Look up a key. Absent keys are `None`, never an error.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Merge a forwarded payload. Later keys overwrite earlier ones.
    pub fn merge(&mut self, data: Map<String, Value>) {
        self.values.extend(data);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// String value for `key`, `None` if absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Boolean value for `key`, `None` if absent or not a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Installed system root (`mountDir`).
    pub fn mount_dir(&self) -> Option<PathBuf> {
        self.get_str(keys::MOUNT_DIR)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
    }

    /// NTP servers in configured order. Non-string entries are skipped.
    pub fn ntp_servers(&self) -> Vec<String> {
        match self.get(keys::NTP_SERVERS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this is an unattended run. Defaults to false.
    pub fn is_kickstart(&self) -> bool {
        self.get_bool(keys::IS_KICKSTART).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_key_is_none() {
        let ctx = Context::new();
        assert!(ctx.get("nope").is_none());
        assert!(ctx.mount_dir().is_none());
        assert!(ctx.ntp_servers().is_empty());
        assert!(!ctx.is_kickstart());
    }

    #[test]
    fn test_merge_overwrites() {
        let mut ctx = Context::new();
        ctx.insert("x", 1);
        let mut data = Map::new();
        data.insert("x".to_string(), json!(2));
        data.insert("y".to_string(), json!(3));
        ctx.merge(data);

        assert_eq!(ctx.get("x"), Some(&json!(2)));
        assert_eq!(ctx.get("y"), Some(&json!(3)));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_typed_accessors() {
        let mut ctx = Context::new();
        ctx.insert(keys::MOUNT_DIR, "/mnt/sysimage");
        ctx.insert(keys::NTP_SERVERS, json!(["0.pool.ntp.org", " ", 7, "10.0.0.1"]));
        ctx.insert(keys::IS_KICKSTART, true);

        assert_eq!(ctx.mount_dir(), Some(PathBuf::from("/mnt/sysimage")));
        assert_eq!(ctx.ntp_servers(), vec!["0.pool.ntp.org", "10.0.0.1"]);
        assert!(ctx.is_kickstart());
    }

    #[test]
    fn test_wrong_type_reads_as_absent() {
        let mut ctx = Context::new();
        ctx.insert(keys::MOUNT_DIR, 42);
        ctx.insert(keys::IS_KICKSTART, "yes");
        ctx.insert(keys::NTP_SERVERS, "pool.ntp.org");

        assert!(ctx.mount_dir().is_none());
        assert!(!ctx.is_kickstart());
        assert!(ctx.ntp_servers().is_empty());
    }
}
