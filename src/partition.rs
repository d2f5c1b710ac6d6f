//! Partitioning input helpers
//!
//! Parsing and validation for what the disk screens collect: size strings
//! like `512`, `0.5G` or `20GiB`, and mountpoints. Actual partition planning
//! is done by the storage library; these helpers only decide whether an
//! answer is acceptable.

use std::fmt;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

/// Mountpoints that belong to the running system and can never be targets.
const RESERVED_MOUNTPOINTS: &[&str] = &[
    "/proc",
    "/sys",
    "/dev",
    "/run",
    "/bin",
    "/sbin",
    "/lib",
    "/lib64",
    "/etc",
    "/lost+found",
];

/// Size unit suffix accepted by [`str_to_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Bytes,
    Kib,
    Mib,
    Gib,
    Tib,
}

impl SizeUnit {
    const fn multiplier(self) -> u64 {
        match self {
            Self::Bytes => 1,
            Self::Kib => KIB,
            Self::Mib => MIB,
            Self::Gib => GIB,
            Self::Tib => TIB,
        }
    }

    fn parse(suffix: &str) -> Option<Self> {
        match suffix.to_ascii_lowercase().as_str() {
            "b" => Some(Self::Bytes),
            "k" | "kb" | "kib" => Some(Self::Kib),
            "m" | "mb" | "mib" => Some(Self::Mib),
            "g" | "gb" | "gib" => Some(Self::Gib),
            "t" | "tb" | "tib" => Some(Self::Tib),
            _ => None,
        }
    }
}

/// A partition size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Size(u64);

impl Size {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn from_mib(mib: u64) -> Self {
        Self(mib * MIB)
    }

    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Whole mebibytes, rounded down.
    pub const fn mib(self) -> u64 {
        self.0 / MIB
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        if bytes >= TIB {
            write!(f, "{:.2} TiB", bytes as f64 / TIB as f64)
        } else if bytes >= GIB {
            write!(f, "{:.2} GiB", bytes as f64 / GIB as f64)
        } else if bytes >= MIB {
            write!(f, "{:.2} MiB", bytes as f64 / MIB as f64)
        } else if bytes >= KIB {
            write!(f, "{:.2} KiB", bytes as f64 / KIB as f64)
        } else {
            write!(f, "{} B", bytes)
        }
    }
}

/// Parse a human size string.
///
/// A bare number uses `default_unit`. Returns `None` when there is no
/// numeric content, the value is negative or the unit is unknown.
///
/// ```
/// use zinstall::partition::{str_to_size, Size, SizeUnit};
///
/// assert_eq!(str_to_size("512", SizeUnit::Mib), Some(Size::from_mib(512)));
/// assert_eq!(str_to_size("0.5G", SizeUnit::Mib), Some(Size::from_mib(512)));
/// assert_eq!(str_to_size("big", SizeUnit::Mib), None);
/// ```
pub fn str_to_size(input: &str, default_unit: SizeUnit) -> Option<Size> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(split);

    if !number.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = number.parse().ok()?;

    let suffix = suffix.trim();
    let unit = if suffix.is_empty() {
        default_unit
    } else {
        SizeUnit::parse(suffix)?
    };

    let bytes = value * unit.multiplier() as f64;
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return None;
    }
    Some(Size(bytes.round() as u64))
}

/// Why a mountpoint was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MountpointError {
    #[error("'{0}' is not a valid mountpoint")]
    Malformed(String),

    #[error("'{0}' is reserved for the running system")]
    Reserved(String),

    #[error("'{0}' is already in use")]
    InUse(String),
}

/// `/var/` and `/var` name the same mountpoint; `/` stays as is.
fn strip_trailing_slash(mountpoint: &str) -> &str {
    if mountpoint.len() > 1 {
        mountpoint.trim_end_matches('/')
    } else {
        mountpoint
    }
}

/// Validate a mountpoint against the ones already assigned.
///
/// Returns the normalized mountpoint (no trailing slash). `swap` is always
/// valid and may be used more than once.
pub fn validate_mountpoint<S: AsRef<str>>(
    mountpoint: &str,
    in_use: &[S],
) -> Result<String, MountpointError> {
    let raw = mountpoint.trim();
    if raw == "swap" {
        return Ok(raw.to_string());
    }

    if !raw.starts_with('/') || raw.chars().any(char::is_whitespace) {
        return Err(MountpointError::Malformed(raw.to_string()));
    }

    let normalized = strip_trailing_slash(raw);
    if normalized.is_empty() {
        return Err(MountpointError::Malformed(raw.to_string()));
    }

    // "/" splits into one empty component; everything else must be clean
    if normalized != "/"
        && normalized[1..]
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(MountpointError::Malformed(raw.to_string()));
    }

    let reserved = RESERVED_MOUNTPOINTS.iter().any(|r| {
        normalized == *r
            || normalized
                .strip_prefix(r)
                .is_some_and(|rest| rest.starts_with('/'))
    });
    if reserved {
        return Err(MountpointError::Reserved(normalized.to_string()));
    }

    if in_use
        .iter()
        .any(|used| strip_trailing_slash(used.as_ref().trim()) == normalized)
    {
        return Err(MountpointError::InUse(normalized.to_string()));
    }

    Ok(normalized.to_string())
}
