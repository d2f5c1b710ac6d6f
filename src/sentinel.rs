//! Install status marker files
//!
//! An external supervisor watches a directory for four plain-text markers:
//!
//! | File               | Meaning                                   |
//! |--------------------|-------------------------------------------|
//! | `install-progress` | `<percent> <stage>` of the running phase  |
//! | `install-info`     | last informational message                |
//! | `install-failed`   | failure message; presence means failure   |
//! | `install-success`  | presence means the run completed          |

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FAILED_FILE: &str = "install-failed";
pub const INFO_FILE: &str = "install-info";
pub const PROGRESS_FILE: &str = "install-progress";
pub const SUCCESS_FILE: &str = "install-success";

/// Default marker directory on the install image.
pub const DEFAULT_SENTINEL_DIR: &str = "/run/zinstall";

/// Writer for the marker files in one directory.
#[derive(Debug, Clone)]
pub struct Sentinels {
    dir: PathBuf,
}

impl Sentinels {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove all markers left by a previous run.
    pub fn clear(&self) -> Result<()> {
        for name in [FAILED_FILE, INFO_FILE, PROGRESS_FILE, SUCCESS_FILE] {
            match fs::remove_file(self.path(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn mark_failed(&self, message: &str) -> Result<()> {
        self.write(FAILED_FILE, message)
    }

    pub fn write_info(&self, message: &str) -> Result<()> {
        self.write(INFO_FILE, message)
    }

    pub fn write_progress(&self, percent: u8, stage: &str) -> Result<()> {
        self.write(PROGRESS_FILE, &format!("{} {}", percent.min(100), stage))
    }

    pub fn mark_success(&self) -> Result<()> {
        self.write(SUCCESS_FILE, "")
    }

    pub fn is_failed(&self) -> bool {
        self.path(FAILED_FILE).exists()
    }

    pub fn is_successful(&self) -> bool {
        self.path(SUCCESS_FILE).exists()
    }

    /// Content of a marker, `None` if it does not exist.
    pub fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path(name)).ok()
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(name);
        fs::write(&path, content)?;
        debug!("Wrote marker {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_markers_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let sentinels = Sentinels::new(tmp.path().join("markers"));

        assert!(!sentinels.is_failed());
        sentinels.write_progress(150, "post_install").unwrap();
        assert_eq!(sentinels.read(PROGRESS_FILE).as_deref(), Some("100 post_install"));

        sentinels.mark_failed("ntp failed").unwrap();
        assert!(sentinels.is_failed());
        assert_eq!(sentinels.read(FAILED_FILE).as_deref(), Some("ntp failed"));
    }

    #[test]
    fn test_clear_tolerates_missing() {
        let tmp = TempDir::new().unwrap();
        let sentinels = Sentinels::new(tmp.path());
        sentinels.clear().unwrap();

        sentinels.mark_success().unwrap();
        assert!(sentinels.is_successful());
        sentinels.clear().unwrap();
        assert!(!sentinels.is_successful());
    }
}
