//! zinstall Library
//!
//! Control layer of a text-mode installer for Linux on mainframe hosts: the
//! wizard navigation engine, lifecycle hook dispatch, package-manager progress
//! relay, and the partitioning input helpers the disk screens rely on.

pub mod cli;
pub mod config_file;
pub mod context;
pub mod error;
pub mod hooks;
pub mod installer;
pub mod partition;
pub mod progress;
pub mod sentinel;
pub mod wizard;

// Re-export main types for convenience
pub use config_file::InstallationConfig;
pub use context::Context;
pub use error::{HookError, InstallerError};
pub use hooks::{default_modules, HookEvent, HookModule, LifecycleHookRunner, Phase};
pub use installer::{InstallStep, Installer};
pub use partition::{str_to_size, validate_mountpoint, MountpointError, Size, SizeUnit};
pub use progress::{Operation, ProgressEvent, ProgressKind, ProgressRelay};
pub use sentinel::Sentinels;
pub use wizard::{ScreenResult, Step, WizardController, WizardOutcome};
