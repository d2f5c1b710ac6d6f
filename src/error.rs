//! Error handling module for zinstall
//!
//! Provides centralized error types using thiserror. Step and hook bodies
//! use `anyhow` internally; anything that crosses a lifecycle boundary is
//! converted into one of the types here.

use crate::hooks::{HookEvent, Phase};
use thiserror::Error;

/// Main error type for zinstall
#[derive(Error, Debug)]
pub enum InstallerError {
    /// IO errors (sentinel files, target root)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A lifecycle hook module failed
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The caller's package transaction failed
    #[error("{0:#}")]
    Payload(anyhow::Error),
}

/// Result type alias for zinstall operations
pub type Result<T> = std::result::Result<T, InstallerError>;

/// A hook handler failure, tagged with where it happened.
///
/// The orchestrator uses the coordinates to build the message it writes into
/// the install-failed sentinel.
#[derive(Error, Debug)]
#[error("{phase} phase: module '{module}' failed during {event}: {source:#}")]
pub struct HookError {
    pub phase: Phase,
    pub module: String,
    pub event: HookEvent,
    #[source]
    pub source: anyhow::Error,
}
