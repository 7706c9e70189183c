//! BMC controller: every operation the boot tests drive through ipmitool.

pub mod constants;
pub mod controller;
pub mod outcome;
pub mod sol;

use std::path::PathBuf;

use thiserror::Error;

pub use controller::{BmcController, FirmwareSide};
pub use outcome::Outcome;
pub use sol::SolCapture;

#[derive(Debug, Error)]
pub enum BmcError {
    #[error("command launch or file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{op}: expected '{marker}' in command output")]
    MarkerNotFound { op: &'static str, marker: &'static str },

    #[error("{op}: tool reported an error ('{marker}' present in output)")]
    ToolError { op: &'static str, marker: String },

    #[error("IPL timeout after {0} minutes")]
    IplTimeout(u64),

    #[error("sensor data still has entries after clear")]
    SelNotEmpty,

    #[error("error log(s) detected during IPL, see {}", .log.display())]
    SelErrors { log: PathBuf },

    #[error("could not determine active firmware side")]
    UnknownSide,

    #[error("partition address not configured")]
    LparNotConfigured,

    #[error("partition is still not active after {0} power cycle attempt(s)")]
    LparNotActive(u32),
}
