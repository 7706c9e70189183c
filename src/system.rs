//! Process execution seam.

pub mod executor;

pub use executor::{CommandRunner, ShellRunner};
