//! Closed taxonomy of command outcomes.
//!
//! ipmitool reports results as free text, so outcomes are derived by marker
//! matching. The match itself is a compatibility shim: the fixed strings in
//! `constants` may not cover every phrasing the tool can emit, and a marker
//! miss on a genuinely successful command is reported as NotFound rather
//! than guessed around.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The expected marker was present
    Success,
    /// The expected marker was absent
    NotFound,
    /// A bounded wait elapsed before the marker appeared
    Timeout,
    /// The tool printed a known error marker
    ToolError,
}

impl Outcome {
    /// Classify output where a marker signals success.
    pub fn from_marker(output: &str, marker: &str) -> Self {
        if output.contains(marker) {
            Outcome::Success
        } else {
            Outcome::NotFound
        }
    }

    /// Classify output where a marker signals a tool-side failure.
    pub fn from_error_marker(output: &str, marker: &str) -> Self {
        if output.contains(marker) {
            Outcome::ToolError
        } else {
            Outcome::Success
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}
