//! Shell command executor.
//! Every BMC and partition operation goes through the CommandRunner seam so
//! tests can substitute a scripted runner.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a shell command line to completion and return the combined
    /// stdout+stderr text. Only failure to launch the process is an error;
    /// the command's own exit status is not interpreted here - callers
    /// classify the captured text.
    async fn run(&self, cmd: &str) -> std::io::Result<String>;

    /// Launch a shell command line as a detached background child without
    /// waiting for it. The caller owns the handle and is responsible for
    /// stopping the process.
    async fn spawn(&self, cmd: &str) -> std::io::Result<Child>;
}

/// Production runner: `sh -c <cmd>` via tokio::process.
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, cmd: &str) -> std::io::Result<String> {
        debug!("Executing: {}", cmd);

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    async fn spawn(&self, cmd: &str) -> std::io::Result<Child> {
        debug!("Spawning background process: {}", cmd);

        Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .spawn()
    }
}
