//! Partition (LPAR) handle: remote execution, file copy and reachability.
//!
//! All access goes through the same CommandRunner seam as the BMC commands.
//! The password prompt of ssh/scp is answered non-interactively via sshpass
//! and host-key checking is disabled; the lab network has no key material.

use std::io;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::types::LparSettings;
use crate::system::CommandRunner;

/// Reachability classification of one ping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingStatus {
    /// No replies at all
    Unreachable,
    /// Some but not all packets answered
    Partial,
    /// Every packet answered
    Reachable,
}

pub struct LparHandle {
    runner: Arc<dyn CommandRunner>,
    settings: LparSettings,
}

impl LparHandle {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: LparSettings) -> Self {
        Self { runner, settings }
    }

    pub fn address(&self) -> Option<&str> {
        self.settings.address.as_deref()
    }

    fn require_address(&self) -> io::Result<&str> {
        self.address().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "partition address not configured")
        })
    }

    /// Run a command on the partition over SSH and return its output.
    pub async fn execute(&self, cmd: &str) -> io::Result<String> {
        let addr = self.require_address()?;
        let line = format!(
            "sshpass -p '{}' ssh -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null {}@{} '{}'",
            self.settings.password, self.settings.user, addr, cmd
        );
        debug!("LPAR exec: {}", cmd);
        self.runner.run(&line).await
    }

    /// Copy a local file to a directory on the partition via SCP.
    pub async fn copy_to(&self, local: &str, remote_dir: &str) -> io::Result<String> {
        let addr = self.require_address()?;
        let line = format!(
            "sshpass -p '{}' scp -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null {} {}@{}:{}",
            self.settings.password, local, self.settings.user, addr, remote_dir
        );
        info!("Copying {} to {}:{}", local, addr, remote_dir);
        self.runner.run(&line).await
    }

    /// Ping the partition and classify the reply statistics.
    pub async fn ping(&self) -> io::Result<PingStatus> {
        let addr = self.require_address()?;
        let output = self
            .runner
            .run(&format!("ping -c 4 -w 10 {}", addr))
            .await?;
        let status = classify_ping(&output);
        debug!("Ping {}: {:?}", addr, status);
        Ok(status)
    }
}

/// Parse the "N packets transmitted, M received" statistics line.
/// Missing or unparseable statistics count as Unreachable.
fn classify_ping(output: &str) -> PingStatus {
    let Some(line) = output.lines().find(|l| l.contains("packets transmitted")) else {
        return PingStatus::Unreachable;
    };

    let mut transmitted = 0u32;
    let mut received = 0u32;
    for part in line.split(',') {
        let part = part.trim();
        if let Some(n) = part.strip_suffix(" packets transmitted") {
            transmitted = n.trim().parse().unwrap_or(0);
        } else if let Some(n) = part
            .strip_suffix(" packets received")
            .or_else(|| part.strip_suffix(" received"))
        {
            received = n.trim().parse().unwrap_or(0);
        }
    }

    if received == 0 {
        PingStatus::Unreachable
    } else if received < transmitted {
        PingStatus::Partial
    } else {
        PingStatus::Reachable
    }
}
