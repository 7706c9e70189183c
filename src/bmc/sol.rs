//! Serial-over-LAN capture as an owned handle.
//!
//! The capture itself is an external expect-style logger helper spawned in
//! the background; this handle owns the child and carries the explicit
//! stop contract, so no capture process is left behind by convention alone.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, info};

use crate::bmc::constants::{SOL_DEACTIVATE, SOL_LOG_FILE};
use crate::bmc::BmcError;
use crate::config::types::{BmcSettings, FfdcSettings};
use crate::system::CommandRunner;

pub struct SolCapture {
    child: Child,
    deactivate_cmd: String,
    runner: Arc<dyn CommandRunner>,
}

impl SolCapture {
    /// Deactivate any stale SOL session, wait for the BMC to release it, then
    /// spawn the logger helper writing to `<ffdc_dir>/host_sol.log`.
    ///
    /// A failed pre-deactivation is benign (the usual response is that no
    /// session is active) and is logged, not raised.
    pub async fn start(
        runner: Arc<dyn CommandRunner>,
        prefix: &str,
        bmc: &BmcSettings,
        ffdc: &FfdcSettings,
        restart_delay: Duration,
    ) -> Result<Self, BmcError> {
        let deactivate_cmd = format!("{}{}", prefix, SOL_DEACTIVATE);

        match runner.run(&deactivate_cmd).await {
            Ok(output) => debug!("Pre-capture sol deactivate: {}", output.trim()),
            Err(e) => debug!("Pre-capture sol deactivate failed (benign): {}", e),
        }
        tokio::time::sleep(restart_delay).await;

        let log_file = Path::new(&ffdc.dir).join(SOL_LOG_FILE);
        let cmd = format!(
            "{} {} {} {} {}",
            ffdc.sol_logger,
            bmc.address,
            bmc.user,
            bmc.password,
            log_file.display()
        );

        info!("Starting SOL capture -> {}", log_file.display());
        let child = runner.spawn(&cmd).await?;

        Ok(Self {
            child,
            deactivate_cmd,
            runner,
        })
    }

    /// Deactivate the SOL session and terminate the logger helper. Launch
    /// failure of the deactivate command is an error; the helper usually
    /// exits with the session and the kill is a backstop.
    pub async fn stop(mut self) -> Result<(), BmcError> {
        let output = self.runner.run(&self.deactivate_cmd).await?;
        debug!("sol deactivate: {}", output.trim());

        let _ = self.child.start_kill();
        let _ = self.child.wait().await;

        info!("SOL capture stopped");
        Ok(())
    }
}
