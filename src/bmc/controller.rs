//! The BMC controller and its operations.
//!
//! Each operation formats one or more ipmitool (or ssh/scp) command lines,
//! runs them through the CommandRunner seam, and classifies the captured
//! text through the Outcome taxonomy. Operations are all-or-nothing: a
//! marker miss, launch failure or elapsed deadline aborts with a BmcError.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::bmc::constants::*;
use crate::bmc::outcome::Outcome;
use crate::bmc::sol::SolCapture;
use crate::bmc::BmcError;
use crate::config::types::{BmcSettings, FfdcSettings, RetryPolicy, TestConfig, Timing};
use crate::lpar::{LparHandle, PingStatus};
use crate::system::CommandRunner;

/// Which firmware side the BMC reports as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareSide {
    Primary,
    Golden,
}

impl std::fmt::Display for FirmwareSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirmwareSide::Primary => write!(f, "primary"),
            FirmwareSide::Golden => write!(f, "golden"),
        }
    }
}

pub struct BmcController {
    runner: Arc<dyn CommandRunner>,
    bmc: BmcSettings,
    /// ipmitool invocation prefix, built once: `ipmitool -H .. -I lanplus -U .. -P .. `
    prefix: String,
    lpar: LparHandle,
    ffdc: FfdcSettings,
    timing: Timing,
    retry: RetryPolicy,
}

impl BmcController {
    pub fn new(config: TestConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let prefix = format!(
            "ipmitool -H {} -I lanplus -U {} -P {} ",
            config.bmc.address, config.bmc.user, config.bmc.password
        );
        let lpar = LparHandle::new(runner.clone(), config.lpar);

        Self {
            runner,
            bmc: config.bmc,
            prefix,
            lpar,
            ffdc: config.ffdc,
            timing: config.timing,
            retry: config.retry,
        }
    }

    /// Run one ipmitool sub-command through the shared prefix.
    async fn run_tool(&self, sub: &str) -> Result<String, BmcError> {
        Ok(self.runner.run(&format!("{}{}", self.prefix, sub)).await?)
    }

    fn expect_marker(
        op: &'static str,
        output: &str,
        marker: &'static str,
    ) -> Result<(), BmcError> {
        if Outcome::from_marker(output, marker).is_success() {
            Ok(())
        } else {
            warn!("{}: marker '{}' missing from output", op, marker);
            Err(BmcError::MarkerNotFound { op, marker })
        }
    }

    fn sol_log_path(&self) -> PathBuf {
        Path::new(&self.ffdc.dir).join(SOL_LOG_FILE)
    }

    /// Power the chassis off. Success requires the Down/Off marker; any other
    /// phrasing fails.
    pub async fn power_off(&self) -> Result<(), BmcError> {
        let output = self.run_tool(POWER_OFF).await?;
        Self::expect_marker("power off", &output, POWER_OFF_MARKER)?;
        info!("Chassis powered off");
        Ok(())
    }

    /// Power the chassis on. Success requires the Up/On marker.
    pub async fn power_on(&self) -> Result<(), BmcError> {
        let output = self.run_tool(POWER_ON).await?;
        Self::expect_marker("power on", &output, POWER_ON_MARKER)?;
        info!("Chassis powered on");
        Ok(())
    }

    /// Cold reset the BMC and wait for it to come back.
    pub async fn cold_reset(&self) -> Result<(), BmcError> {
        info!(
            "Applying cold reset, then waiting {}s for the BMC to settle",
            self.timing.cold_reset_settle_secs
        );
        let output = self.run_tool(COLD_RESET).await?;
        Self::expect_marker("cold reset", &output, COLD_RESET_MARKER)?;
        sleep(self.timing.cold_reset_settle()).await;
        Ok(())
    }

    /// Clear the SEL and verify the listing is empty after the settle delay.
    /// Any remaining entry is a hard failure; there is no partial-clear retry.
    pub async fn sdr_clear(&self) -> Result<(), BmcError> {
        let output = self.run_tool(SEL_CLEAR).await?;
        Self::expect_marker("sel clear", &output, SEL_CLEARING_MARKER)?;

        sleep(self.timing.sel_settle()).await;

        let listing = self.run_tool(SEL_LIST).await?;
        if Outcome::from_marker(&listing, SEL_EMPTY_MARKER).is_success() {
            info!("SEL cleared");
            Ok(())
        } else {
            warn!("Sensor data still has entries after clear");
            Err(BmcError::SelNotEmpty)
        }
    }

    /// Dump the SEL to `<ffdc_dir>/host_sol.log` (overwriting any previous
    /// dump) and fail if `marker` appears anywhere in it - the signature of
    /// an unrecoverable error logged during the boot attempt.
    pub async fn sel_check(&self, marker: &str) -> Result<(), BmcError> {
        let output = self.run_tool(SEL_LIST).await?;

        tokio::fs::create_dir_all(&self.ffdc.dir).await?;
        let log = self.sol_log_path();
        tokio::fs::write(&log, &output).await?;

        if Outcome::from_error_marker(&output, marker) == Outcome::ToolError {
            warn!("Error log(s) detected during IPL, see {}", log.display());
            Err(BmcError::SelErrors { log })
        } else {
            debug!("SEL check clean, dump written to {}", log.display());
            Ok(())
        }
    }

    /// Start SOL capture into the FFDC directory, returning the owned handle.
    pub async fn sol_capture(&self) -> Result<SolCapture, BmcError> {
        tokio::fs::create_dir_all(&self.ffdc.dir).await?;
        SolCapture::start(
            self.runner.clone(),
            &self.prefix,
            &self.bmc,
            &self.ffdc,
            self.timing.sol_restart_delay(),
        )
        .await
    }

    /// Poll a sub-command for a marker at the configured interval until the
    /// marker appears or the deadline passes. Never polls past the deadline.
    async fn poll_for_marker(
        &self,
        sub: &str,
        marker: &str,
        deadline: Instant,
    ) -> Result<Outcome, BmcError> {
        loop {
            let output = self.run_tool(sub).await?;
            if Outcome::from_marker(&output, marker).is_success() {
                return Ok(Outcome::Success);
            }
            if Instant::now() >= deadline {
                return Ok(Outcome::Timeout);
            }
            sleep(self.timing.ipl_poll()).await;
        }
    }

    /// Start SOL capture and poll the OCC Active sensor until the IPL reaches
    /// working state or `timeout_mins` elapses after the warm-up.
    ///
    /// The warm-up sleep before the first poll is required: the firmware sets
    /// the host status sensor to working right after power on, so an early
    /// poll would report completion that has not happened.
    pub async fn ipl_wait_for_working_state(&self, timeout_mins: u64) -> Result<(), BmcError> {
        let sol = self.sol_capture().await?;
        sleep(self.timing.ipl_warmup()).await;

        let deadline = Instant::now() + Duration::from_secs(timeout_mins * 60);
        match self.poll_for_marker(IPL_POLL, IPL_DONE_MARKER, deadline).await? {
            Outcome::Success => {
                info!("OCC Active reports Device Enabled, IPL finished");
                sol.stop().await?;
                Ok(())
            }
            _ => {
                warn!("IPL did not reach working state within {} minutes", timeout_mins);
                if let Err(e) = sol.stop().await {
                    debug!("SOL stop after timeout failed: {}", e);
                }
                Err(BmcError::IplTimeout(timeout_mins))
            }
        }
    }

    /// Flash an HPM image through the BMC, auto-confirming the prompt, then
    /// cold reset. Success requires the upgrade confirmation marker in the
    /// update output - a clean reset does not rescue an ambiguous update.
    pub async fn code_update(&self, image: &str, component: &str) -> Result<(), BmcError> {
        info!("Flashing {} ({})", image, component);
        let cmd = format!(
            "echo y | {}{}{} {}",
            self.prefix, HPM_UPDATE, image, component
        );
        let output = self.runner.run(&cmd).await?;
        debug!("hpm upgrade output: {}", output.trim());

        self.cold_reset().await?;

        Self::expect_marker("code update", &output, HPM_SUCCESS_MARKER)?;
        info!("Firmware update complete");
        Ok(())
    }

    /// Flash an HPM image from inside the partition over the usb interface:
    /// validate reachability, copy the image to /tmp on the partition,
    /// preserve the BMC network settings, run the update remotely, cold reset.
    pub async fn inband_code_update(&self, image: &str, component: &str) -> Result<(), BmcError> {
        self.validate_lpar().await?;

        self.lpar.copy_to(image, "/tmp").await?;
        self.preserve_network_setting().await?;

        let file = image.rsplit('/').next().unwrap_or(image);
        let cmd = format!(
            "echo y | ipmitool -I usb {}/tmp/{} {}",
            HPM_UPDATE, file, component
        );
        info!("Flashing {} in-band ({})", file, component);
        let output = self.lpar.execute(&cmd).await?;
        debug!("in-band hpm upgrade output: {}", output.trim());

        self.cold_reset().await?;

        Self::expect_marker("in-band code update", &output, HPM_SUCCESS_MARKER)?;
        info!("In-band firmware update complete");
        Ok(())
    }

    /// Preserve the BMC network settings across a firmware update.
    pub async fn preserve_network_setting(&self) -> Result<(), BmcError> {
        info!("Protecting BMC network settings");
        let output = self.run_tool(LAN_PRESERVE).await?;
        if Outcome::from_error_marker(&output, LAN_ERROR_MARKER) == Outcome::ToolError {
            warn!("Could not protect network settings, preserve them manually");
            return Err(BmcError::ToolError {
                op: "preserve lan",
                marker: LAN_ERROR_MARKER.to_string(),
            });
        }
        Ok(())
    }

    /// Report which firmware side is active: 0x0080 is primary, 0x0180 golden.
    pub async fn get_side_activated(&self) -> Result<FirmwareSide, BmcError> {
        let output = self.run_tool(ACTIVE_SIDE).await?;
        if output.contains(PRIMARY_SIDE_MARKER) {
            info!("Primary side is active");
            Ok(FirmwareSide::Primary)
        } else if output.contains(GOLDEN_SIDE_MARKER) {
            info!("Golden side is active");
            Ok(FirmwareSide::Golden)
        } else {
            warn!("Active side query returned neither side code");
            Err(BmcError::UnknownSide)
        }
    }

    /// Query the PNOR build level; the raw text is echoed back uninterpreted.
    pub async fn get_pnor_level(&self) -> Result<String, BmcError> {
        let output = self.run_tool(PNOR_LEVEL).await?;
        debug!("PNOR level: {}", output.trim());
        Ok(output)
    }

    /// Read the partition's OS release string over SSH.
    pub async fn inband_get_os_level(&self) -> Result<String, BmcError> {
        self.validate_lpar().await?;
        let output = self.lpar.execute(GET_OS_RELEASE).await?;
        debug!("OS release: {}", output.trim());
        Ok(output)
    }

    /// Validate the partition is reachable before any in-band work.
    ///
    /// A partition that does not answer every ping triggers a forced power
    /// cycle, one wait, and one re-check, up to the configured attempt bound
    /// (default: a single retry). Anything short of fully reachable after
    /// the last attempt is a hard failure.
    pub async fn validate_lpar(&self) -> Result<(), BmcError> {
        if self.lpar.address().is_none() {
            warn!("Partition credentials not provided");
            return Err(BmcError::LparNotConfigured);
        }

        let mut status = self.lpar.ping().await?;
        let mut attempts = 0u32;
        while status != PingStatus::Reachable && attempts < self.retry.max_attempts {
            attempts += 1;
            info!(
                "Partition not active ({:?}), power cycling (attempt {}/{})",
                status, attempts, self.retry.max_attempts
            );
            self.power_off().await?;
            self.power_on().await?;
            sleep(self.retry.wait()).await;
            status = self.lpar.ping().await?;
        }

        if status != PingStatus::Reachable {
            warn!("Partition is still not active");
            return Err(BmcError::LparNotActive(attempts));
        }

        info!("Partition is pinging");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::LparSettings;
    use crate::system::executor::test_support::MockRunner;

    const PING_OK: &str = "4 packets transmitted, 4 received, 0% packet loss, time 3004ms";
    const PING_DEAD: &str = "4 packets transmitted, 0 received, 100% packet loss, time 3058ms";

    fn zero_timing() -> Timing {
        Timing {
            sel_settle_secs: 0,
            sol_restart_delay_secs: 0,
            ipl_warmup_secs: 0,
            ipl_poll_secs: 0,
            cold_reset_settle_secs: 0,
        }
    }

    fn controller(
        responses: Vec<&str>,
        lpar_address: Option<&str>,
    ) -> (BmcController, Arc<MockRunner>, tempfile::TempDir) {
        let ffdc_dir = tempfile::tempdir().unwrap();
        let config = TestConfig {
            bmc: BmcSettings {
                address: "bmc.example".to_string(),
                user: "ADMIN".to_string(),
                password: "secret".to_string(),
            },
            lpar: LparSettings {
                address: lpar_address.map(str::to_string),
                user: "root".to_string(),
                password: "passw0rd".to_string(),
                kind: "openpower".to_string(),
                id: "lpar0".to_string(),
            },
            ffdc: FfdcSettings {
                dir: ffdc_dir.path().to_string_lossy().into_owned(),
                sol_logger: "sol_logger.exp".to_string(),
            },
            timing: zero_timing(),
            retry: RetryPolicy {
                max_attempts: 1,
                wait_secs: 0,
            },
        };
        let runner = Arc::new(MockRunner::with_responses(
            responses.into_iter().map(str::to_string).collect(),
        ));
        let ctl = BmcController::new(config, runner.clone());
        (ctl, runner, ffdc_dir)
    }

    #[tokio::test]
    async fn power_on_succeeds_only_on_exact_marker() {
        let (ctl, runner, _ffdc) = controller(vec!["Chassis Power Control: Up/On"], None);
        ctl.power_on().await.unwrap();
        assert!(runner.calls()[0].starts_with(
            "ipmitool -H bmc.example -I lanplus -U ADMIN -P secret chassis power on"
        ));

        let (ctl, _, _ffdc) = controller(vec!["Chassis Power Control: On"], None);
        assert!(matches!(
            ctl.power_on().await,
            Err(BmcError::MarkerNotFound { op: "power on", .. })
        ));
    }

    #[tokio::test]
    async fn power_off_rejects_variant_phrasing() {
        let (ctl, _, _ffdc) = controller(vec!["Chassis Power Control: Down/Off"], None);
        ctl.power_off().await.unwrap();

        let (ctl, _, _ffdc) = controller(vec!["Chassis Power Control: Off"], None);
        assert!(ctl.power_off().await.is_err());
    }

    #[tokio::test]
    async fn sdr_clear_verifies_empty_listing() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                "Clearing SEL.  Please allow a few seconds to erase.",
                "SEL has no entries",
            ],
            None,
        );
        ctl.sdr_clear().await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].ends_with("sel clear"));
        assert!(calls[1].ends_with("sel elist"));
    }

    #[tokio::test]
    async fn sdr_clear_fails_on_remaining_entries() {
        let (ctl, _, _ffdc) = controller(
            vec![
                "Clearing SEL.  Please allow a few seconds to erase.",
                "1 | 05/13/2015 | Temp #0x30 | Upper Non-critical going high",
            ],
            None,
        );
        assert!(matches!(ctl.sdr_clear().await, Err(BmcError::SelNotEmpty)));
    }

    #[tokio::test]
    async fn sel_check_raises_on_marker_and_writes_dump() {
        let listing = "2 | 05/13/2015 | Processor #0x0a | Transition to Non-recoverable";
        let (ctl, _, ffdc) = controller(vec![listing], None);

        let err = ctl.sel_check("Transition to Non-recoverable").await;
        assert!(matches!(err, Err(BmcError::SelErrors { .. })));

        let dump = std::fs::read_to_string(ffdc.path().join("host_sol.log")).unwrap();
        assert_eq!(dump, listing);
    }

    #[tokio::test]
    async fn sel_check_passes_without_marker() {
        let listing = "1 | 05/13/2015 | Temp #0x30 | asserted";
        let (ctl, _, ffdc) = controller(vec![listing], None);

        ctl.sel_check("Transition to Non-recoverable").await.unwrap();

        let dump = std::fs::read_to_string(ffdc.path().join("host_sol.log")).unwrap();
        assert_eq!(dump, listing);
    }

    #[tokio::test]
    async fn ipl_wait_polls_until_enabled() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                "Info: SOL payload already de-activated", // pre-capture deactivate
                "OCC Active      | 08h | ok  | 210.0 | Device Disabled",
                "OCC Active      | 08h | ok  | 210.0 | Device Enabled",
                "", // final deactivate
            ],
            None,
        );

        ctl.ipl_wait_for_working_state(10).await.unwrap();

        assert_eq!(runner.spawned().len(), 1);
        assert!(runner.spawned()[0].starts_with("sol_logger.exp bmc.example ADMIN secret"));

        let polls = runner
            .calls()
            .iter()
            .filter(|c| c.contains("sdr elist"))
            .count();
        assert_eq!(polls, 2);
    }

    #[tokio::test]
    async fn ipl_wait_times_out_at_the_deadline() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                "", // pre-capture deactivate
                "OCC Active      | 08h | ok  | 210.0 | Device Disabled",
                "", // deactivate after timeout
            ],
            None,
        );

        assert!(matches!(
            ctl.ipl_wait_for_working_state(0).await,
            Err(BmcError::IplTimeout(0))
        ));

        // The loop must not poll past the deadline
        let polls = runner
            .calls()
            .iter()
            .filter(|c| c.contains("sdr elist"))
            .count();
        assert_eq!(polls, 1);
    }

    #[tokio::test]
    async fn code_update_requires_confirmation_marker() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                "Firmware upgrade procedure successful",
                "Sent cold reset command to MC",
            ],
            None,
        );
        ctl.code_update("/images/fw.hpm", "component 2").await.unwrap();

        let resets = runner
            .calls()
            .iter()
            .filter(|c| c.ends_with("mc reset cold"))
            .count();
        assert_eq!(resets, 1);
        assert!(runner.calls()[0].starts_with("echo y | ipmitool"));
        assert!(runner.calls()[0].ends_with("hpm upgrade /images/fw.hpm component 2"));
    }

    #[tokio::test]
    async fn code_update_fails_even_when_reset_succeeds() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                "upgrade finished with warnings", // no confirmation marker
                "Sent cold reset command to MC",
            ],
            None,
        );
        assert!(matches!(
            ctl.code_update("/images/fw.hpm", "component 2").await,
            Err(BmcError::MarkerNotFound { op: "code update", .. })
        ));

        // The reset still ran exactly once before the failure was reported
        let resets = runner
            .calls()
            .iter()
            .filter(|c| c.ends_with("mc reset cold"))
            .count();
        assert_eq!(resets, 1);
    }

    #[tokio::test]
    async fn inband_code_update_runs_full_sequence() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                PING_OK,
                "fw.hpm                    100%",
                "",
                "Firmware upgrade procedure successful",
                "Sent cold reset command to MC",
            ],
            Some("10.0.0.5"),
        );
        ctl.inband_code_update("/images/fw.hpm", "component 2")
            .await
            .unwrap();

        let calls = runner.calls();
        assert!(calls[0].starts_with("ping"));
        assert!(calls[1].contains("scp"));
        assert!(calls[2].ends_with("raw 0x32 0xba 0x18 0x00"));
        assert!(calls[3].contains("ipmitool -I usb hpm upgrade /tmp/fw.hpm component 2"));
        assert!(calls[4].ends_with("mc reset cold"));
    }

    #[tokio::test]
    async fn validate_lpar_power_cycles_once_then_fails() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                PING_DEAD,
                "Chassis Power Control: Down/Off",
                "Chassis Power Control: Up/On",
                PING_DEAD,
            ],
            Some("10.0.0.5"),
        );
        assert!(matches!(
            ctl.validate_lpar().await,
            Err(BmcError::LparNotActive(1))
        ));

        let calls = runner.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("ping")).count(), 2);
        assert_eq!(
            calls.iter().filter(|c| c.contains("chassis power")).count(),
            2
        );
    }

    #[tokio::test]
    async fn validate_lpar_recovers_after_single_cycle() {
        let (ctl, runner, _ffdc) = controller(
            vec![
                PING_DEAD,
                "Chassis Power Control: Down/Off",
                "Chassis Power Control: Up/On",
                PING_OK,
            ],
            Some("10.0.0.5"),
        );
        ctl.validate_lpar().await.unwrap();

        // No second power cycle after the successful re-check
        let cycles = runner
            .calls()
            .iter()
            .filter(|c| c.contains("chassis power"))
            .count();
        assert_eq!(cycles, 2);
    }

    #[tokio::test]
    async fn validate_lpar_requires_an_address() {
        let (ctl, runner, _ffdc) = controller(vec![], None);
        assert!(matches!(
            ctl.validate_lpar().await,
            Err(BmcError::LparNotConfigured)
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn active_side_classification() {
        let (ctl, _, _ffdc) = controller(vec![" 00 0x0080 01"], None);
        assert_eq!(ctl.get_side_activated().await.unwrap(), FirmwareSide::Primary);

        let (ctl, _, _ffdc) = controller(vec![" 00 0x0180 01"], None);
        assert_eq!(ctl.get_side_activated().await.unwrap(), FirmwareSide::Golden);

        let (ctl, _, _ffdc) = controller(vec![" 00 0xffff 01"], None);
        assert!(matches!(
            ctl.get_side_activated().await,
            Err(BmcError::UnknownSide)
        ));
    }

    #[tokio::test]
    async fn preserve_lan_fails_on_error_marker() {
        let (ctl, _, _ffdc) = controller(vec![""], None);
        ctl.preserve_network_setting().await.unwrap();

        let (ctl, _, _ffdc) = controller(
            vec!["Unable to send RAW command (channel=0x0 netfn=0x32 lun=0x0 cmd=0xba)"],
            None,
        );
        assert!(matches!(
            ctl.preserve_network_setting().await,
            Err(BmcError::ToolError { op: "preserve lan", .. })
        ));
    }

    #[tokio::test]
    async fn os_level_validates_then_reads_release() {
        let (ctl, runner, _ffdc) = controller(
            vec![PING_OK, "NAME=\"Ubuntu\"\nVERSION=\"22.04\""],
            Some("10.0.0.5"),
        );
        let release = ctl.inband_get_os_level().await.unwrap();
        assert!(release.contains("Ubuntu"));
        assert!(runner.calls()[1].contains("cat /etc/os-release"));
    }
}
