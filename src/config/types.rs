//! Test configuration structs and defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub bmc: BmcSettings,
    pub lpar: LparSettings,
    pub ffdc: FfdcSettings,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Connection parameters for the BMC under test. Immutable for the lifetime
/// of a controller instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmcSettings {
    pub address: String,
    pub user: String,
    pub password: String,
}

/// Connection parameters for the attached partition. `address` may be absent
/// when no partition is cabled up; in-band operations then fail fast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LparSettings {
    pub address: Option<String>,
    pub user: String,
    pub password: String,
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfdcSettings {
    /// Directory receiving host_sol.log and SEL dumps
    pub dir: String,
    /// SOL logger helper invoked as `<helper> <ip> <user> <password> <logfile>`
    #[serde(default = "default_sol_logger")]
    pub sol_logger: String,
}

pub fn default_sol_logger() -> String {
    "sol_logger.exp".to_string()
}

/// Every fixed delay and poll interval, parameterized so tests can run with
/// near-zero durations instead of multi-minute sleeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    /// Settle time between `sel clear` and the verification listing
    pub sel_settle_secs: u64,
    /// Delay between the pre-capture `sol deactivate` and spawning the logger
    pub sol_restart_delay_secs: u64,
    /// Warm-up before the first IPL sensor poll (firmware reports the host
    /// sensor as working right after power on; polling too early lies)
    pub ipl_warmup_secs: u64,
    /// Interval between IPL sensor polls
    pub ipl_poll_secs: u64,
    /// Settle time after a cold reset acknowledgement
    pub cold_reset_settle_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sel_settle_secs: 3,
            sol_restart_delay_secs: 2,
            ipl_warmup_secs: 60,
            ipl_poll_secs: 5,
            cold_reset_settle_secs: 150,
        }
    }
}

impl Timing {
    pub fn sel_settle(&self) -> Duration {
        Duration::from_secs(self.sel_settle_secs)
    }

    pub fn sol_restart_delay(&self) -> Duration {
        Duration::from_secs(self.sol_restart_delay_secs)
    }

    pub fn ipl_warmup(&self) -> Duration {
        Duration::from_secs(self.ipl_warmup_secs)
    }

    pub fn ipl_poll(&self) -> Duration {
        Duration::from_secs(self.ipl_poll_secs)
    }

    pub fn cold_reset_settle(&self) -> Duration {
        Duration::from_secs(self.cold_reset_settle_secs)
    }
}

/// Bounded retry for partition reachability: power cycle, wait, re-check,
/// up to `max_attempts` times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub wait_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            wait_secs: 600,
        }
    }
}

impl RetryPolicy {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            bmc: BmcSettings {
                address: "[BMC_IP]".to_string(), // Placeholder forces user configuration
                user: "admin".to_string(),
                password: "admin".to_string(),
            },
            lpar: LparSettings {
                address: None,
                user: "root".to_string(),
                password: String::new(),
                kind: "openpower".to_string(),
                id: "lpar0".to_string(),
            },
            ffdc: FfdcSettings {
                dir: "./ffdc".to_string(),
                sol_logger: default_sol_logger(),
            },
            timing: Timing::default(),
            retry: RetryPolicy::default(),
        }
    }
}
