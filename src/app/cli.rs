//! Command-line argument definitions (clap) and help text.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bmc-boot-test")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BMC boot-test helper - power, firmware and SOL capture via ipmitool", long_about = None)]
pub struct Args {
    /// Path to the JSON config file (default: config.json beside the binary)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Power the chassis on
    PowerOn,

    /// Power the chassis off
    PowerOff,

    /// Cold reset the BMC and wait for it to settle
    ColdReset,

    /// Clear the SEL and verify it is empty
    SdrClear,

    /// Dump the SEL to the FFDC log and fail if a marker string is present
    SelCheck {
        /// Error-log marker to search for
        #[arg(long, default_value = "Transition to Non-recoverable")]
        marker: String,
    },

    /// Start SOL capture and wait for the IPL to reach working state
    IplWait {
        /// Minutes to poll before giving up
        #[arg(long = "timeout-mins", default_value_t = 10)]
        timeout_mins: u64,
    },

    /// Flash an HPM image through the BMC and cold reset
    CodeUpdate {
        /// Path to the .hpm image
        #[arg(long)]
        image: String,

        /// hpm upgrade component argument (e.g. "component 2")
        #[arg(long, default_value = "component 2")]
        component: String,
    },

    /// Flash an HPM image from inside the partition over the usb interface
    InbandCodeUpdate {
        /// Path to the .hpm image
        #[arg(long)]
        image: String,

        /// hpm upgrade component argument
        #[arg(long, default_value = "component 2")]
        component: String,
    },

    /// Preserve the BMC network settings across a firmware update
    PreserveLan,

    /// Report which firmware side (primary or golden) is active
    ActiveSide,

    /// Print the PNOR build level
    PnorLevel,

    /// Print the partition's OS release (runs over SSH)
    OsLevel,

    /// Check the partition is reachable, power cycling once if not
    ValidateLpar,

    /// Print the current configuration
    Config {
        /// Also write the effective configuration to this path
        #[arg(long)]
        save: Option<String>,
    },
}
