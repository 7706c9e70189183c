//! ipmitool sub-command vocabulary and the marker strings its text output is
//! matched against. The markers track the tool and AMI firmware versions used
//! in the lab; a tool upgrade audit starts and ends in this file.

// Chassis power control
pub const POWER_OFF: &str = "chassis power off";
pub const POWER_ON: &str = "chassis power on";
pub const POWER_OFF_MARKER: &str = "Down/Off";
pub const POWER_ON_MARKER: &str = "Up/On";

// SEL management
pub const SEL_CLEAR: &str = "sel clear";
pub const SEL_LIST: &str = "sel elist";
pub const SEL_CLEARING_MARKER: &str = "Clearing SEL";
pub const SEL_EMPTY_MARKER: &str = "no entries";

// BMC cold reset
pub const COLD_RESET: &str = "mc reset cold";
pub const COLD_RESET_MARKER: &str = "Sent cold reset command to MC";

// Serial-over-LAN
pub const SOL_DEACTIVATE: &str = "sol deactivate";
pub const SOL_LOG_FILE: &str = "host_sol.log";

// IPL completion. The host status sensor reads working right after power on,
// so the OCC Active sensor in Device Enabled state is the completion marker.
pub const IPL_POLL: &str = "sdr elist |grep 'OCC Active'";
pub const IPL_DONE_MARKER: &str = "Device Enabled";

// HPM firmware update
pub const HPM_UPDATE: &str = "hpm upgrade ";
pub const HPM_SUCCESS_MARKER: &str = "Firmware upgrade procedure successful";

// LAN setting preservation across updates (AMI OEM raw command)
pub const LAN_PRESERVE: &str = "raw 0x32 0xba 0x18 0x00";
pub const LAN_ERROR_MARKER: &str = "Unable to send RAW command";

// Active firmware side query (AMI OEM raw command)
pub const ACTIVE_SIDE: &str = "raw 0x32 0x8f 0x08 0x01";
pub const PRIMARY_SIDE_MARKER: &str = "0x0080";
pub const GOLDEN_SIDE_MARKER: &str = "0x0180";

// PNOR build level query (AMI OEM raw command)
pub const PNOR_LEVEL: &str = "raw 0x3a 0x0b";

// Partition OS release query, run over SSH
pub const GET_OS_RELEASE: &str = "cat /etc/os-release";
