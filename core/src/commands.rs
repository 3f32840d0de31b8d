//! Remote command strings and paths.
//!
//! The provisioned host runs cloud-init; these are the only ways the watcher
//! talks to it.

use converge_protocols::log::{INSTALL_LOG, ProgressCursor};

/// Cheapest possible round trip.
pub const PROBE: &str = "true";
pub const STATUS: &str = "cloud-init status";
pub const STATUS_LONG: &str = "cloud-init status --long";
/// Present once a previous provisioning finished.
pub const PROVISIONED_MARKER: &str = "test -f /var/lib/cloud/instance/boot-finished";
/// Drops cloud-init state and logs, then reboots. The connection dies with it.
pub const RESET: &str = "sudo cloud-init clean --logs --reboot";
pub const MESH_SELF_ADDRESS: &str = "tailscale ip -4";
pub const DEFAULT_HEALTH_CHECK: &str = "sudo /usr/local/bin/platform-health";

pub const STAGING_PATH: &str = "/tmp/converge-user-data";
pub const SEED_DIR: &str = "/var/lib/cloud/seed/nocloud";

pub fn read_log(cursor: &ProgressCursor) -> String {
    format!("sudo tail -n +{} {INSTALL_LOG} 2>/dev/null", cursor.next_line())
}

/// Moves the staged user data into the NoCloud seed.
///
/// A fresh instance id makes cloud-init treat the next boot as a first boot.
pub fn install_seed(instance_id: &str) -> String {
    format!(
        "sudo install -d -m 0755 {SEED_DIR} \
         && sudo install -m 0600 {STAGING_PATH} {SEED_DIR}/user-data \
         && printf 'instance-id: {instance_id}\\nlocal-hostname: %s\\n' \"$(hostname)\" \
         | sudo tee {SEED_DIR}/meta-data >/dev/null \
         && rm -f {STAGING_PATH}"
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
