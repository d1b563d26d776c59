//! Viewer process launching.
//!
//! Spawns the external viewer executable with the listening endpoint on its
//! command line (`<executable> --socket <host> <port>`). The child connects
//! back to the session's listener on its own schedule; waiting for that
//! connection is a separate, explicit step
//! ([`ViewerSession::wait_for_connection`](crate::session::ViewerSession::wait_for_connection)).
//!
//! The child is detached at spawn time. The core never reaps it, never kills
//! it, and never observes its exit; its lifetime belongs to the user and the
//! operating system.

use crate::error::launch::LaunchError;
use crate::{SOCKET_FLAG, VIEWER_HOSTNAME};

use common::ErrorLocation;

use std::mem::forget;
use std::panic::Location;
use std::path::Path;

use log::{debug, info};
use tokio::process::Command as TokioCommand;

pub(crate) fn build_launch_command(executable: &Path, host: &str, port: u16) -> TokioCommand {
    let mut cmd = TokioCommand::new(executable);
    cmd.arg(SOCKET_FLAG).arg(host).arg(port.to_string());
    cmd
}

/// Launch the viewer executable, pointing it at the session's listener.
///
/// Validates that `executable` exists on disk, then spawns it asynchronously
/// and detaches. Returns immediately; the child has not connected yet when
/// this returns.
///
/// # Arguments
///
/// * `executable` - Path to the viewer binary (must exist on disk)
/// * `port` - The listener's resolved port, passed via `--socket`
///
/// # Returns
///
/// * `Ok(pid)` - Process spawned and detached
/// * `Err(LaunchError::MissingExecutable)` - Path not on disk, nothing spawned
/// * `Err(LaunchError::Spawn)` - OS-level spawn failure
#[track_caller]
pub fn launch_viewer_process(executable: &Path, port: u16) -> Result<u32, LaunchError> {
    if !executable.exists() {
        return Err(LaunchError::MissingExecutable {
            path: executable.to_path_buf(),
            message: "viewer executable not found on disk".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    debug!(
        "Launching {} {SOCKET_FLAG} {VIEWER_HOSTNAME} {port}",
        executable.display()
    );

    let child = build_launch_command(executable, VIEWER_HOSTNAME, port)
        .spawn()
        .map_err(|e| LaunchError::Spawn {
            message: format!("Failed to spawn {}: {e}", executable.display()),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

    let pid = child.id().unwrap_or_default();
    info!("Viewer launched (PID: {pid}), expecting connect-back on port {port}");

    // Detach: the viewer keeps running as its own process and the OS cleans
    // it up when it exits.
    forget(child);

    Ok(pid)
}
