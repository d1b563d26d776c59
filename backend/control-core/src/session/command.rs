//! Synchronous command dispatch with reply correlation.
//!
//! A command is one newline-terminated line written to a specific peer,
//! answered (if at all) by one line back from that same peer. While a reply
//! is pending the session keeps running readiness passes, so the listener
//! and every other peer stay serviced; lines from other peers are consumed
//! but never mistaken for the awaited reply.
//!
//! # Soft-failure contract
//!
//! Command calls return a plain `String`. An empty string is the single
//! "inconclusive" outcome covering a timed-out reply, a write failure, and a
//! peer that genuinely said nothing - callers must treat it as "no confirmed
//! effect", not as a distinguishable error. The finer taxonomy is visible in
//! the logs only.

use crate::error::session::SessionError;
use crate::session::ViewerSession;
use crate::session::registry::PeerId;

use common::ErrorLocation;

use std::panic::Location;

use log::{debug, trace, warn};
use tokio::time::Instant;

impl ViewerSession {
    /// Write one command line to `target` and wait for its reply line.
    ///
    /// The wait is a structured loop over readiness passes, never exceeding
    /// the configured read budget in total. A write failure deregisters the
    /// peer and yields an empty reply immediately; so does the target
    /// disappearing mid-wait.
    pub(crate) async fn send_and_await_reply(&mut self, target: PeerId, command: &str) -> String {
        let line = format!("{}\n", command.trim());

        if !self.registry.contains(target) {
            debug!("send_and_await_reply: {target} is not registered");
            return String::new();
        }

        trace!("Sending {:?} to {target}", command.trim());

        if let Err(e) = self.write_line(target, &line) {
            warn!("{e} - dropping {target}");
            self.registry.remove(target);
            return String::new();
        }

        let budget = self.config.read_timeout();
        let deadline = Instant::now() + budget;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("No reply from {target} within {budget:?}");
                return String::new();
            }

            let events = match self.poll_events(remaining).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Wait for reply from {target} aborted: {e}");
                    return String::new();
                }
            };

            let mut reply = None;
            for (peer, text) in events {
                if peer != target {
                    // Cross-talk: consumed so the socket does not stall,
                    // surfaced at debug level, never returned to the caller.
                    debug!("Discarding line from {peer} while awaiting {target}: {text:?}");
                } else if reply.is_none() {
                    reply = Some(text);
                } else {
                    debug!("Discarding surplus line from {target} after its reply: {text:?}");
                }
            }

            if let Some(text) = reply {
                trace!("Reply from {target}: {text:?}");
                return text;
            }

            if !self.registry.contains(target) {
                debug!("{target} disconnected while awaiting its reply");
                return String::new();
            }
        }
    }

    /// Write one already-terminated line to `target`'s socket without
    /// blocking.
    ///
    /// A short write counts as a failure: the protocol has no way to resume
    /// a half-sent command, so the peer is dropped by the caller instead.
    fn write_line(&mut self, target: PeerId, line: &str) -> Result<(), SessionError> {
        let Some(peer) = self.registry.get_mut(target) else {
            return Err(SessionError::PeerIo {
                message: format!("{target} is not registered"),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        match peer.stream.try_write(line.as_bytes()) {
            Ok(written) if written == line.len() => Ok(()),
            Ok(written) => Err(SessionError::PeerIo {
                message: format!(
                    "Short write to {target} ({}): {written} of {} bytes",
                    peer.addr,
                    line.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(e) => Err(SessionError::PeerIo {
                message: format!("Write to {target} ({}) failed: {e}", peer.addr),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Send a raw command line to the primary peer and return its reply.
    ///
    /// The generic escape hatch behind every helper below. Returns an empty
    /// string when no peer is connected. Newly accepted peers are
    /// bootstrapped after the exchange.
    pub async fn send_command(&mut self, command: &str) -> String {
        let Some(primary) = self.registry.primary_id() else {
            debug!("send_command: no viewer connected");
            return String::new();
        };

        let reply = self.send_and_await_reply(primary, command).await;
        self.setup_new_peers().await;
        reply
    }

    /// Query the viewer's status.
    pub async fn get_status(&mut self) -> String {
        self.send_command(wire::GET_STATUS).await
    }

    /// Instruct the viewer to open a waveform file.
    ///
    /// With a spice netlist given, the netlist is also read and used to
    /// create curves for electrically equivalent nets. Issues up to three
    /// independent round trips (open, optional equivalent-nets linking,
    /// link-to-schematic); an empty reply on an earlier one does not abort
    /// the later ones.
    ///
    /// # Returns
    ///
    /// The reply to the final (link-to-schematic) command.
    pub async fn open_file(&mut self, waveform_file: &str, spice_netlist_file: Option<&str>) -> String {
        self.send_command(&wire::open_file(waveform_file)).await;

        if let Some(netlist) = spice_netlist_file {
            self.send_command(&wire::create_equivalent_nets(waveform_file, netlist))
                .await;
        }

        self.send_command(&wire::link_to_schematic(waveform_file))
            .await
    }

    /// Find and plot the curve matching `curve_name` on the current plot.
    ///
    /// An optional color is given as `#rrggbb`, e.g. `#ff0000` for red.
    pub async fn add_curve_to_plot(&mut self, curve_name: &str, color: Option<&str>) -> String {
        self.send_command(&wire::add_curve(curve_name, color)).await
    }

    /// Plot the voltage curve for the spice node `node_name` (the viewer
    /// typically names the result `V(node_name)`).
    pub async fn add_voltage_on_node(&mut self, node_name: &str, color: Option<&str>) -> String {
        self.send_command(&wire::add_voltage(node_name, color)).await
    }

    /// Plot the current curve for the spice device `device_name` (the viewer
    /// typically names the result `I(device_name)`).
    pub async fn add_current_through_device(
        &mut self,
        device_name: &str,
        color: Option<&str>,
    ) -> String {
        self.send_command(&wire::add_current(device_name, color)).await
    }

    /// Open a new plot tab. `plot_type` is viewer-defined ("analog",
    /// "digital", "synchronized", ...); "default" lets the viewer choose.
    pub async fn open_new_plot(&mut self, plot_name: &str, plot_type: &str) -> String {
        self.send_command(&wire::add_plot(plot_name, plot_type)).await
    }
}

/// Command-line grammar of the viewer's wire protocol.
///
/// Pure string formatting; interpolated arguments are caller-supplied names
/// the viewer resolves itself.
pub(crate) mod wire {
    pub(crate) const GET_STATUS: &str = "get_status";

    pub(crate) fn set_specialization(tag: &str) -> String {
        format!("set_customer_specialization \"{tag}\"")
    }

    pub(crate) fn open_file(waveform_file: &str) -> String {
        format!("open_file \"{waveform_file}\"")
    }

    pub(crate) fn create_equivalent_nets(waveform_file: &str, netlist_file: &str) -> String {
        format!("create_equivalent_nets \"{waveform_file}\" \"{netlist_file}\"")
    }

    pub(crate) fn link_to_schematic(waveform_file: &str) -> String {
        format!("use_file_for_link_to_schematic \"{waveform_file}\" 1")
    }

    pub(crate) fn add_curve(curve_name: &str, color: Option<&str>) -> String {
        format!(
            "add_curve_to_plot_by_name * \"\" \"{curve_name}\" 0 {}",
            color.unwrap_or("")
        )
    }

    pub(crate) fn add_voltage(node_name: &str, color: Option<&str>) -> String {
        format!(
            "add_voltage_on_spice_node_to_plot * \"\" \"{node_name}\" 0 {}",
            color.unwrap_or("")
        )
    }

    pub(crate) fn add_current(device_name: &str, color: Option<&str>) -> String {
        format!(
            "add_current_through_spice_device_to_plot * \"\" \"{device_name}\" 0 {}",
            color.unwrap_or("")
        )
    }

    // add_plot <plot name> <plot type> <flag new page> <flag make visible>
    pub(crate) fn add_plot(plot_name: &str, plot_type: &str) -> String {
        format!("add_plot \"{plot_name}\" \"{plot_type}\" 1 1")
    }
}
