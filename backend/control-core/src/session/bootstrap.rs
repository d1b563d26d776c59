//! One-time bootstrap exchange for newly accepted peers.
//!
//! Every accepted peer passes through the pending queue exactly once. The
//! bootstrap sends a single command - the configured specialization tag if
//! there is one, a status probe otherwise - and waits for the reply within
//! the usual read budget. A timed-out bootstrap still marks the peer
//! initialized; it remains fully usable for later commands.

use crate::session::ViewerSession;
use crate::session::command::wire;

use log::{debug, trace};

impl ViewerSession {
    /// Drain the pending-new queue and bootstrap each entry.
    ///
    /// Snapshot semantics: peers accepted *during* a bootstrap exchange land
    /// in the (now empty) queue and are processed on the next drain, so no
    /// peer is ever bootstrapped twice.
    pub(crate) async fn setup_new_peers(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let batch: Vec<_> = self.pending.drain(..).collect();
        debug!("Setting up {} new viewer connection(s)", batch.len());

        for id in batch {
            if !self.registry.contains(id) {
                trace!("{id} disconnected before bootstrap");
                continue;
            }

            let command = if self.config.specialization.is_empty() {
                wire::GET_STATUS.to_string()
            } else {
                wire::set_specialization(&self.config.specialization)
            };

            let reply = self.send_and_await_reply(id, &command).await;
            debug!("Bootstrap reply from {id}: {reply:?}");

            // Initialized whether or not a reply arrived in time.
            self.registry.mark_initialized(id);
        }
    }
}
