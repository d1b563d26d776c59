//! The viewer control session.
//!
//! A [`ViewerSession`] owns one listening TCP endpoint, the registry of
//! connected peers, and the queue of freshly accepted peers awaiting their
//! bootstrap exchange. It is the single execution context that ever touches
//! those sockets: every operation takes `&mut self`, commands run strictly
//! one at a time, and the only suspension point is the bounded readiness
//! wait inside a pass. No locks, no shared state, no background tasks.
//!
//! # Lifecycle
//!
//! 1. [`start_server`](ViewerSession::start_server) binds an ephemeral port
//!    (idempotent).
//! 2. [`launch_viewer`](ViewerSession::launch_viewer) spawns the viewer
//!    executable, passing that port.
//! 3. [`wait_for_connection`](ViewerSession::wait_for_connection) blocks (one
//!    bounded readiness pass) until the viewer has connected back.
//! 4. Command helpers ([`get_status`](ViewerSession::get_status),
//!    [`open_file`](ViewerSession::open_file), ...) drive the viewer for the
//!    rest of the session.
//!
//! Any TCP client may connect to the endpoint, not just the launched viewer;
//! strays are registered, bootstrapped, and serviced like any peer, but
//! commands only ever target the first-registered (primary) peer.

mod bootstrap;
pub(crate) mod command;
mod event;
pub(crate) mod registry;

pub use crate::error::session::SessionError;
pub use registry::PeerId;

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::launch::launch_viewer_process;
use registry::PeerRegistry;

use common::ErrorLocation;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::panic::Location;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::net::TcpListener;

/// Listen backlog requested from the OS.
const LISTEN_BACKLOG: u32 = 5;

/// A control session over one launched viewer process.
pub struct ViewerSession {
    config: SessionConfig,
    listener: Option<TcpListener>,
    registry: PeerRegistry,
    pending: VecDeque<PeerId>,
}

impl ViewerSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            listener: None,
            registry: PeerRegistry::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Bind the listening endpoint if it does not exist yet.
    ///
    /// Idempotent: once an endpoint exists this returns Ok without touching
    /// it, so the resolved port never changes for the session's lifetime.
    /// The port is OS-assigned (ephemeral), bound on all interfaces.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bind`] if the socket cannot be bound.
    pub async fn start_server(&mut self) -> Result<(), SessionError> {
        if self.listener.is_some() {
            debug!("start_server: endpoint already exists");
            return Ok(());
        }

        let socket = tokio::net::TcpSocket::new_v4().map_err(|e| SessionError::Bind {
            message: format!("Failed to create listening socket: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;
        socket
            .bind(SocketAddr::from(([0, 0, 0, 0], 0)))
            .map_err(|e| SessionError::Bind {
                message: format!("Failed to bind listening socket: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;
        let listener = socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| SessionError::Bind {
                message: format!("Failed to listen: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        if let Ok(addr) = listener.local_addr() {
            info!("Listening for viewer connections on port {}", addr.port());
        }

        self.listener = Some(listener);
        Ok(())
    }

    /// The resolved listening port, once [`start_server`](Self::start_server)
    /// has run.
    pub fn port(&self) -> Option<u16> {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|a| a.port())
    }

    /// Launch the configured viewer executable against this session's
    /// endpoint.
    ///
    /// Starts the server first if needed. Returns as soon as the process is
    /// spawned; it has not connected back yet. Follow up with
    /// [`wait_for_connection`](Self::wait_for_connection).
    ///
    /// # Returns
    ///
    /// * `Ok(pid)` - Viewer spawned and detached
    /// * `Err(CoreError::Launch)` - Executable missing or spawn failed
    /// * `Err(CoreError::Session)` - Listener could not be bound
    pub async fn launch_viewer(&mut self) -> Result<u32, CoreError> {
        self.start_server().await?;

        let port = self.port().ok_or_else(|| {
            CoreError::Session(SessionError::Poll {
                message: "listener has no resolved port".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        })?;

        let executable = self.config.executable_path.clone();
        let pid = launch_viewer_process(&executable, port)?;
        Ok(pid)
    }

    /// True iff at least one peer is currently connected. Pure predicate,
    /// no I/O.
    pub fn is_connected(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Number of currently connected peers.
    pub fn connected_peers(&self) -> usize {
        self.registry.len()
    }

    /// Perform one readiness pass bounded by `timeout`, bootstrap any newly
    /// accepted peers, and report whether a connection now exists.
    ///
    /// At most one pass: a caller wanting a longer overall wait loops over
    /// this, though a single multi-second timeout usually suffices since the
    /// readiness wait itself covers that duration.
    pub async fn wait_for_connection(&mut self, timeout: Duration) -> bool {
        debug!(
            "Waiting up to {timeout:?} for a viewer connection (port {:?})",
            self.port()
        );

        match self.poll_events(timeout).await {
            Ok(events) => {
                for (peer, line) in events {
                    debug!("Unsolicited line from {peer} while waiting: {line:?}");
                }
            }
            Err(e) => {
                warn!("Readiness wait failed: {e}");
                return false;
            }
        }

        self.setup_new_peers().await;

        let connected = self.is_connected();
        debug!("wait_for_connection -> {connected}");
        connected
    }
}
