//! Readiness passes over the listener and every peer socket.
//!
//! One pass = block (bounded by the caller's budget) until the listener or
//! any registered peer socket becomes ready, then service everything that is
//! ready without blocking. The readiness wait is the only suspension point;
//! accepts and reads after it are non-blocking and may spuriously find
//! nothing, which is fine - the next pass picks the socket up again.

use crate::error::session::SessionError;
use crate::session::ViewerSession;
use crate::session::registry::PeerId;

use common::ErrorLocation;

use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::panic::Location;
use std::pin::Pin;
use std::time::Duration;

use futures_util::future::select_all;
use log::{debug, trace, warn};
use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio::time::timeout as tokio_timeout;

/// Bounded read size per ready socket, matching the wire protocol's short
/// line-oriented replies.
const READ_CHUNK_SIZE: usize = 1024;

/// What a readiness wait woke up for.
enum Readiness {
    /// The listener produced a new inbound connection.
    Incoming(TcpStream, SocketAddr),
    /// A registered peer socket became readable.
    Readable(PeerId),
}

impl ViewerSession {
    /// Run one full readiness pass bounded by `budget` and return every
    /// complete reply line that arrived, tagged with its peer.
    ///
    /// The first event may take up to `budget` to arrive; once something was
    /// ready, the remaining ready sockets are drained with zero-budget waits
    /// so a single pass services everything that is ready right now. The
    /// whole pass shares one deadline: a peer that keeps its socket readable
    /// by streaming continuously cannot extend the pass past `budget`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Poll`] if the readiness wait itself fails.
    /// Per-peer read failures are not errors: the peer is deregistered and
    /// the pass continues.
    pub(crate) async fn poll_events(
        &mut self,
        budget: Duration,
    ) -> Result<Vec<(PeerId, String)>, SessionError> {
        let mut events = Vec::new();
        let deadline = Instant::now() + budget;
        let mut remaining = budget;

        loop {
            match self.wait_for_readiness(remaining).await? {
                None => break,
                Some(readiness) => {
                    self.service_readiness(readiness, &mut events);
                    if Instant::now() >= deadline {
                        debug!("Readiness pass hit its deadline while draining");
                        break;
                    }
                    // Something was ready; sweep the rest without waiting.
                    remaining = Duration::ZERO;
                }
            }
        }

        Ok(events)
    }

    /// Block until the listener or any peer socket is ready, or `budget`
    /// elapses.
    ///
    /// Returns `Ok(None)` on a quiet pass (budget elapsed with nothing
    /// ready). With no listener and no peers there is nothing to watch, so
    /// the budget is simply slept off.
    async fn wait_for_readiness(
        &self,
        budget: Duration,
    ) -> Result<Option<Readiness>, SessionError> {
        type ReadinessFuture<'a> =
            Pin<Box<dyn Future<Output = std::io::Result<Readiness>> + 'a>>;

        let mut waiters: Vec<ReadinessFuture<'_>> = Vec::new();

        if let Some(listener) = &self.listener {
            waiters.push(Box::pin(async move {
                let (stream, addr) = listener.accept().await?;
                Ok(Readiness::Incoming(stream, addr))
            }));
        }

        for peer in self.registry.iter() {
            let id = peer.id;
            let stream = &peer.stream;
            waiters.push(Box::pin(async move {
                stream.ready(Interest::READABLE).await?;
                Ok(Readiness::Readable(id))
            }));
        }

        if waiters.is_empty() {
            tokio::time::sleep(budget).await;
            return Ok(None);
        }

        match tokio_timeout(budget, select_all(waiters)).await {
            Err(_elapsed) => Ok(None),
            Ok((Ok(readiness), _index, _rest)) => Ok(Some(readiness)),
            Ok((Err(e), _index, _rest)) => Err(SessionError::Poll {
                message: format!("Readiness wait failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// React to one readiness event without blocking.
    fn service_readiness(&mut self, readiness: Readiness, events: &mut Vec<(PeerId, String)>) {
        match readiness {
            Readiness::Incoming(stream, addr) => self.accept_connection(stream, addr),
            Readiness::Readable(id) => self.read_from_peer(id, events),
        }
    }

    /// Register a freshly accepted peer and queue it for bootstrap.
    ///
    /// Any bytes the peer pushed immediately on connect are drained and
    /// discarded here; protocol use of the socket only begins with the
    /// bootstrap exchange.
    fn accept_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let mut greeting = [0u8; READ_CHUNK_SIZE];
        match stream.try_read(&mut greeting) {
            Ok(n) if n > 0 => {
                let text = String::from_utf8_lossy(&greeting[..n]);
                debug!("Discarding {n} greeting byte(s) from {addr}: {:?}", text.trim());
            }
            Ok(_) | Err(_) => {}
        }

        let id = self.registry.register(stream, addr);
        self.pending.push_back(id);
        debug!("Accepted connection from {addr} as {id}");
    }

    /// Perform one bounded non-blocking read on a ready peer socket.
    ///
    /// End-of-stream and I/O errors both mean the peer is gone: the socket
    /// is closed and the registry entry removed, with no retry. Complete
    /// lines are appended to `events`.
    fn read_from_peer(&mut self, id: PeerId, events: &mut Vec<(PeerId, String)>) {
        let Some(peer) = self.registry.get_mut(id) else {
            trace!("Readable {id} already deregistered");
            return;
        };

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match peer.stream.try_read(&mut chunk) {
            Ok(0) => {
                debug!("{id} ({}) closed the connection", peer.addr);
                self.registry.remove(id);
            }
            Ok(n) => {
                for line in peer.push_bytes(&chunk[..n]) {
                    trace!("Line from {id}: {line:?}");
                    events.push((id, line));
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                // Spurious readiness; the next pass will retry.
            }
            Err(e) => {
                warn!("Read failed on {id} ({}): {e}", peer.addr);
                self.registry.remove(id);
            }
        }
    }
}
