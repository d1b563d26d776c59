//! Peer connection registry.
//!
//! Tracks every connected peer in insertion order. The first-registered peer
//! is the "primary" - the implicit target of all outbound commands. Removal
//! is idempotent; a peer is present from accept until explicit removal.

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::net::SocketAddr;

use log::{debug, trace};
use tokio::net::TcpStream;

/// Stable identity for a peer connection.
///
/// Ids are monotonic per session and never reused, so a removal cannot make
/// a stale id suddenly point at a different peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(u64);

impl Display for PeerId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "peer#{}", self.0)
    }
}

pub(crate) struct PeerConnection {
    pub(crate) id: PeerId,
    pub(crate) stream: TcpStream,
    pub(crate) addr: SocketAddr,
    pub(crate) initialized: bool,
    line_buffer: Vec<u8>,
}

impl PeerConnection {
    fn new(id: PeerId, stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            id,
            stream,
            addr,
            initialized: false,
            line_buffer: Vec::new(),
        }
    }

    /// Append freshly read bytes and return every complete line they finish.
    ///
    /// Incomplete trailing data stays buffered until a later read supplies
    /// the newline, so replies split across reads still come out whole.
    pub(crate) fn push_bytes(&mut self, data: &[u8]) -> Vec<String> {
        self.line_buffer.extend_from_slice(data);
        split_complete_lines(&mut self.line_buffer)
    }
}

/// Drain every newline-terminated line out of `buffer`, trimmed and decoded
/// as UTF-8 (lossy). Blank lines are dropped. Bytes after the last newline
/// remain in the buffer.
pub(crate) fn split_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(newline_index) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=newline_index).collect();
        let text = String::from_utf8_lossy(&raw).trim().to_string();
        if !text.is_empty() {
            lines.push(text);
        }
    }
    lines
}

/// Insertion-ordered collection of connected peers.
pub(crate) struct PeerRegistry {
    peers: Vec<PeerConnection>,
    next_id: u64,
}

impl PeerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            peers: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.peers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub(crate) fn register(&mut self, stream: TcpStream, addr: SocketAddr) -> PeerId {
        let id = PeerId(self.next_id);
        self.next_id += 1;
        self.peers.push(PeerConnection::new(id, stream, addr));
        debug!("Registered {id} from {addr} ({} connected)", self.len());
        id
    }

    /// Remove and close a peer. Idempotent: removing an absent id is a no-op.
    pub(crate) fn remove(&mut self, id: PeerId) -> bool {
        let before = self.peers.len();
        // Dropping the TcpStream closes the socket.
        self.peers.retain(|p| p.id != id);
        let removed = self.peers.len() < before;
        if removed {
            debug!("Removed {id} ({} still connected)", self.len());
        } else {
            trace!("Remove for absent {id} ignored");
        }
        removed
    }

    pub(crate) fn contains(&self, id: PeerId) -> bool {
        self.peers.iter().any(|p| p.id == id)
    }

    /// The first-registered peer - the implicit command target.
    pub(crate) fn primary_id(&self) -> Option<PeerId> {
        self.peers.first().map(|p| p.id)
    }

    pub(crate) fn get_mut(&mut self, id: PeerId) -> Option<&mut PeerConnection> {
        self.peers.iter_mut().find(|p| p.id == id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PeerConnection> {
        self.peers.iter()
    }

    pub(crate) fn mark_initialized(&mut self, id: PeerId) {
        if let Some(peer) = self.get_mut(id)
            && !peer.initialized
        {
            peer.initialized = true;
            trace!("{id} marked initialized");
        }
    }
}
