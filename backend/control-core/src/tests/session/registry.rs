// Unit tests for the peer registry and the line assembly used by reads.

use crate::session::registry::{PeerRegistry, split_complete_lines};

use tokio::net::{TcpListener, TcpStream};

/// Open a loopback connection and hand back the accept-side stream plus its
/// remote address, the way the session sees a freshly accepted peer.
async fn accepted_stream(listener: &TcpListener) -> (TcpStream, std::net::SocketAddr) {
    let port = listener.local_addr().expect("listener addr").port();
    let client = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("connect");
    let (server, addr) = listener.accept().await.expect("accept");
    // The client half may drop; only the accept side is under test.
    std::mem::forget(client);
    (server, addr)
}

async fn test_listener() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").await.expect("bind")
}

/// **VALUE**: Verifies complete lines come out trimmed while a trailing
/// fragment stays buffered until its newline arrives.
///
/// **WHY THIS MATTERS**: Replies can arrive split across reads. If a
/// fragment were surfaced early, a command would return half a reply and
/// the other half would corrupt the next command's reply.
///
/// **BUG THIS CATCHES**: Would catch a rewrite that flushes the buffer on
/// every read instead of only up to the last newline.
#[test]
fn given_partial_reads_when_split_then_only_complete_lines_surface() {
    // GIVEN: A buffer fed in fragments
    let mut buffer = Vec::new();

    buffer.extend_from_slice(b"id");
    assert!(
        split_complete_lines(&mut buffer).is_empty(),
        "No newline yet, nothing surfaces"
    );

    // WHEN: The newline and the start of the next line arrive
    buffer.extend_from_slice(b"le\nrun");
    let lines = split_complete_lines(&mut buffer);

    // THEN: The finished line surfaces, the fragment stays buffered
    assert_eq!(lines, vec!["idle".to_string()]);
    assert_eq!(buffer, b"run");
}

/// **VALUE**: Verifies multiple lines in one read all surface, in order,
/// with blank lines dropped and CRLF endings trimmed.
#[test]
fn given_multiple_lines_in_one_chunk_when_split_then_all_surface_in_order() {
    let mut buffer = b"ok\r\n\nplot added\n".to_vec();

    let lines = split_complete_lines(&mut buffer);

    assert_eq!(lines, vec!["ok".to_string(), "plot added".to_string()]);
    assert!(buffer.is_empty());
}

/// **VALUE**: Verifies the registry keeps insertion order and that the
/// primary is always the first-registered surviving peer.
///
/// **WHY THIS MATTERS**: Every command implicitly targets the primary. If
/// order were lost, a stray connection could hijack the command stream from
/// the launched viewer.
#[tokio::test]
async fn given_two_peers_when_first_removed_then_second_becomes_primary() {
    // GIVEN: Two registered peers
    let listener = test_listener().await;
    let mut registry = PeerRegistry::new();

    let (stream_a, addr_a) = accepted_stream(&listener).await;
    let (stream_b, addr_b) = accepted_stream(&listener).await;
    let first = registry.register(stream_a, addr_a);
    let second = registry.register(stream_b, addr_b);

    assert_eq!(registry.primary_id(), Some(first));
    assert_eq!(registry.len(), 2);

    // WHEN: The first peer is removed
    assert!(registry.remove(first));

    // THEN: The second peer is now primary
    assert_eq!(registry.primary_id(), Some(second));
    assert_eq!(registry.len(), 1);
}

/// **VALUE**: Verifies removal is idempotent and the size never goes
/// negative or double-decrements.
///
/// **BUG THIS CATCHES**: Would catch a removal path that panics or corrupts
/// the count when a peer disconnects while it is also being dropped for a
/// failed write.
#[tokio::test]
async fn given_removed_peer_when_removed_again_then_noop() {
    let listener = test_listener().await;
    let mut registry = PeerRegistry::new();

    let (stream, addr) = accepted_stream(&listener).await;
    let id = registry.register(stream, addr);

    assert!(registry.remove(id), "First removal removes");
    assert!(!registry.remove(id), "Second removal is a no-op");
    assert!(registry.is_empty());
    assert!(!registry.contains(id));
}

/// **VALUE**: Verifies `mark_initialized` flips the flag exactly once and
/// tolerates ids that are already gone.
#[tokio::test]
async fn given_peer_when_marked_initialized_then_flag_set_once() {
    let listener = test_listener().await;
    let mut registry = PeerRegistry::new();

    let (stream, addr) = accepted_stream(&listener).await;
    let id = registry.register(stream, addr);

    assert!(!registry.get_mut(id).expect("present").initialized);

    registry.mark_initialized(id);
    assert!(registry.get_mut(id).expect("present").initialized);

    // Marking again (and marking after removal) must not panic
    registry.mark_initialized(id);
    registry.remove(id);
    registry.mark_initialized(id);
}
