// Integration tests for server bootstrap, launch failure, connection
// waiting, and the one-time bootstrap exchange.

use crate::helpers::{
    connect_peer, read_command, scripted_peer, send_reply, started_session, test_config,
};

use control_core::error::CoreError;
use control_core::error::launch::LaunchError;
use control_core::session::ViewerSession;

use std::path::PathBuf;
use std::time::Duration;

/// **VALUE**: Verifies `start_server` is idempotent: the second call keeps
/// the first call's endpoint and port.
///
/// **WHY THIS MATTERS**: `launch_viewer` calls `start_server` internally
/// and hands the resolved port to the child on its command line. If a
/// second call rebound the socket, the already-launched viewer would
/// connect back to a dead port.
///
/// **BUG THIS CATCHES**: Would catch the "endpoint exists" guard being
/// dropped, which silently changes the port between launch and connect.
#[tokio::test]
async fn given_started_server_when_started_again_then_port_is_unchanged() {
    // GIVEN: A started session
    let (mut session, port) = started_session("").await;

    // WHEN: Starting the server again
    session
        .start_server()
        .await
        .expect("second start should succeed");

    // THEN: Same port both times
    assert_eq!(session.port(), Some(port), "Port must not change");
}

/// **VALUE**: Verifies the launch-failure scenario: a nonexistent
/// executable fails with `MissingExecutable` and no peer ever appears.
///
/// **BUG THIS CATCHES**: Would catch the existence check being skipped, or
/// a failed launch leaving the session looking connected.
#[tokio::test]
async fn given_nonexistent_executable_when_launched_then_fails_and_no_peer_registered() {
    // GIVEN: A session configured with a missing binary
    let mut config = test_config("");
    config.executable_path = PathBuf::from("/nonexistent/binary");
    let mut session = ViewerSession::new(config);

    // WHEN: Launching
    let result = session.launch_viewer().await;

    // THEN: MissingExecutable, and the registry stays empty
    assert!(
        matches!(
            result,
            Err(CoreError::Launch(LaunchError::MissingExecutable { .. }))
        ),
        "Expected MissingExecutable"
    );
    assert!(!session.is_connected());
    assert_eq!(session.connected_peers(), 0);
}

/// **VALUE**: Verifies the status-probe bootstrap scenario end to end: a
/// connecting peer is probed with `get_status` exactly once, and a later
/// explicit `get_status()` call sends the probe again and returns the
/// trimmed reply.
///
/// **WHY THIS MATTERS**: This is the core accept → bootstrap → command
/// sequence every session goes through. Double bootstrap would desync the
/// command/reply pairing for the rest of the session.
///
/// **BUG THIS CATCHES**: Would catch a peer passing through the pending
/// queue twice, or replies coming back untrimmed.
#[tokio::test]
async fn given_connected_peer_when_bootstrapped_then_status_probe_sent_exactly_once() {
    // GIVEN: A session and a fake viewer answering "idle"
    let (mut session, port) = started_session("").await;
    let peer = scripted_peer(port, "idle", 2);

    // WHEN: Waiting for the connection (accept + bootstrap), then querying
    let connected = session.wait_for_connection(Duration::from_secs(2)).await;
    assert!(connected, "Peer should be connected after one pass");

    let status = session.get_status().await;

    // THEN: The reply is trimmed, and the peer saw exactly two probes
    // (bootstrap + explicit query)
    assert_eq!(status, "idle");

    drop(session);
    let seen = peer.await.expect("peer task");
    assert_eq!(seen, vec!["get_status", "get_status"]);
}

/// **VALUE**: Verifies that a configured specialization replaces the status
/// probe in the bootstrap exchange.
///
/// **BUG THIS CATCHES**: Would catch the specialization branch regressing
/// to the probe, which downgrades every customer-specific viewer session.
#[tokio::test]
async fn given_specialization_configured_when_peer_connects_then_tag_is_announced() {
    // GIVEN: A session with a specialization tag
    let (mut session, port) = started_session("analog_flavor").await;
    let peer = scripted_peer(port, "ok", 1);

    // WHEN: The peer connects and bootstraps
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    // THEN: The bootstrap command announced the tag
    drop(session);
    let seen = peer.await.expect("peer task");
    assert_eq!(seen, vec!["set_customer_specialization \"analog_flavor\""]);
}

/// **VALUE**: Verifies the dead-peer scenario: a peer that disconnects
/// after bootstrap yields an empty reply on the next command and vanishes
/// from the registry.
///
/// **WHY THIS MATTERS**: Viewer crashes are routine. The declared recovery
/// is local and silent: empty reply, peer deregistered, session intact for
/// a relaunch.
///
/// **BUG THIS CATCHES**: Would catch the EOF/error path failing to
/// deregister, leaving commands forever timing out against a ghost peer.
#[tokio::test]
async fn given_peer_disconnected_when_command_sent_then_empty_reply_and_deregistered() {
    // GIVEN: A peer that serves only the bootstrap, then closes
    let (mut session, port) = started_session("").await;
    let peer = scripted_peer(port, "idle", 1);

    assert!(session.wait_for_connection(Duration::from_secs(2)).await);
    peer.await.expect("peer closed after bootstrap");

    // WHEN: Sending a command to the now-dead peer
    let reply = session.send_command("get_status").await;

    // THEN: Soft failure, and the registry no longer contains the peer
    assert_eq!(reply, "");
    assert!(!session.is_connected());
    assert_eq!(session.connected_peers(), 0);
}

/// **VALUE**: Verifies that bytes a peer pushes immediately on connect are
/// tolerated: they never surface as a command reply and the session keeps
/// working normally.
///
/// **BUG THIS CATCHES**: Would catch a connect-time greeting being left in
/// the receive path where it would be mistaken for the next reply.
#[tokio::test]
async fn given_peer_greets_on_connect_when_status_queried_then_reply_is_clean() {
    // GIVEN: A peer that sends an unsolicited greeting before bootstrap
    let (mut session, port) = started_session("").await;
    let peer = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        send_reply(&mut stream, "hello from viewer").await;
        let mut seen = Vec::new();
        for _ in 0..2 {
            let command = read_command(&mut stream).await;
            if command.is_empty() {
                break;
            }
            seen.push(command);
            send_reply(&mut stream, "idle").await;
        }
        seen
    });

    // WHEN: Connecting and querying status
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);
    let status = session.get_status().await;

    // THEN: The greeting never leaks into a reply
    assert_eq!(status, "idle");

    drop(session);
    let seen = peer.await.expect("peer task");
    assert_eq!(seen, vec!["get_status", "get_status"]);
}

/// **VALUE**: Verifies the registry size invariant across accepts and
/// deregistrations, and that the next-registered peer takes over as the
/// primary command target.
///
/// **WHY THIS MATTERS**: Registry size must always equal accepts minus
/// removals; command dispatch must follow insertion order when the primary
/// goes away.
#[tokio::test]
async fn given_two_peers_when_primary_dies_then_second_takes_over() {
    // GIVEN: Two connected peers (first is primary). The first holds its
    // socket open until released, so the 2-peer state is stable.
    let (mut session, port) = started_session("").await;

    let (release_first, released) = tokio::sync::oneshot::channel::<()>();
    let first = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let command = read_command(&mut stream).await;
        assert_eq!(command, "get_status", "Bootstrap probes status");
        send_reply(&mut stream, "first-ready").await;
        released.await.ok();
    });
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    let second = scripted_peer(port, "second-ready", 2);
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);
    assert_eq!(session.connected_peers(), 2);

    // WHEN: The primary disconnects and a command is issued
    release_first.send(()).expect("first peer still waiting");
    first.await.expect("first peer closed");
    let reply = session.send_command("get_status").await;

    // THEN: The dead primary is deregistered with an inconclusive reply...
    assert_eq!(reply, "");
    assert_eq!(session.connected_peers(), 1);

    // ...and the surviving peer answers the next command as new primary
    let reply = session.send_command("get_status").await;
    assert_eq!(reply, "second-ready");

    drop(session);
    let seen = second.await.expect("second peer task");
    assert_eq!(seen, vec!["get_status", "get_status"]);
}
