// Integration tests for command dispatch: round-trip counts, reply
// correlation under cross-talk, and the timeout bound.

use crate::helpers::{
    connect_peer, read_command, scripted_peer, send_reply, started_session, test_config,
};

use control_core::session::ViewerSession;

use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;

/// **VALUE**: Verifies `open_file` without a netlist issues exactly two
/// round trips (open, link-to-schematic), not three.
///
/// **WHY THIS MATTERS**: The equivalent-nets command only makes sense with
/// a netlist; sending it anyway would make the viewer error on every plain
/// file open.
///
/// **BUG THIS CATCHES**: Would catch the optional middle command being sent
/// unconditionally, or the sequence being reordered.
#[tokio::test]
async fn given_no_netlist_when_open_file_called_then_exactly_two_round_trips() {
    // GIVEN: A bootstrapped fake viewer answering "ok"
    let (mut session, port) = started_session("").await;
    let peer = scripted_peer(port, "ok", 3);
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    // WHEN: Opening a file with no netlist
    let reply = session.open_file("a.dat", None).await;

    // THEN: Final reply surfaces, and only two file commands went out
    assert_eq!(reply, "ok");

    drop(session);
    let seen = peer.await.expect("peer task");
    assert_eq!(
        seen,
        vec![
            "get_status",
            "open_file \"a.dat\"",
            "use_file_for_link_to_schematic \"a.dat\" 1",
        ]
    );
}

/// **VALUE**: Verifies `open_file` with a netlist issues all three round
/// trips in order, with the equivalent-nets linking in the middle.
#[tokio::test]
async fn given_netlist_when_open_file_called_then_three_round_trips_in_order() {
    let (mut session, port) = started_session("").await;
    let peer = scripted_peer(port, "ok", 4);
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    let reply = session.open_file("a.dat", Some("top.cir")).await;
    assert_eq!(reply, "ok");

    drop(session);
    let seen = peer.await.expect("peer task");
    assert_eq!(
        seen,
        vec![
            "get_status",
            "open_file \"a.dat\"",
            "create_equivalent_nets \"a.dat\" \"top.cir\"",
            "use_file_for_link_to_schematic \"a.dat\" 1",
        ]
    );
}

/// **VALUE**: Verifies reply correlation under cross-talk: unsolicited text
/// from a second peer during a command's wait window is never returned as
/// the first peer's reply.
///
/// **WHY THIS MATTERS**: Any TCP client can connect to the endpoint. If a
/// stray peer's chatter could satisfy another peer's pending command, a
/// script would act on answers the viewer never gave - the central
/// correlation guarantee of the channel.
///
/// **BUG THIS CATCHES**: Would catch the wait loop accepting the first
/// line from *any* socket instead of filtering on the target peer.
#[tokio::test]
async fn given_noise_from_other_peer_when_awaiting_reply_then_only_target_reply_returned() {
    // GIVEN: A primary viewer that answers slowly...
    let (mut session, port) = started_session("").await;

    let primary = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let bootstrap = read_command(&mut stream).await;
        assert_eq!(bootstrap, "get_status");
        send_reply(&mut stream, "ready").await;

        let command = read_command(&mut stream).await;
        assert_eq!(command, "add_plot \"tran\" \"analog\" 1 1");
        // Give the noisy peer time to talk over us.
        tokio::time::sleep(Duration::from_millis(150)).await;
        send_reply(&mut stream, "plot added").await;

        // Hold the socket open until the session goes away.
        let _ = read_command(&mut stream).await;
    });
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    // ...and a second peer that floods unsolicited lines
    let noisy = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let bootstrap = read_command(&mut stream).await;
        assert_eq!(bootstrap, "get_status");
        send_reply(&mut stream, "ready").await;

        for _ in 0..5 {
            send_reply(&mut stream, "noise").await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        // Keep the socket open so EOF handling does not race the command.
        tokio::time::sleep(Duration::from_millis(500)).await;
    });
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);
    assert_eq!(session.connected_peers(), 2);

    // WHEN: Commanding the primary while the noise arrives
    let reply = session.open_new_plot("tran", "analog").await;

    // THEN: The primary's actual reply comes back, never the noise
    assert_eq!(reply, "plot added");

    drop(session);
    primary.await.expect("primary task");
    noisy.await.expect("noisy task");
}

/// **VALUE**: Verifies the timeout bound: a silent peer makes the command
/// return an empty string within the configured read budget (plus one
/// readiness-wait granularity), never blocking indefinitely.
///
/// **WHY THIS MATTERS**: `send_command` is a synchronous-looking call that
/// internally drives the event loop; its only cancellation mechanism is
/// this budget. An unbounded wait would hang the controlling script
/// forever on a wedged viewer.
///
/// **BUG THIS CATCHES**: Would catch the wait loop resetting its deadline
/// on every pass (cross-talk or spurious readiness would then extend the
/// wait without limit).
#[tokio::test]
async fn given_silent_peer_when_command_sent_then_empty_reply_within_budget() {
    // GIVEN: A short budget and a peer that answers bootstrap, then nothing
    let mut config = test_config("");
    config.read_timeout_secs = 0.3;
    let mut session = ViewerSession::new(config);
    session.start_server().await.expect("server should start");
    let port = session.port().expect("port");

    let peer = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let bootstrap = read_command(&mut stream).await;
        assert_eq!(bootstrap, "get_status");
        send_reply(&mut stream, "ready").await;
        // Swallow the next command, never reply, keep the socket open.
        let _ = read_command(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    // WHEN: Sending a command that will never be answered
    let started = Instant::now();
    let reply = session.get_status().await;
    let elapsed = started.elapsed();

    // THEN: Inconclusive empty reply, inside the budget window
    assert_eq!(reply, "");
    assert!(
        elapsed >= Duration::from_millis(250),
        "Should wait out most of the budget, waited {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(2),
        "Must not exceed the budget by more than scheduling slack, waited {elapsed:?}"
    );

    // The peer is silent, not gone: it must still be registered
    assert!(session.is_connected());

    drop(session);
    peer.abort();
}

/// **VALUE**: Verifies that a peer streaming lines continuously cannot
/// extend a command's wait past the configured budget.
///
/// **WHY THIS MATTERS**: Each readiness pass drains every socket that is
/// ready, and a flooding peer keeps its socket ready forever. Without a
/// shared pass deadline the drain sweep never ends: the command returns
/// only when the flood stops (or never), and the collected lines grow
/// without bound. Any TCP client can connect, so one misbehaving peer
/// must not be able to stall the controlling script.
///
/// **BUG THIS CATCHES**: Would catch the drain sweep looping on readiness
/// alone with no deadline check.
#[tokio::test]
async fn given_flooding_other_peer_when_target_is_silent_then_budget_still_bounds_the_wait() {
    // GIVEN: A short budget and a primary that swallows the command
    let mut config = test_config("");
    config.read_timeout_secs = 0.3;
    let mut session = ViewerSession::new(config);
    session.start_server().await.expect("server should start");
    let port = session.port().expect("port");

    let primary = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let bootstrap = read_command(&mut stream).await;
        assert_eq!(bootstrap, "get_status");
        send_reply(&mut stream, "ready").await;
        let _ = read_command(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    // ...and a second peer that floods lines for several seconds
    let flooder = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let bootstrap = read_command(&mut stream).await;
        assert_eq!(bootstrap, "get_status");
        send_reply(&mut stream, "ready").await;

        let line = format!("{}\n", "x".repeat(512));
        let flood_until = Instant::now() + Duration::from_secs(4);
        while Instant::now() < flood_until {
            if stream.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);
    assert_eq!(session.connected_peers(), 2);

    // WHEN: Sending a command the primary never answers, mid-flood
    let started = Instant::now();
    let reply = session.get_status().await;
    let elapsed = started.elapsed();

    // THEN: Empty reply within the budget; the flood did not extend it
    assert_eq!(reply, "");
    assert!(
        elapsed < Duration::from_secs(2),
        "Flooding peer must not extend the wait, waited {elapsed:?}"
    );

    drop(session);
    primary.abort();
    flooder.abort();
}

/// **VALUE**: Verifies that when the target answers with two lines in one
/// burst, the first is the reply and the second is dropped rather than
/// held over to satisfy the next command.
///
/// **BUG THIS CATCHES**: Would catch a surplus target line being queued as
/// a stale reply, which would desync every later command/reply pairing.
#[tokio::test]
async fn given_target_sends_two_lines_when_awaiting_reply_then_surplus_line_is_dropped() {
    // GIVEN: A peer whose second answer is a two-line burst
    let (mut session, port) = started_session("").await;
    let peer = tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let bootstrap = read_command(&mut stream).await;
        assert_eq!(bootstrap, "get_status");
        send_reply(&mut stream, "idle").await;

        let command = read_command(&mut stream).await;
        assert_eq!(command, "get_status");
        stream
            .write_all(b"busy\nextra detail\n")
            .await
            .expect("write burst");

        let command = read_command(&mut stream).await;
        assert_eq!(command, "get_status");
        send_reply(&mut stream, "idle again").await;
    });
    assert!(session.wait_for_connection(Duration::from_secs(2)).await);

    // WHEN: Querying twice
    let first = session.get_status().await;
    let second = session.get_status().await;

    // THEN: The burst's first line answers the first query only
    assert_eq!(first, "busy");
    assert_eq!(
        second, "idle again",
        "Surplus line must not satisfy a later command"
    );

    drop(session);
    peer.await.expect("peer task");
}
