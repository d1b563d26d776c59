//! Shared helpers for session integration tests.
//!
//! The fake viewer peers here stand in for the real GUI process: they
//! connect to the session's listener, read newline-terminated commands, and
//! answer with scripted reply lines.

use control_core::config::SessionConfig;
use control_core::session::ViewerSession;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Generous per-command budget for well-behaved scenarios; tests that probe
/// the timeout path build their own config.
pub(crate) const TEST_READ_TIMEOUT_SECS: f64 = 2.0;

pub(crate) fn test_config(specialization: &str) -> SessionConfig {
    SessionConfig {
        specialization: specialization.to_string(),
        read_timeout_secs: TEST_READ_TIMEOUT_SECS,
        debug: true,
        ..SessionConfig::default()
    }
}

/// A session with a started server, plus its resolved port.
pub(crate) async fn started_session(specialization: &str) -> (ViewerSession, u16) {
    let mut session = ViewerSession::new(test_config(specialization));
    session.start_server().await.expect("server should start");
    let port = session.port().expect("started server exposes its port");
    (session, port)
}

pub(crate) async fn connect_peer(port: u16) -> TcpStream {
    TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("peer should connect to the session endpoint")
}

/// Read one newline-terminated command from the session, trimmed. Returns
/// an empty string on end-of-stream.
pub(crate) async fn read_command(stream: &mut TcpStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await.expect("read from session");
        if n == 0 || byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    String::from_utf8_lossy(&line).trim().to_string()
}

pub(crate) async fn send_reply(stream: &mut TcpStream, line: &str) {
    stream
        .write_all(format!("{line}\n").as_bytes())
        .await
        .expect("write reply to session");
}

/// Spawn a fake viewer that answers every command with `reply` until it has
/// served `command_count` commands or the session closes the socket.
/// Resolves to the commands it saw, in order.
pub(crate) fn scripted_peer(
    port: u16,
    reply: &str,
    command_count: usize,
) -> JoinHandle<Vec<String>> {
    let reply = reply.to_string();
    tokio::spawn(async move {
        let mut stream = connect_peer(port).await;
        let mut seen = Vec::new();
        for _ in 0..command_count {
            let command = read_command(&mut stream).await;
            if command.is_empty() {
                break;
            }
            seen.push(command);
            send_reply(&mut stream, &reply).await;
        }
        seen
    })
}
