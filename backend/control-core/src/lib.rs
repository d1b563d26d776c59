pub mod config;
pub mod error;
pub mod launch;
pub mod logging;
pub mod session;

#[cfg(test)]
mod tests;

pub const VIEWER_BINARY: &str = "wavescope";
pub const VIEWER_HOSTNAME: &str = "localhost";
pub const SOCKET_FLAG: &str = "--socket";
