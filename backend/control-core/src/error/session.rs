use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("Bind Error: {message} {location}")]
    Bind {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    /// The readiness wait itself failed. Aborts the current pass; the
    /// session stays usable and the next caller-driven wait starts fresh.
    #[error("Poll Error: {message} {location}")]
    Poll {
        message: String,
        location: ErrorLocation,
    },

    /// Read or write failure on one peer socket. Recovery is local: the
    /// peer is deregistered and all other peers keep being serviced.
    #[error("Peer IO Error: {message} {location}")]
    PeerIo {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for SessionError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        SessionError::Poll {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
