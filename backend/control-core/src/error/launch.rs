use common::ErrorLocation;

use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LaunchError {
    /// The configured viewer executable does not exist on disk.
    /// No process is spawned when this is raised.
    #[error("Missing Executable: {path}: {message} {location}")]
    MissingExecutable {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
    },

    #[error("Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },
}
