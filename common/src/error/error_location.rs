//! Source-location capture for error values.

use serde::Serialize;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location as PanicLocation;

/// Where in the control workspace an error was raised.
///
/// Every error variant in the workspace carries one of these, filled in at
/// the raise site with `ErrorLocation::from(Location::caller())` (with
/// `#[track_caller]` on helpers so the recorded site is the caller, not the
/// helper). Serializable so an error can cross a process boundary without
/// losing the pointer back into the source.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ErrorLocation {
    /// Source file path as the compiler recorded it.
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl ErrorLocation {
    /// Capture the file, line, and column of `location`.
    ///
    /// `const` so a location can also be baked into a static.
    pub const fn from(location: &'static PanicLocation<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl Display for ErrorLocation {
    /// Renders as `[file:line:column]`, the trailing element of every error
    /// message in the workspace.
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "[{}:{}:{}]", self.file, self.line, self.column)
    }
}
