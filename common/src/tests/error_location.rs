use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: ErrorLocation is the foundation of the error tracking
/// used by every error type in the workspace. If it fails to capture accurate
/// location data, all error messages lose their debugging value.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `Location::caller()` stops being propagated correctly
/// - File path extraction breaks
/// - Line/column capture fails
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN/WHEN: Creating ErrorLocation from the current caller location
    let location = ErrorLocation::from(Location::caller());
    let expected_line = line!() - 1;

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(
        location.line, expected_line,
        "Should capture correct line number"
    );
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that ErrorLocation Display formatting produces `[file:line:col]`.
///
/// **WHY THIS MATTERS**: Every error message in the workspace interpolates a
/// location via Display. If the format breaks, log lines lose the pointer back
/// into the source.
///
/// **BUG THIS CATCHES**: Would catch if the Display implementation drops the
/// brackets or one of the three components.
#[test]
fn given_error_location_when_displayed_then_formats_with_brackets_and_colons() {
    // GIVEN: A known location
    let location = ErrorLocation {
        file: "src/session/mod.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting via Display
    let rendered = format!("{location}");

    // THEN: Should match the bracketed colon-separated format
    assert_eq!(rendered, "[src/session/mod.rs:42:7]");
}
