// Unit tests for logger initialization logic. The logger is process-global,
// so everything here runs serially and only asserts behavior that is safe
// regardless of test ordering.

use crate::logging::initialize;

use serial_test::serial;
use tempfile::tempdir;

/// **VALUE**: Verifies that calling initialize() twice neither panics nor
/// fails.
///
/// **WHY THIS MATTERS**: Logger initialization can be reached from several
/// entry points (library consumers, tests, examples). fern panics if a
/// global logger is installed twice; the Once/AtomicBool guards exist to
/// absorb that.
///
/// **BUG THIS CATCHES**: Would catch removal of either guard, which crashes
/// the process on the second initialization instead of logging a warning.
#[test]
#[serial]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A writable log directory
    let dir = tempdir().expect("temp dir");

    // WHEN: Initializing twice
    let first = initialize(dir.path(), true);
    let second = initialize(dir.path(), false);

    // THEN: Both calls succeed (the second is a guarded no-op)
    assert!(first.is_ok(), "First initialization should succeed");
    assert!(
        second.is_ok(),
        "Second initialization should succeed (idempotent)"
    );
}
