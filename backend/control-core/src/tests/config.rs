// Unit tests for SessionConfig defaults, validation, and persistence.

use crate::config::SessionConfig;

use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;

/// **VALUE**: Verifies the documented defaults: 3 second read budget, debug
/// off, no specialization.
///
/// **WHY THIS MATTERS**: The defaults are the contract for callers that
/// construct a session without a config file. A silently changed default
/// read timeout changes how long every command call may block.
///
/// **BUG THIS CATCHES**: Would catch someone editing a serde default
/// function without updating the Default impl (or vice versa).
#[test]
fn given_default_config_when_inspected_then_matches_documented_defaults() {
    // GIVEN/WHEN: A default config
    let config = SessionConfig::default();

    // THEN: Documented defaults hold
    assert_eq!(config.read_timeout_secs, 3.0, "Default read budget is 3s");
    assert!(!config.debug, "Debug is off by default");
    assert!(config.specialization.is_empty(), "No default specialization");
    assert!(config.validate().is_ok(), "Defaults must validate");
}

/// **VALUE**: Verifies that validation rejects negative and non-finite read
/// timeouts.
///
/// **WHY THIS MATTERS**: The read timeout is converted to a `Duration` on
/// every command; a NaN or negative value that slipped through validation
/// would silently collapse every command budget to zero.
///
/// **BUG THIS CATCHES**: Would catch a validation rewrite that checks only
/// `< 0.0` (NaN compares false against everything).
#[test]
fn given_bad_read_timeout_when_validated_then_returns_error() {
    // GIVEN: Configs with invalid timeouts
    for bad in [-1.0, f64::NAN, f64::INFINITY] {
        let config = SessionConfig {
            read_timeout_secs: bad,
            ..SessionConfig::default()
        };

        // WHEN/THEN: Validation rejects each of them
        assert!(
            config.validate().is_err(),
            "Timeout {bad} should fail validation"
        );
    }
}

/// **VALUE**: Verifies the f64-seconds to `Duration` conversion, including
/// the zero fallback for values that cannot form a Duration.
///
/// **BUG THIS CATCHES**: Would catch a refactor that switches to
/// `Duration::from_secs_f64`, which panics on negative input instead of
/// falling back.
#[test]
fn given_timeout_seconds_when_converted_then_yields_expected_duration() {
    let config = SessionConfig {
        read_timeout_secs: 1.5,
        ..SessionConfig::default()
    };
    assert_eq!(config.read_timeout(), Duration::from_millis(1500));

    let broken = SessionConfig {
        read_timeout_secs: -3.0,
        ..SessionConfig::default()
    };
    assert_eq!(
        broken.read_timeout(),
        Duration::ZERO,
        "Unrepresentable timeouts fall back to zero, not panic"
    );
}

/// **VALUE**: Verifies that an empty executable path fails validation.
///
/// **BUG THIS CATCHES**: Would catch the launch path receiving an empty
/// path and producing a confusing spawn error instead of a config error.
#[test]
fn given_empty_executable_path_when_validated_then_returns_error() {
    let config = SessionConfig {
        executable_path: PathBuf::new(),
        ..SessionConfig::default()
    };

    assert!(config.validate().is_err(), "Empty path should fail");
}

/// **VALUE**: Verifies save + load round-trips every field through the JSON
/// file, using the atomic-write path.
///
/// **WHY THIS MATTERS**: Config persistence is the only state that survives
/// a run. A field silently dropped by serde attributes would reset user
/// settings on every restart.
#[test]
fn given_saved_config_when_loaded_then_round_trips_all_fields() {
    // GIVEN: A non-default config saved to a temp dir
    let dir = tempdir().expect("temp dir");
    let config = SessionConfig {
        executable_path: PathBuf::from("/opt/wavescope/bin/wavescope"),
        specialization: "analog_flavor".to_string(),
        read_timeout_secs: 7.5,
        debug: true,
        ..SessionConfig::default()
    };
    config.save(dir.path()).expect("save should succeed");

    // WHEN: Loading it back
    let loaded = SessionConfig::load(dir.path()).expect("load should succeed");

    // THEN: Every field survives
    assert_eq!(loaded.executable_path, config.executable_path);
    assert_eq!(loaded.specialization, config.specialization);
    assert_eq!(loaded.read_timeout_secs, config.read_timeout_secs);
    assert_eq!(loaded.debug, config.debug);
}

/// **VALUE**: Verifies that loading from a directory with no config file
/// yields defaults rather than an error.
#[test]
fn given_missing_config_file_when_loaded_then_returns_defaults() {
    let dir = tempdir().expect("temp dir");

    let loaded = SessionConfig::load(dir.path()).expect("missing file is not an error");

    assert_eq!(loaded.read_timeout_secs, 3.0);
    assert!(!loaded.debug);
}

/// **VALUE**: Verifies that a corrupted config file surfaces a parse error
/// instead of silently falling back.
///
/// **BUG THIS CATCHES**: Would catch the load path swallowing JSON errors,
/// which would hide a truncated file from the user forever.
#[test]
fn given_corrupted_config_file_when_loaded_then_returns_error() {
    let dir = tempdir().expect("temp dir");
    std::fs::write(dir.path().join("config.json"), "{not json").expect("write");

    let result = SessionConfig::load(dir.path());

    assert!(result.is_err(), "Corrupted file should be an error");
}
