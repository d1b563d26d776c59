// Unit tests for the wire command grammar. Dispatch and reply correlation
// are covered in integration_tests; these pin the exact command lines the
// viewer parses.

use crate::session::command::wire;

/// **VALUE**: Pins the fixed-grammar command templates byte for byte.
///
/// **WHY THIS MATTERS**: The viewer parses these lines positionally,
/// including the `*` wildcard and the empty quoted plot-name slot. A
/// well-meaning cleanup of "extra" quoting or spacing breaks every helper
/// at once, and only at runtime against a real viewer.
///
/// **BUG THIS CATCHES**: Would catch any drift in verb names, argument
/// order, quoting, or the flag fields.
#[test]
fn given_arguments_when_commands_formatted_then_match_viewer_grammar() {
    assert_eq!(wire::GET_STATUS, "get_status");
    assert_eq!(
        wire::set_specialization("analog_flavor"),
        "set_customer_specialization \"analog_flavor\""
    );
    assert_eq!(wire::open_file("run1.raw"), "open_file \"run1.raw\"");
    assert_eq!(
        wire::create_equivalent_nets("run1.raw", "top.cir"),
        "create_equivalent_nets \"run1.raw\" \"top.cir\""
    );
    assert_eq!(
        wire::link_to_schematic("run1.raw"),
        "use_file_for_link_to_schematic \"run1.raw\" 1"
    );
    assert_eq!(
        wire::add_plot("transients", "analog"),
        "add_plot \"transients\" \"analog\" 1 1"
    );
}

/// **VALUE**: Verifies the color argument interpolates as a bare trailing
/// token when present and as nothing (trailing space retained) when absent.
///
/// **WHY THIS MATTERS**: The viewer treats everything after the `0` flag as
/// an optional color token; the no-color form deliberately keeps the
/// template's trailing separator. Changing either form changes what the
/// viewer parses.
#[test]
fn given_optional_color_when_curve_commands_formatted_then_color_is_trailing_token() {
    // GIVEN/WHEN: A curve with and without a color
    let with_color = wire::add_curve("v(out)", Some("#ff0000"));
    let without_color = wire::add_curve("v(out)", None);

    // THEN: Color appends as the final token; no color leaves the slot empty
    assert_eq!(
        with_color,
        "add_curve_to_plot_by_name * \"\" \"v(out)\" 0 #ff0000"
    );
    assert_eq!(without_color, "add_curve_to_plot_by_name * \"\" \"v(out)\" 0 ");

    assert_eq!(
        wire::add_voltage("xamp.net5", Some("#00ff00")),
        "add_voltage_on_spice_node_to_plot * \"\" \"xamp.net5\" 0 #00ff00"
    );
    assert_eq!(
        wire::add_current("xamp.m1", None),
        "add_current_through_spice_device_to_plot * \"\" \"xamp.m1\" 0 "
    );
}
