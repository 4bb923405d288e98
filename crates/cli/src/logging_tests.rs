// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn wire_levels_map_onto_tracing_filters() {
    assert_eq!(LogLevel::All.as_filter(), "trace");
    assert_eq!(LogLevel::Trace.as_filter(), "trace");
    assert_eq!(LogLevel::Debug.as_filter(), "debug");
    assert_eq!(LogLevel::Info.as_filter(), "info");
    assert_eq!(LogLevel::Warn.as_filter(), "warn");
    assert_eq!(LogLevel::Error.as_filter(), "error");
    assert_eq!(LogLevel::Fatal.as_filter(), "error");
    assert_eq!(LogLevel::Mark.as_filter(), "error");
    assert_eq!(LogLevel::Off.as_filter(), "off");
}

#[test]
fn child_arg_names_round_trip_through_clap() {
    use clap::ValueEnum;
    for level in LogLevel::value_variants() {
        let parsed = LogLevel::from_str(level.as_arg(), false).unwrap();
        assert_eq!(parsed, *level);
    }
}
