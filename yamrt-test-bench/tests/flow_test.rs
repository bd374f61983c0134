use yamrt_test_bench::consts::*;
use yamrt_test_bench::{assert_eq_event, assert_event_err};

#[test]
fn flow_collections() {
    assert_eq_event(FLOW_SEQ_INPUT, FLOW_SEQ_EVENTS);
    assert_eq_event(FLOW_MAP_INPUT, FLOW_MAP_EVENTS);
    assert_eq_event(FLOW_MULTILINE_INPUT, FLOW_MULTILINE_EVENTS);
}

#[test]
fn flow_implicit_entries() {
    assert_eq_event(FLOW_PAIR_INPUT, FLOW_PAIR_EVENTS);
    assert_eq_event(FLOW_MISSING_VALUE_INPUT, FLOW_MISSING_VALUE_EVENTS);
}

#[test]
fn flow_inside_block() {
    assert_eq_event(FLOW_IN_BLOCK_INPUT, FLOW_IN_BLOCK_EVENTS);
}

#[test]
fn flow_err() {
    assert_event_err(FLOW_UNCLOSED_SEQ_INPUT);
    assert_event_err(FLOW_UNCLOSED_MAP_INPUT);
    assert_event_err(FLOW_EXTRA_CLOSE_INPUT);
}
