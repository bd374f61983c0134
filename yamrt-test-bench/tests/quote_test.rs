use yamrt_test_bench::consts::*;
use yamrt_test_bench::{assert_eq_event, assert_event_err};

#[test]
fn single_quoted() {
    assert_eq_event(SINGLE_QUOTE_INPUT, SINGLE_QUOTE_EVENTS);
    assert_eq_event(SINGLE_QUOTE_FOLD_INPUT, SINGLE_QUOTE_FOLD_EVENTS);
}

#[test]
fn double_quoted() {
    assert_eq_event(DOUBLE_QUOTE_ESCAPES_INPUT, DOUBLE_QUOTE_ESCAPES_EVENTS);
    assert_eq_event(DOUBLE_QUOTE_LINE_JOIN_INPUT, DOUBLE_QUOTE_LINE_JOIN_EVENTS);
}

#[test]
fn quoted_keys() {
    assert_eq_event(QUOTED_KEYS_INPUT, QUOTED_KEYS_EVENTS);
}

#[test]
fn quote_err() {
    assert_event_err(BAD_ESCAPE_INPUT);
    assert_event_err(UNTERMINATED_QUOTE_INPUT);
}
