pub mod consts;

use std::fmt::Write;
use yamrt_common::{Event, EventData, YamlResult};
use yamrt_core::{EmitterConfig, Input, ParseConfig, Parser, YamlLoader};

/// Writes events in the yaml-test-suite format, one per line and each preceded by a newline.
///
/// Stream start and end are skipped unless `emit_stream_token` is set. A failed parse ends with
/// an `ERR` line, followed by the error itself when stream tokens are on.
pub fn write_str_from_events<I>(line: &mut String, events: I, emit_stream_token: bool)
where
    I: IntoIterator<Item = YamlResult<Event>>,
{
    for ev in events {
        match ev {
            Ok(ev) => match ev.data {
                EventData::StreamStart | EventData::StreamEnd if !emit_stream_token => {}
                _ => {
                    let _ = write!(line, "\n{ev}");
                }
            },
            Err(err) => {
                line.push_str("\nERR");
                if emit_stream_token {
                    let _ = write!(line, " {err}");
                }
                break;
            }
        }
    }
}

#[must_use]
pub fn event_string(input: &str) -> String {
    event_string_with(input, ParseConfig::default())
}

#[must_use]
pub fn event_string_with(input: &str, config: ParseConfig) -> String {
    let mut line = String::new();
    let parser = Parser::with_config(Input::from_str(input), config);
    write_str_from_events(&mut line, parser, false);
    line
}

///
/// Assert that for the given input, the parser generates the expected set of events
///
/// # Panics
///
///    Function panics if there is a difference between the expected events string and the one
///    generated from the input.
pub fn assert_eq_event(input: &str, events: &str) {
    assert_eq!(event_string(input), events, "Error in case: {input}");
}

/// Asserts that parsing `input` fails, after whatever events came before the error.
///
/// # Panics
///
///    When the input parses cleanly.
pub fn assert_event_err(input: &str) {
    let line = event_string(input);
    assert!(line.ends_with("\nERR"), "Expected error in case: {input}\n{line}");
}

/// Loads every document of `input` and writes them back with `config`.
///
/// # Panics
///
///    When loading or emitting fails.
#[must_use]
pub fn reemit(input: &str, config: &EmitterConfig) -> String {
    let docs = YamlLoader::load_from_str(input).unwrap_or_else(|e| panic!("{input}: {e}"));
    yamrt_core::emit_documents_to_string(&docs, config).unwrap_or_else(|e| panic!("{input}: {e}"))
}

/// Parses `input` and writes its events straight back out with `config`.
///
/// # Panics
///
///    When parsing or emitting fails.
#[must_use]
pub fn reemit_events(input: &str, config: &EmitterConfig) -> String {
    let events: Vec<Event> = Parser::new_from_str(input)
        .collect::<YamlResult<_>>()
        .unwrap_or_else(|e| panic!("{input}: {e}"));
    yamrt_core::emit_events_to_string(events, config).unwrap_or_else(|e| panic!("{input}: {e}"))
}
