// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Incremental Chrome trace parser.
//!
//! The parser accepts the two top-level shapes of the Chrome Trace Event
//! Format, an object wrapping a `"traceEvents"` array or a bare array of
//! events, and carves out one complete event body at a time. The carving pass
//! is a byte-level state machine over the raw input rather than a token
//! stream: it walks every byte of the file exactly once, maintaining a stack
//! of open bracket and quote contexts, and only the carved body is handed to
//! the token-based event decoder. Unknown sibling keys of `"traceEvents"` are
//! skipped with the same stack.
//!
//! Input arrives in arbitrary chunks via [`JsonTraceParser::parse`]. All
//! state that has to survive a chunk boundary, including partial object keys
//! and partial event bodies, lives in parser-owned arena buffers; between
//! calls the parser holds no reference to caller memory.

use arena::Arena;

use crate::buffer::{AccumBuf, SkipStack};
use crate::error::TraceError;
use crate::trace::{decode_event, Trace};

const PARSER_BUF_INITIAL_SIZE: usize = 4096;

/// Outcome of a [`JsonTraceParser::parse`] call that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStatus {
    /// The trace ended cleanly; the parser is finished.
    Done,
    /// The chunk was fully consumed mid-trace; feed the next one.
    NeedMoreInput,
}

#[derive(Clone, Copy, Debug)]
enum SkipNext {
    TraceEvents,
    UnknownValue,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Init,
    /// After the wrapper's `{` or a `,` between wrapper keys.
    ObjectWrapper,
    /// Mid-key when the chunk ended; the prefix sits in the accum buffer.
    KeyContinued { escaped: bool },
    /// After `"traceEvents"` and its `:`.
    TraceEventsFound,
    /// Skipping the value of an unknown wrapper key.
    UnknownValueSkip { init: bool, escaped: bool },
    /// Expect `,` or the wrapper's closing `}`.
    AfterValue,
    /// Inside the events array, carving the current event.
    ArrayFormat { escaped: bool },
    /// Expect `,` or `]` after an event.
    AfterEvent,
    /// Skip whitespace, consume `target`, move on.
    SkipChar { target: u8, next: SkipNext },
    Error,
    Done,
}

pub struct JsonTraceParser {
    arena: Arena,
    accum: AccumBuf,
    stack: SkipStack,
    has_object_wrapper: bool,
    state: State,
    error: Option<TraceError>,
}

impl Default for JsonTraceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonTraceParser {
    pub fn new() -> Self {
        JsonTraceParser {
            arena: Arena::new(),
            accum: AccumBuf::new(PARSER_BUF_INITIAL_SIZE),
            stack: SkipStack::new(PARSER_BUF_INITIAL_SIZE),
            has_object_wrapper: false,
            state: State::Init,
            error: None,
        }
    }

    /// Consumes one chunk. Decoded events are appended to `trace` in file
    /// order. Returns `Done` when the trace ends inside this chunk,
    /// `NeedMoreInput` when the chunk was exhausted mid-trace. The first
    /// error is terminal: it is latched and calling `parse` again panics.
    pub fn parse(&mut self, trace: &mut Trace, chunk: &[u8]) -> Result<ParseStatus, TraceError> {
        assert!(
            !matches!(self.state, State::Done | State::Error),
            "parse called after the parser reached a terminal state"
        );
        match self.run(trace, chunk) {
            Ok(status) => {
                if status == ParseStatus::Done {
                    tracing::debug!(events = trace.events().len(), "trace parse complete");
                }
                Ok(status)
            }
            Err(err) => {
                tracing::debug!(error = %err, "trace parse failed");
                self.state = State::Error;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// The latched error after `parse` returned one.
    pub fn last_error(&self) -> Option<&TraceError> {
        self.error.as_ref()
    }

    fn run(&mut self, trace: &mut Trace, chunk: &[u8]) -> Result<ParseStatus, TraceError> {
        let mut cursor = 0usize;
        loop {
            match self.state {
                State::Init => {
                    if !skip_whitespace(chunk, &mut cursor) {
                        return Ok(ParseStatus::NeedMoreInput);
                    }
                    let c = chunk[cursor];
                    match c {
                        b'{' => {
                            cursor += 1;
                            self.has_object_wrapper = true;
                            self.state = State::ObjectWrapper;
                        }
                        b'[' => {
                            cursor += 1;
                            self.accum.clear();
                            self.state = State::ArrayFormat { escaped: false };
                        }
                        c => return Err(TraceError::InvalidStart(char::from(c))),
                    }
                }

                State::ObjectWrapper => {
                    if !skip_whitespace(chunk, &mut cursor) {
                        return Ok(ParseStatus::NeedMoreInput);
                    }
                    match chunk[cursor] {
                        b'"' => {
                            cursor += 1;
                            let start = cursor;
                            let mut escaped = false;
                            loop {
                                if cursor == chunk.len() {
                                    self.accum.clear();
                                    self.accum.append(&mut self.arena, &chunk[start..]);
                                    self.state = State::KeyContinued { escaped };
                                    return Ok(ParseStatus::NeedMoreInput);
                                }
                                let c = chunk[cursor];
                                cursor += 1;
                                if escaped {
                                    escaped = false;
                                } else if c == b'\\' {
                                    escaped = true;
                                } else if c == b'"' {
                                    self.state = key_state(&chunk[start..cursor - 1]);
                                    break;
                                }
                            }
                        }
                        b'}' => {
                            self.state = State::Done;
                            return Ok(ParseStatus::Done);
                        }
                        c => {
                            return Err(TraceError::UnexpectedByte {
                                expected: '"',
                                got: char::from(c),
                            })
                        }
                    }
                }

                State::KeyContinued { mut escaped } => {
                    let start = cursor;
                    loop {
                        if cursor == chunk.len() {
                            self.accum.append(&mut self.arena, &chunk[start..]);
                            self.state = State::KeyContinued { escaped };
                            return Ok(ParseStatus::NeedMoreInput);
                        }
                        let c = chunk[cursor];
                        cursor += 1;
                        if escaped {
                            escaped = false;
                        } else if c == b'\\' {
                            escaped = true;
                        } else if c == b'"' {
                            self.accum.append(&mut self.arena, &chunk[start..cursor - 1]);
                            self.state = key_state(self.accum.slice(&self.arena));
                            break;
                        }
                    }
                }

                State::TraceEventsFound => {
                    if !skip_whitespace(chunk, &mut cursor) {
                        return Ok(ParseStatus::NeedMoreInput);
                    }
                    let c = chunk[cursor];
                    if c != b'[' {
                        return Err(TraceError::UnexpectedByte {
                            expected: '[',
                            got: char::from(c),
                        });
                    }
                    cursor += 1;
                    self.accum.clear();
                    self.state = State::ArrayFormat { escaped: false };
                }

                State::UnknownValueSkip { init, escaped } => {
                    let mut escaped = escaped;
                    if !init {
                        if !skip_whitespace(chunk, &mut cursor) {
                            return Ok(ParseStatus::NeedMoreInput);
                        }
                        self.stack.clear();
                        let c = chunk[cursor];
                        cursor += 1;
                        if matches!(c, b'"' | b'{' | b'[') {
                            self.stack.push(&mut self.arena, c);
                        }
                        escaped = false;
                        self.state = State::UnknownValueSkip {
                            init: true,
                            escaped,
                        };
                    }

                    match self.stack.bottom(&self.arena) {
                        Some(b'"') => {
                            let mut done = false;
                            while cursor < chunk.len() && !done {
                                let c = chunk[cursor];
                                cursor += 1;
                                if escaped {
                                    escaped = false;
                                } else if c == b'\\' {
                                    escaped = true;
                                } else if c == b'"' {
                                    self.stack.pop();
                                    self.state = State::AfterValue;
                                    done = true;
                                }
                            }
                            if !done {
                                self.state = State::UnknownValueSkip {
                                    init: true,
                                    escaped,
                                };
                                return Ok(ParseStatus::NeedMoreInput);
                            }
                        }
                        Some(open @ (b'{' | b'[')) => {
                            // Only brackets of the bottom's own kind are
                            // tracked; the other kind always balances inside
                            // well-formed JSON.
                            let close = if open == b'{' { b'}' } else { b']' };
                            let mut done = false;
                            while cursor < chunk.len() && !done {
                                let c = chunk[cursor];
                                cursor += 1;
                                if self.stack.top(&self.arena) == Some(b'"') {
                                    if escaped {
                                        escaped = false;
                                    } else if c == b'\\' {
                                        escaped = true;
                                    } else if c == b'"' {
                                        self.stack.pop();
                                    }
                                } else if c == b'"' {
                                    self.stack.push(&mut self.arena, b'"');
                                    escaped = false;
                                } else if c == open {
                                    self.stack.push(&mut self.arena, open);
                                } else if c == close {
                                    self.stack.pop();
                                    if self.stack.is_empty() {
                                        self.state = State::AfterValue;
                                        done = true;
                                    }
                                }
                            }
                            if !done {
                                self.state = State::UnknownValueSkip {
                                    init: true,
                                    escaped,
                                };
                                return Ok(ParseStatus::NeedMoreInput);
                            }
                        }
                        Some(_) => unreachable!("only quote and bracket contexts are stacked"),
                        None => {
                            // Scalar value: scan to the `,` or `}` ending it.
                            let mut found = false;
                            while cursor < chunk.len() {
                                let c = chunk[cursor];
                                cursor += 1;
                                if c == b',' {
                                    self.state = State::ObjectWrapper;
                                    found = true;
                                    break;
                                }
                                if c == b'}' {
                                    self.state = State::Done;
                                    return Ok(ParseStatus::Done);
                                }
                            }
                            if !found {
                                return Ok(ParseStatus::NeedMoreInput);
                            }
                        }
                    }
                }

                State::AfterValue => {
                    if !skip_whitespace(chunk, &mut cursor) {
                        return Ok(ParseStatus::NeedMoreInput);
                    }
                    match chunk[cursor] {
                        b',' => {
                            cursor += 1;
                            self.state = State::ObjectWrapper;
                        }
                        b'}' => {
                            cursor += 1;
                            self.state = State::Done;
                            return Ok(ParseStatus::Done);
                        }
                        c => {
                            return Err(TraceError::UnexpectedSeparator {
                                close: '}',
                                got: char::from(c),
                            })
                        }
                    }
                }

                State::ArrayFormat { escaped } => {
                    let mut escaped = escaped;
                    let mut start = cursor;
                    if self.accum.is_empty() {
                        if !skip_whitespace(chunk, &mut cursor) {
                            return Ok(ParseStatus::NeedMoreInput);
                        }
                        let c = chunk[cursor];
                        if c != b'{' {
                            return Err(TraceError::UnexpectedByte {
                                expected: '{',
                                got: char::from(c),
                            });
                        }
                        self.stack.clear();
                        self.stack.push(&mut self.arena, b'{');
                        escaped = false;
                        start = cursor;
                        cursor += 1;
                    }

                    let mut end = None;
                    while cursor < chunk.len() {
                        let c = chunk[cursor];
                        cursor += 1;
                        if self.stack.top(&self.arena) == Some(b'"') {
                            if escaped {
                                escaped = false;
                            } else if c == b'\\' {
                                escaped = true;
                            } else if c == b'"' {
                                self.stack.pop();
                            }
                        } else {
                            match c {
                                b'"' => {
                                    self.stack.push(&mut self.arena, b'"');
                                    escaped = false;
                                }
                                b'{' => self.stack.push(&mut self.arena, b'{'),
                                b'}' => {
                                    self.stack.pop();
                                    if self.stack.is_empty() {
                                        end = Some(cursor);
                                        break;
                                    }
                                }
                                _ => {}
                            }
                        }
                    }

                    match end {
                        Some(end) => {
                            let body: &[u8] = if self.accum.is_empty() {
                                &chunk[start..end]
                            } else {
                                self.accum.append(&mut self.arena, &chunk[start..end]);
                                self.accum.slice(&self.arena)
                            };
                            decode_event(body, trace)?;
                            self.state = State::AfterEvent;
                        }
                        None => {
                            self.accum.append(&mut self.arena, &chunk[start..]);
                            self.state = State::ArrayFormat { escaped };
                            return Ok(ParseStatus::NeedMoreInput);
                        }
                    }
                }

                State::AfterEvent => {
                    if !skip_whitespace(chunk, &mut cursor) {
                        return Ok(ParseStatus::NeedMoreInput);
                    }
                    match chunk[cursor] {
                        b',' => {
                            cursor += 1;
                            self.accum.clear();
                            self.state = State::ArrayFormat { escaped: false };
                        }
                        b']' => {
                            cursor += 1;
                            if self.has_object_wrapper {
                                self.state = State::AfterValue;
                            } else {
                                self.state = State::Done;
                                return Ok(ParseStatus::Done);
                            }
                        }
                        c => {
                            return Err(TraceError::UnexpectedSeparator {
                                close: ']',
                                got: char::from(c),
                            })
                        }
                    }
                }

                State::SkipChar { target, next } => {
                    if !skip_whitespace(chunk, &mut cursor) {
                        return Ok(ParseStatus::NeedMoreInput);
                    }
                    let c = chunk[cursor];
                    if c != target {
                        return Err(TraceError::UnexpectedByte {
                            expected: char::from(target),
                            got: char::from(c),
                        });
                    }
                    cursor += 1;
                    self.state = match next {
                        SkipNext::TraceEvents => State::TraceEventsFound,
                        SkipNext::UnknownValue => State::UnknownValueSkip {
                            init: false,
                            escaped: false,
                        },
                    };
                }

                State::Done | State::Error => unreachable!(),
            }
        }
    }
}

fn key_state(key: &[u8]) -> State {
    State::SkipChar {
        target: b':',
        next: if key == b"traceEvents" {
            SkipNext::TraceEvents
        } else {
            SkipNext::UnknownValue
        },
    }
}

/// Advances past whitespace; false when the chunk ran out first.
fn skip_whitespace(chunk: &[u8], cursor: &mut usize) -> bool {
    while *cursor < chunk.len() {
        match chunk[*cursor] {
            b' ' | b'\t' | b'\n' | b'\r' => *cursor += 1,
            _ => return true,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(input: &str) -> Result<(ParseStatus, Trace), TraceError> {
        let mut parser = JsonTraceParser::new();
        let mut trace = Trace::new();
        let status = parser.parse(&mut trace, input.as_bytes())?;
        Ok((status, trace))
    }

    fn event_names(trace: &Trace) -> Vec<String> {
        trace
            .events()
            .iter()
            .map(|e| String::from_utf8(trace.bytes(e.name).to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_object_wrapper_with_unknown_sibling() {
        let input = r#"{"otherData":{"x":1},"traceEvents":[{"name":"A","ph":"B","ts":10,"pid":1,"tid":2}]}"#;
        let (status, trace) = parse_one(input).unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(trace.events().len(), 1);

        let event = trace.events()[0];
        assert_eq!(trace.bytes(event.name), b"A");
        assert_eq!(trace.bytes(event.cat), b"");
        assert_eq!(event.ph, b'B');
        assert_eq!(event.ts, 10);
        assert_eq!(event.pid, 1);
        assert_eq!(event.tid, 2);
    }

    #[test]
    fn test_bare_array_two_events() {
        let input = r#"[{"name":"X","ph":"E","ts":1,"pid":1,"tid":1},{"name":"Y","ph":"E","ts":2,"pid":1,"tid":1}]"#;
        let (status, trace) = parse_one(input).unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(event_names(&trace), vec!["X", "Y"]);
        assert_eq!(trace.events()[0].ts, 1);
        assert_eq!(trace.events()[1].ts, 2);
    }

    #[test]
    fn test_empty_wrapper_object() {
        let (status, trace) = parse_one(" { } ").unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert!(trace.events().is_empty());
    }

    #[test]
    fn test_unknown_sibling_shapes() {
        let input = r#"{
            "a": "plain",
            "b": -12.5e3,
            "c": true,
            "d": [1, [2, {"x": "]"}], "]"],
            "e": {"k": ["}", {"n": 1}]},
            "traceEvents": [{"name":"A","ts":1,"pid":1,"tid":1}],
            "f": null
        }"#;
        let (status, trace) = parse_one(input).unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(event_names(&trace), vec!["A"]);
    }

    #[test]
    fn test_unknown_string_value_ending_in_escaped_backslash() {
        // "\\" is a complete string value; the quote after the second
        // backslash closes it.
        let input = r#"{"weird":"\\","traceEvents":[{"name":"A","ts":1,"pid":1,"tid":1}]}"#;
        let (status, trace) = parse_one(input).unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(event_names(&trace), vec!["A"]);
    }

    #[test]
    fn test_wrapper_keys_after_events() {
        let input = r#"{"traceEvents":[{"name":"A","ts":1,"pid":1,"tid":1}],"displayTimeUnit":"ms"}"#;
        let (status, trace) = parse_one(input).unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(trace.events().len(), 1);
    }

    #[test]
    fn test_invalid_start() {
        let err = parse_one("x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JSON Trace: expected '{' or '[' but got 'x'"
        );
    }

    #[test]
    fn test_error_is_latched() {
        let mut parser = JsonTraceParser::new();
        let mut trace = Trace::new();
        let err = parser.parse(&mut trace, b"x").unwrap_err();
        assert_eq!(parser.last_error(), Some(&err));
    }

    #[test]
    #[should_panic(expected = "terminal state")]
    fn test_parse_after_error_panics() {
        let mut parser = JsonTraceParser::new();
        let mut trace = Trace::new();
        let _ = parser.parse(&mut trace, b"x");
        let _ = parser.parse(&mut trace, b"[");
    }

    #[test]
    fn test_missing_events_array_is_an_error() {
        let err = parse_one(r#"{"traceEvents": 1}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JSON Trace: expected '[' but got '1'"
        );
    }

    #[test]
    fn test_bad_separator_after_event() {
        let err = parse_one(r#"[{"name":"A"} {"name":"B"}]"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid JSON Trace: expected ',' or ']' but got '{'"
        );
    }

    #[test]
    fn test_event_with_nested_braces_in_strings() {
        let input = r#"[{"name":"{ not a brace }","args":{"s":"}}}"},"ts":5,"pid":1,"tid":1}]"#;
        let (status, trace) = parse_one(input).unwrap();
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(event_names(&trace), vec!["{ not a brace }"]);
        assert_eq!(trace.events()[0].ts, 5);
    }

    #[test]
    fn test_need_more_input_at_every_boundary() {
        let input = r#"{"otherData":{"x":"\\"},"traceEvents":[{"name":"A","ts":1,"pid":1,"tid":1},{"name":"B","ts":2,"pid":1,"tid":1}]}"#;
        let mut parser = JsonTraceParser::new();
        let mut trace = Trace::new();
        let bytes = input.as_bytes();
        let mut status = ParseStatus::NeedMoreInput;
        for chunk in bytes.chunks(1) {
            status = parser.parse(&mut trace, chunk).unwrap();
        }
        assert_eq!(status, ParseStatus::Done);
        assert_eq!(event_names(&trace), vec!["A", "B"]);
    }

    #[test]
    fn test_decoder_error_propagates() {
        let err = parse_one(r#"[{"name":"A","ts":"oops"}]"#).unwrap_err();
        assert_eq!(err, TraceError::InvalidInteger("ts"));
    }
}
