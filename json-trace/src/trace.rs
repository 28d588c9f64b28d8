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

//! Trace collection and per-event decoding.
//!
//! A [`Trace`] owns the decoded [`TraceEvent`] records in file order plus an
//! arena holding the interned `name` and `cat` strings, so event string data
//! lives exactly as long as the trace itself.

use arena::{Arena, ByteSpan};

use crate::error::TraceError;
use crate::tokenizer::{TokenKind, Tokenizer};

/// One decoded trace event.
///
/// `name` and `cat` resolve through [`Trace::bytes`]. `ph` is the first byte
/// of the event's phase string (`b'X'` for complete events, `b'B'`/`b'E'` for
/// duration events, and so on), or 0 when the phase string is empty.
/// Timestamps are microseconds, as emitted by Chrome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceEvent {
    pub name: ByteSpan,
    pub cat: ByteSpan,
    pub ph: u8,
    pub ts: u64,
    pub pid: u32,
    pub tid: u32,
}

/// Collection root for a parsed trace.
#[derive(Default, Debug)]
pub struct Trace {
    arena: Arena,
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Trace {
            arena: Arena::new(),
            events: Vec::new(),
        }
    }

    /// Decoded events in file order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Resolves an event string span against the trace-owned arena.
    pub fn bytes(&self, span: ByteSpan) -> &[u8] {
        self.arena.span_bytes(span)
    }

    fn intern(&mut self, bytes: &[u8]) -> ByteSpan {
        self.arena.push_bytes(bytes)
    }
}

#[derive(Clone, Copy)]
enum Key {
    Name,
    Cat,
    Ph,
    Ts,
    Pid,
    Tid,
    Unknown,
}

impl Key {
    fn classify(bytes: &[u8]) -> Key {
        match bytes {
            b"name" => Key::Name,
            b"cat" => Key::Cat,
            b"ph" => Key::Ph,
            b"ts" => Key::Ts,
            b"pid" => Key::Pid,
            b"tid" => Key::Tid,
            _ => Key::Unknown,
        }
    }
}

/// Decodes one complete event body (the bytes from `{` to the matching `}`)
/// and appends the resulting record to the trace. The body is re-tokenized
/// with a fresh tokenizer; because it is self-contained, string values are
/// always zero-copy views into it.
pub(crate) fn decode_event(body: &[u8], trace: &mut Trace) -> Result<(), TraceError> {
    let mut tok = Tokenizer::new();
    tok.set_input(body, true);

    expect_kind(&mut tok, TokenKind::ObjectStart, "'{'")?;

    let mut event = TraceEvent::default();
    loop {
        let key = {
            let token = tok.next_token()?;
            match token.kind {
                TokenKind::ObjectEnd => break,
                TokenKind::String => Key::classify(token.value),
                got => {
                    return Err(TraceError::UnexpectedToken {
                        expected: "event key",
                        got,
                    })
                }
            }
        };
        expect_kind(&mut tok, TokenKind::Colon, "':'")?;

        match key {
            Key::Name => {
                let token = tok.next_token()?;
                if token.kind != TokenKind::String {
                    return Err(TraceError::UnexpectedToken {
                        expected: "string value",
                        got: token.kind,
                    });
                }
                event.name = trace.intern(token.value);
            }
            Key::Cat => {
                let token = tok.next_token()?;
                if token.kind != TokenKind::String {
                    return Err(TraceError::UnexpectedToken {
                        expected: "string value",
                        got: token.kind,
                    });
                }
                event.cat = trace.intern(token.value);
            }
            Key::Ph => {
                let token = tok.next_token()?;
                if token.kind != TokenKind::String {
                    return Err(TraceError::UnexpectedToken {
                        expected: "string value",
                        got: token.kind,
                    });
                }
                // Multi-byte phase strings are truncated to the first byte.
                event.ph = token.value.first().copied().unwrap_or(0);
            }
            Key::Ts => event.ts = decode_integer(&mut tok, "ts")?,
            Key::Pid => {
                let value = decode_integer(&mut tok, "pid")?;
                event.pid = u32::try_from(value).map_err(|_| TraceError::InvalidInteger("pid"))?;
            }
            Key::Tid => {
                let value = decode_integer(&mut tok, "tid")?;
                event.tid = u32::try_from(value).map_err(|_| TraceError::InvalidInteger("tid"))?;
            }
            Key::Unknown => {
                let kind = tok.next_token()?.kind;
                skip_value(&mut tok, kind)?;
            }
        }

        match tok.next_token()?.kind {
            TokenKind::Comma => {}
            TokenKind::ObjectEnd => break,
            got => {
                return Err(TraceError::UnexpectedToken {
                    expected: "',' or '}'",
                    got,
                })
            }
        }
    }

    trace.events.push(event);
    Ok(())
}

fn expect_kind(
    tok: &mut Tokenizer<'_>,
    kind: TokenKind,
    expected: &'static str,
) -> Result<(), TraceError> {
    let got = tok.next_token()?.kind;
    if got != kind {
        return Err(TraceError::UnexpectedToken { expected, got });
    }
    Ok(())
}

/// Numeric fields accept both number and string tokens; either way the bytes
/// must be a plain unsigned decimal.
fn decode_integer(tok: &mut Tokenizer<'_>, field: &'static str) -> Result<u64, TraceError> {
    let token = tok.next_token()?;
    match token.kind {
        TokenKind::Number | TokenKind::String => parse_decimal(token.value, field),
        got => Err(TraceError::UnexpectedToken {
            expected: "numeric value",
            got,
        }),
    }
}

fn parse_decimal(bytes: &[u8], field: &'static str) -> Result<u64, TraceError> {
    if bytes.is_empty() {
        return Err(TraceError::InvalidInteger(field));
    }
    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return Err(TraceError::InvalidInteger(field));
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or(TraceError::InvalidInteger(field))?;
    }
    Ok(value)
}

/// Skips one already-started JSON value: a scalar is a single token, and a
/// container is consumed by recursing over its members.
fn skip_value(tok: &mut Tokenizer<'_>, kind: TokenKind) -> Result<(), TraceError> {
    match kind {
        TokenKind::String
        | TokenKind::Number
        | TokenKind::True
        | TokenKind::False
        | TokenKind::Null => Ok(()),
        TokenKind::ObjectStart => skip_object(tok),
        TokenKind::ArrayStart => skip_array(tok),
        got => Err(TraceError::UnexpectedToken {
            expected: "value",
            got,
        }),
    }
}

fn skip_object(tok: &mut Tokenizer<'_>) -> Result<(), TraceError> {
    loop {
        match tok.next_token()?.kind {
            TokenKind::ObjectEnd => return Ok(()),
            TokenKind::String => {}
            got => {
                return Err(TraceError::UnexpectedToken {
                    expected: "object key",
                    got,
                })
            }
        }
        expect_kind(tok, TokenKind::Colon, "':'")?;
        let kind = tok.next_token()?.kind;
        skip_value(tok, kind)?;
        match tok.next_token()?.kind {
            TokenKind::Comma => {}
            TokenKind::ObjectEnd => return Ok(()),
            got => {
                return Err(TraceError::UnexpectedToken {
                    expected: "',' or '}'",
                    got,
                })
            }
        }
    }
}

fn skip_array(tok: &mut Tokenizer<'_>) -> Result<(), TraceError> {
    loop {
        let kind = tok.next_token()?.kind;
        if kind == TokenKind::ArrayEnd {
            return Ok(());
        }
        skip_value(tok, kind)?;
        match tok.next_token()?.kind {
            TokenKind::Comma => {}
            TokenKind::ArrayEnd => return Ok(()),
            got => {
                return Err(TraceError::UnexpectedToken {
                    expected: "',' or ']'",
                    got,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> Result<(Trace, TraceEvent), TraceError> {
        let mut trace = Trace::new();
        decode_event(body.as_bytes(), &mut trace)?;
        let event = trace.events()[0];
        Ok((trace, event))
    }

    #[test]
    fn test_all_known_fields() {
        let (trace, event) =
            decode(r#"{"name":"run","cat":"app","ph":"X","ts":1234,"pid":7,"tid":9}"#).unwrap();
        assert_eq!(trace.bytes(event.name), b"run");
        assert_eq!(trace.bytes(event.cat), b"app");
        assert_eq!(event.ph, b'X');
        assert_eq!(event.ts, 1234);
        assert_eq!(event.pid, 7);
        assert_eq!(event.tid, 9);
    }

    #[test]
    fn test_missing_fields_default() {
        let (trace, event) = decode(r#"{"name":"A"}"#).unwrap();
        assert_eq!(trace.bytes(event.name), b"A");
        assert_eq!(trace.bytes(event.cat), b"");
        assert_eq!(event.ph, 0);
        assert_eq!(event.ts, 0);
    }

    #[test]
    fn test_empty_event() {
        let (trace, event) = decode("{}").unwrap();
        assert_eq!(trace.bytes(event.name), b"");
        assert_eq!(event.ph, 0);
    }

    #[test]
    fn test_multi_byte_ph_truncated() {
        let (_, event) = decode(r#"{"ph":"XY"}"#).unwrap();
        assert_eq!(event.ph, b'X');
        let (_, event) = decode(r#"{"ph":""}"#).unwrap();
        assert_eq!(event.ph, 0);
    }

    #[test]
    fn test_numbers_as_strings() {
        let (_, event) = decode(r#"{"ts":"99","pid":"3","tid":"4"}"#).unwrap();
        assert_eq!(event.ts, 99);
        assert_eq!(event.pid, 3);
        assert_eq!(event.tid, 4);
    }

    #[test]
    fn test_unknown_values_skipped() {
        let (trace, event) = decode(
            r#"{"args":{"a":[1,2,{"b":"}"}],"c":null},"name":"X","dur":25,"flags":[true,false]}"#,
        )
        .unwrap();
        assert_eq!(trace.bytes(event.name), b"X");
    }

    #[test]
    fn test_invalid_integer() {
        let err = decode(r#"{"ts":"12a"}"#).unwrap_err();
        assert_eq!(err, TraceError::InvalidInteger("ts"));

        let err = decode(r#"{"ts":"99999999999999999999999"}"#).unwrap_err();
        assert_eq!(err, TraceError::InvalidInteger("ts"));

        let err = decode(r#"{"pid":"5000000000"}"#).unwrap_err();
        assert_eq!(err, TraceError::InvalidInteger("pid"));
    }

    #[test]
    fn test_unexpected_token() {
        let err = decode(r#"{"name":42}"#).unwrap_err();
        assert!(matches!(err, TraceError::UnexpectedToken { .. }));

        let err = decode(r#"{"ts":true}"#).unwrap_err();
        assert!(matches!(err, TraceError::UnexpectedToken { .. }));
    }
}
