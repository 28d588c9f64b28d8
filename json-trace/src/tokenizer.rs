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

//! Incremental JSON tokenizer.
//!
//! The tokenizer scans one input chunk at a time and suspends between chunks:
//! [`Tokenizer::next_token`] returns an [`TokenKind::Eof`] token when the
//! current chunk is exhausted, and the caller supplies the next chunk with
//! [`Tokenizer::set_input`]. The `Eof` is *soft* unless the chunk was marked
//! as the last one, in which case the tokenizer finishes (or reports an error
//! for a lexeme that cannot end at end of input).
//!
//! String and number values are handed out as views into the caller's chunk
//! whenever the lexeme fits in one chunk. A lexeme that straddles chunks is
//! accumulated into an arena-backed buffer and the view points there instead;
//! either way the view is only valid until the next call into the tokenizer.
//!
//! Escape sequences are not decoded: the token value carries the backslash
//! sequence exactly as it appeared in the input.

use arena::Arena;

use crate::buffer::AccumBuf;
use crate::error::JsonError;

const ACCUM_INITIAL_SIZE: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    String,
    Number,
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    Colon,
    Comma,
    True,
    False,
    Null,
}

/// One token. `value` is empty for everything except `String` and `Number`,
/// where it aliases either the current input chunk or the tokenizer's
/// accumulation buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'t> {
    pub kind: TokenKind,
    pub value: &'t [u8],
}

impl<'t> Token<'t> {
    fn bare(kind: TokenKind) -> Token<'static> {
        Token { kind, value: &[] }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NumPhase {
    Integer,
    Fraction,
    Exponent,
    ExponentNoSign,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Start,
    Str,
    StrEscape,
    StrEscapeUnicode(u8),
    Number {
        phase: NumPhase,
        has_digit: bool,
        zero_first: bool,
    },
    Keyword {
        rest: &'static [u8],
        kind: TokenKind,
    },
    // Deferred release of the accumulation buffer: the emitted value stays
    // valid while the caller holds it, and the buffer is popped on the next
    // call so the arena returns to its pre-lexeme watermark.
    StrEnd,
    NumEnd,
    Done,
    Error,
}

pub struct Tokenizer<'a> {
    arena: Arena,
    accum: AccumBuf,
    state: State,
    input: &'a [u8],
    cursor: usize,
    last_input: bool,
    lexeme_start: usize,
}

impl<'a> Default for Tokenizer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Tokenizer<'a> {
    pub fn new() -> Self {
        Tokenizer {
            arena: Arena::new(),
            accum: AccumBuf::new(ACCUM_INITIAL_SIZE),
            state: State::Start,
            input: &[],
            cursor: 0,
            last_input: false,
            lexeme_start: 0,
        }
    }

    /// Supplies the next input chunk. The previous chunk must have been fully
    /// consumed (`next_token` returned `Eof`).
    pub fn set_input(&mut self, input: &'a [u8], last_input: bool) {
        assert!(
            self.cursor == self.input.len(),
            "previous input must be fully consumed"
        );
        self.input = input;
        self.cursor = 0;
        self.lexeme_start = 0;
        self.last_input = last_input;
    }

    pub fn is_scanning(&self) -> bool {
        !matches!(self.state, State::Done | State::Error)
    }

    /// Produces the next token, suspending with a soft `Eof` when the chunk
    /// runs out mid-scan. Must not be called after `Done` or an error.
    pub fn next_token(&mut self) -> Result<Token<'_>, JsonError> {
        assert!(self.is_scanning(), "next_token called after Done or Error");
        loop {
            match self.state {
                State::Start => {
                    while self.cursor < self.input.len()
                        && is_whitespace(self.input[self.cursor])
                    {
                        self.cursor += 1;
                    }
                    let Some(&c) = self.input.get(self.cursor) else {
                        if self.last_input {
                            self.state = State::Done;
                        }
                        return Ok(Token::bare(TokenKind::Eof));
                    };
                    self.cursor += 1;
                    match c {
                        b'"' => {
                            self.lexeme_start = self.cursor;
                            self.state = State::Str;
                        }
                        b'-' | b'0'..=b'9' => {
                            self.lexeme_start = self.cursor - 1;
                            self.state = State::Number {
                                phase: NumPhase::Integer,
                                has_digit: c != b'-',
                                zero_first: c == b'0',
                            };
                        }
                        b'{' => return Ok(Token::bare(TokenKind::ObjectStart)),
                        b'}' => return Ok(Token::bare(TokenKind::ObjectEnd)),
                        b'[' => return Ok(Token::bare(TokenKind::ArrayStart)),
                        b']' => return Ok(Token::bare(TokenKind::ArrayEnd)),
                        b':' => return Ok(Token::bare(TokenKind::Colon)),
                        b',' => return Ok(Token::bare(TokenKind::Comma)),
                        b't' => {
                            self.state = State::Keyword {
                                rest: b"rue",
                                kind: TokenKind::True,
                            };
                        }
                        b'f' => {
                            self.state = State::Keyword {
                                rest: b"alse",
                                kind: TokenKind::False,
                            };
                        }
                        b'n' => {
                            self.state = State::Keyword {
                                rest: b"ull",
                                kind: TokenKind::Null,
                            };
                        }
                        c => return self.fail(JsonError::ValueExpected(char::from(c))),
                    }
                }

                State::Str => {
                    let mut escape = false;
                    while self.cursor < self.input.len() {
                        let c = self.input[self.cursor];
                        self.cursor += 1;
                        match c {
                            b'"' => {
                                let end = self.cursor - 1;
                                self.state = State::StrEnd;
                                return Ok(self.emit_lexeme(TokenKind::String, end));
                            }
                            b'\\' => {
                                escape = true;
                                break;
                            }
                            _ => {}
                        }
                    }
                    if escape {
                        self.state = State::StrEscape;
                    } else {
                        return self.suspend_in_string();
                    }
                }

                State::StrEscape => {
                    let Some(&c) = self.input.get(self.cursor) else {
                        return self.suspend_in_string();
                    };
                    self.cursor += 1;
                    match c {
                        b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => {
                            self.state = State::Str;
                        }
                        b'u' => self.state = State::StrEscapeUnicode(0),
                        c => return self.fail(JsonError::InvalidEscape(char::from(c))),
                    }
                }

                State::StrEscapeUnicode(seen) => {
                    let Some(&c) = self.input.get(self.cursor) else {
                        return self.suspend_in_string();
                    };
                    self.cursor += 1;
                    if !c.is_ascii_hexdigit() {
                        return self.fail(JsonError::InvalidHexDigit(char::from(c)));
                    }
                    self.state = if seen == 3 {
                        State::Str
                    } else {
                        State::StrEscapeUnicode(seen + 1)
                    };
                }

                State::Number {
                    phase,
                    has_digit,
                    zero_first,
                } => {
                    let Some(&c) = self.input.get(self.cursor) else {
                        if self.last_input {
                            let end = self.cursor;
                            self.state = State::NumEnd;
                            return Ok(self.emit_lexeme(TokenKind::Number, end));
                        }
                        self.suspend_lexeme();
                        return Ok(Token::bare(TokenKind::Eof));
                    };
                    let next = match phase {
                        NumPhase::Integer => match c {
                            b'0'..=b'9' => {
                                if has_digit && zero_first {
                                    // Split a leading zero: "07" tokenizes as
                                    // "0", "7" instead of erroring.
                                    None
                                } else {
                                    Some(State::Number {
                                        phase: NumPhase::Integer,
                                        has_digit: true,
                                        zero_first: !has_digit && c == b'0',
                                    })
                                }
                            }
                            b'.' => Some(State::Number {
                                phase: NumPhase::Fraction,
                                has_digit,
                                zero_first: false,
                            }),
                            b'e' | b'E' => Some(State::Number {
                                phase: NumPhase::Exponent,
                                has_digit,
                                zero_first: false,
                            }),
                            _ => None,
                        },
                        NumPhase::Fraction => match c {
                            b'0'..=b'9' => Some(State::Number {
                                phase: NumPhase::Fraction,
                                has_digit,
                                zero_first,
                            }),
                            b'e' | b'E' => Some(State::Number {
                                phase: NumPhase::Exponent,
                                has_digit,
                                zero_first,
                            }),
                            _ => None,
                        },
                        NumPhase::Exponent => match c {
                            b'+' | b'-' | b'0'..=b'9' => Some(State::Number {
                                phase: NumPhase::ExponentNoSign,
                                has_digit,
                                zero_first,
                            }),
                            _ => None,
                        },
                        NumPhase::ExponentNoSign => match c {
                            b'0'..=b'9' => Some(State::Number {
                                phase: NumPhase::ExponentNoSign,
                                has_digit,
                                zero_first,
                            }),
                            _ => None,
                        },
                    };
                    match next {
                        Some(state) => {
                            self.cursor += 1;
                            self.state = state;
                        }
                        None => {
                            // The separator byte stays in the input.
                            let end = self.cursor;
                            self.state = State::NumEnd;
                            return Ok(self.emit_lexeme(TokenKind::Number, end));
                        }
                    }
                }

                State::Keyword { rest, kind } => {
                    let Some(&c) = self.input.get(self.cursor) else {
                        if self.last_input {
                            return self.fail(JsonError::KeywordEndOfInput(char::from(rest[0])));
                        }
                        return Ok(Token::bare(TokenKind::Eof));
                    };
                    self.cursor += 1;
                    if c != rest[0] {
                        return self.fail(JsonError::KeywordByte {
                            expected: char::from(rest[0]),
                            got: char::from(c),
                        });
                    }
                    if rest.len() == 1 {
                        self.state = State::Start;
                        return Ok(Token::bare(kind));
                    }
                    self.state = State::Keyword {
                        rest: &rest[1..],
                        kind,
                    };
                }

                State::StrEnd | State::NumEnd => {
                    self.accum.release(&mut self.arena);
                    self.state = State::Start;
                }

                State::Done | State::Error => unreachable!(),
            }
        }
    }

    fn fail(&mut self, err: JsonError) -> Result<Token<'_>, JsonError> {
        self.state = State::Error;
        Err(err)
    }

    fn suspend_in_string(&mut self) -> Result<Token<'_>, JsonError> {
        if self.last_input {
            return self.fail(JsonError::UnterminatedString);
        }
        self.suspend_lexeme();
        Ok(Token::bare(TokenKind::Eof))
    }

    /// Saves the partial lexeme before suspending; scanning resumes at the
    /// start of the next chunk.
    fn suspend_lexeme(&mut self) {
        let input = self.input;
        self.accum
            .append(&mut self.arena, &input[self.lexeme_start..self.cursor]);
    }

    /// Emits a view into the input chunk when the whole lexeme is there, and
    /// into the accumulation buffer when it spans chunks.
    fn emit_lexeme(&mut self, kind: TokenKind, end: usize) -> Token<'_> {
        let input = self.input;
        let tail = &input[self.lexeme_start..end];
        if self.accum.is_empty() {
            Token { kind, value: tail }
        } else {
            self.accum.append(&mut self.arena, tail);
            Token {
                kind,
                value: self.accum.slice(&self.arena),
            }
        }
    }
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}
