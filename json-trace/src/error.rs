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

use thiserror::Error;

use crate::tokenizer::TokenKind;

/// Tokenizer errors. All of them are terminal: the tokenizer enters its error
/// state and must not be scanned again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonError {
    #[error("JSON value expected but got '{0}'")]
    ValueExpected(char),

    #[error("End of string '\"' expected but reached end of input")]
    UnterminatedString,

    #[error("Invalid escape character '\\{0}'")]
    InvalidEscape(char),

    #[error("Expected hex digit but got '{0}'")]
    InvalidHexDigit(char),

    #[error("Expected '{expected}' but got '{got}'")]
    KeywordByte { expected: char, got: char },

    #[error("Expected '{0}' but reached end of input")]
    KeywordEndOfInput(char),
}

/// Trace parser and event decoder errors. The first error latches the parser
/// in its error state; only dropping it is legal afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("Invalid JSON Trace: expected '{{' or '[' but got '{0}'")]
    InvalidStart(char),

    #[error("Invalid JSON Trace: expected '{expected}' but got '{got}'")]
    UnexpectedByte { expected: char, got: char },

    #[error("Invalid JSON Trace: expected ',' or '{close}' but got '{got}'")]
    UnexpectedSeparator { close: char, got: char },

    #[error("Invalid JSON Trace: expected {expected} but got {got:?} token")]
    UnexpectedToken {
        expected: &'static str,
        got: TokenKind,
    },

    #[error("Invalid JSON Trace: invalid integer value for \"{0}\"")]
    InvalidInteger(&'static str),

    #[error(transparent)]
    Json(#[from] JsonError),
}
