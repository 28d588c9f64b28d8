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

//! # json-trace
//!
//! Incremental, streaming parser for the Chrome Trace Event Format, the JSON
//! trace representation processed by the Chrome Trace Viewer
//! (chrome://tracing).
//!
//! Trace files are routinely gigabytes, so the parser accepts input in
//! arbitrary-sized chunks and never buffers the whole file: a chunk is walked
//! exactly once, complete event bodies are carved out and decoded on the
//! spot, and only the state that straddles a chunk boundary (a partial key or
//! event body) is saved in arena-owned buffers. Both recognized top-level
//! shapes are handled:
//!
//! 1. Object format: `{"traceEvents": [ {...}, ... ], ...other keys...}`
//! 2. Array format: `[ {...}, ... ]`
//!
//! Unknown keys, both inside events and as siblings of `"traceEvents"`, are
//! skipped structurally without building any DOM.
//!
//! ```
//! use json_trace::{JsonTraceParser, ParseStatus, Trace};
//!
//! let mut parser = JsonTraceParser::new();
//! let mut trace = Trace::new();
//! let status = parser
//!     .parse(&mut trace, br#"[{"name":"work","ph":"X","ts":100,"pid":1,"tid":1}]"#)
//!     .unwrap();
//! assert_eq!(status, ParseStatus::Done);
//! assert_eq!(trace.bytes(trace.events()[0].name), b"work");
//! ```
//!
//! The [`Tokenizer`] underneath is usable on its own for streaming JSON
//! lexing with the same chunked suspend/resume protocol.

mod buffer;
pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod trace;

pub use arena::{AllocRef, Arena, ByteSpan};
pub use error::{JsonError, TraceError};
pub use parser::{JsonTraceParser, ParseStatus};
pub use tokenizer::{Token, TokenKind, Tokenizer};
pub use trace::{Trace, TraceEvent};
