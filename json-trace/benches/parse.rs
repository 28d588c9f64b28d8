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

use std::fmt::Write;
use std::hint::black_box;

use json_trace::{JsonTraceParser, ParseStatus, Token, TokenKind, Tokenizer, Trace};

fn main() {
    divan::main();
}

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

const NUM_EVENTS: usize = 10_000;

fn sample_trace(num_events: usize) -> Vec<u8> {
    let mut out = String::from("{\"traceEvents\":[\n");
    for i in 0..num_events {
        if i > 0 {
            out.push_str(",\n");
        }
        write!(
            out,
            "{{\"name\": \"F({}, {}, {})\", \"cat\": \"Unknown\", \"ph\": \"X\", \
             \"ts\": {}, \"dur\": {}, \"tid\": {}, \"pid\": 1}}",
            i % 16,
            i % 5,
            i,
            i * 100,
            17 + i % 311,
            1 + i % 16,
        )
        .unwrap();
    }
    out.push_str("\n]}\n");
    out.into_bytes()
}

#[divan::bench(args = [64, 4096, 1 << 16, usize::MAX])]
fn parse_chunked(bencher: divan::Bencher, chunk_size: usize) {
    let data = sample_trace(NUM_EVENTS);
    let chunk_size = chunk_size.min(data.len());
    bencher
        .counter(divan::counter::BytesCount::new(data.len()))
        .bench_local(|| {
            let mut parser = JsonTraceParser::new();
            let mut trace = Trace::new();
            let mut status = ParseStatus::NeedMoreInput;
            for chunk in data.chunks(chunk_size) {
                status = parser.parse(&mut trace, chunk).unwrap();
            }
            assert_eq!(status, ParseStatus::Done);
            black_box(trace.events().len())
        });
}

#[divan::bench]
fn tokenize(bencher: divan::Bencher) {
    let data = sample_trace(NUM_EVENTS);
    bencher
        .counter(divan::counter::BytesCount::new(data.len()))
        .bench_local(|| {
            let mut tok = Tokenizer::new();
            tok.set_input(&data, true);
            let mut count = 0usize;
            loop {
                let Token { kind, .. } = tok.next_token().unwrap();
                if kind == TokenKind::Eof {
                    break;
                }
                count += 1;
            }
            black_box(count)
        });
}
