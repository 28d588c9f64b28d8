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

//! Synthetic trace generator.
//!
//! Produces an object-format Chrome trace with randomized per-thread call
//! stacks of complete (`"ph": "X"`) events, suitable for benchmarking the
//! parser. Output is deterministic for a given seed.

use std::io::{self, Write};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const MAX_THREADS: u64 = 20;
const MAX_STACK_DEPTH: u64 = 6;
const MAX_FUNCTION_CALLS: u64 = 10;
const MAX_DELAY_US: u64 = 1_000_000;

pub fn generate<W: Write>(out: &mut W, seed: u64) -> io::Result<()> {
    let mut gen = Generator {
        out,
        rng: SmallRng::seed_from_u64(seed),
        first_event: true,
    };
    gen.trace()
}

struct Generator<'a, W: Write> {
    out: &'a mut W,
    rng: SmallRng,
    first_event: bool,
}

impl<W: Write> Generator<'_, W> {
    fn trace(&mut self) -> io::Result<()> {
        let num_threads = self.rng.gen_range(1..=MAX_THREADS);
        write!(self.out, "{{\"traceEvents\":[")?;
        for thread_index in 0..num_threads {
            self.thread(thread_index + 1)?;
        }
        writeln!(self.out, "\n]}}")
    }

    fn thread(&mut self, thread_id: u64) -> io::Result<()> {
        let mut current_time_us = self.rng.gen_range(0..=MAX_DELAY_US);
        let max_depth = self.rng.gen_range(1..=MAX_STACK_DEPTH);
        self.function(thread_id, &mut current_time_us, 0, max_depth, 0)
    }

    fn function(
        &mut self,
        thread_id: u64,
        current_time_us: &mut u64,
        current_depth: u64,
        max_depth: u64,
        func_index: u64,
    ) -> io::Result<()> {
        if current_depth > max_depth {
            return Ok(());
        }

        let ts = *current_time_us;
        *current_time_us += self.rng.gen_range(0..=MAX_DELAY_US);

        let num_calls = self.rng.gen_range(1..=MAX_FUNCTION_CALLS);
        for call_index in 0..num_calls {
            self.function(
                thread_id,
                current_time_us,
                current_depth + 1,
                max_depth,
                call_index,
            )?;
            *current_time_us += self.rng.gen_range(0..=MAX_DELAY_US);
        }

        *current_time_us += self.rng.gen_range(0..=MAX_DELAY_US);
        let dur = *current_time_us - ts;

        // The depth-0 frame is the thread itself, not a function call.
        if current_depth > 0 {
            if self.first_event {
                self.first_event = false;
            } else {
                write!(self.out, ",")?;
            }
            write!(
                self.out,
                "\n{{\"name\": \"F({thread_id}, {current_depth}, {func_index})\", \
                 \"cat\": \"Unknown\", \"ph\": \"X\", \"ts\": {ts}, \"dur\": {dur}, \
                 \"tid\": {thread_id}, \"pid\": 1}}"
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_trace::{JsonTraceParser, ParseStatus, Trace};

    #[test]
    fn test_deterministic_for_seed() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        generate(&mut a, 42).unwrap();
        generate(&mut b, 42).unwrap();
        assert_eq!(a, b);

        let mut c = Vec::new();
        generate(&mut c, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_output_parses() {
        let mut data = Vec::new();
        generate(&mut data, 0).unwrap();

        let mut parser = JsonTraceParser::new();
        let mut trace = Trace::new();
        let mut status = ParseStatus::NeedMoreInput;
        for chunk in data.chunks(4096) {
            status = parser.parse(&mut trace, chunk).unwrap();
            if status == ParseStatus::Done {
                break;
            }
        }
        assert_eq!(status, ParseStatus::Done);
        assert!(!trace.events().is_empty());

        for event in trace.events() {
            assert_eq!(event.ph, b'X');
            assert_eq!(event.pid, 1);
            assert_eq!(trace.bytes(event.cat), b"Unknown");
            assert!(trace.bytes(event.name).starts_with(b"F("));
        }
    }
}
