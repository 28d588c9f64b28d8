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

use clap::Parser;
use eyre::{ensure, Context, Result};
use json_trace::{JsonTraceParser, ParseStatus, Trace};
use std::fs;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "parser_bench")]
#[command(about = "benchmark the trace parser with the given trace file")]
struct Args {
    #[arg(help = "trace file to parse")]
    file: String,

    #[arg(
        long,
        default_value_t = 1 << 20,
        help = "chunk size in bytes fed to the parser"
    )]
    chunk_size: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let content =
        fs::read(&args.file).with_context(|| format!("failed to read {}", args.file))?;
    ensure!(args.chunk_size > 0, "chunk size must be non-zero");

    let mut parser = JsonTraceParser::new();
    let mut trace = Trace::new();

    let start = Instant::now();
    let mut status = ParseStatus::NeedMoreInput;
    for chunk in content.chunks(args.chunk_size) {
        status = parser
            .parse(&mut trace, chunk)
            .context("invalid trace file")?;
        if status == ParseStatus::Done {
            break;
        }
    }
    ensure!(
        status == ParseStatus::Done,
        "reached end of file before the trace ended"
    );
    let elapsed = start.elapsed();

    let mib = content.len() as f64 / (1024.0 * 1024.0);
    println!(
        "parsed {} events ({:.2} MiB) in {:.3}s: {:.2} MB/s",
        trace.events().len(),
        mib,
        elapsed.as_secs_f64(),
        mib / elapsed.as_secs_f64(),
    );

    Ok(())
}
