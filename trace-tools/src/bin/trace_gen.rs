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
use eyre::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};

#[derive(Parser)]
#[command(name = "trace_gen")]
#[command(about = "generate a large synthetic chrome trace file for benchmarking")]
struct Args {
    #[arg(short, long, help = "write output to FILE instead of stdout")]
    out: Option<String>,

    #[arg(long, default_value_t = 0, help = "seed for the random number generator")]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match &args.out {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("failed to create {path}"))?;
            let mut writer = BufWriter::new(file);
            trace_tools::gen::generate(&mut writer, args.seed)?;
            writer.flush()?;
            tracing::info!(path = %path, seed = args.seed, "trace written");
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            trace_tools::gen::generate(&mut writer, args.seed)?;
            writer.flush()?;
        }
    }

    Ok(())
}
