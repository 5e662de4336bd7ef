use std::{fs::File, io::BufReader, path::PathBuf, process::exit};

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;
use tracedemux::{demux, sink::FileSinkPool, DemuxOptions};

#[derive(Parser)]
#[command(version)]
/// Splits an interleaved node trace file into one outfile per node
pub struct Args {
    /// Path to the interleaved trace file
    trace_path: PathBuf,
    /// Upper bound on node ids; records at or above it abort the run
    max_node_count: Option<u64>,
    #[arg(short, long)]
    /// Directory the outfiles are written to, current directory by default
    out_dir: Option<PathBuf>,
    #[arg(short, long)]
    /// Truncate existing outfiles instead of appending
    truncate: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::new().default_filter_or("info"));
    // usage errors exit 1, not clap's default 2
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            exit(1);
        }
    };
    let trace_file = File::open(&args.trace_path)
        .with_context(|| format!("cannot open trace file {}", args.trace_path.display()))?;
    let out_dir = args.out_dir.unwrap_or_else(|| PathBuf::from("."));
    let mut pool = FileSinkPool::new(&out_dir).truncate_existing(args.truncate);
    let options = DemuxOptions {
        max_nodes: args.max_node_count,
        ..DemuxOptions::default()
    };
    let stats = demux(BufReader::new(trace_file), &mut pool, &options)
        .with_context(|| format!("demuxing {} failed", args.trace_path.display()))?;
    pool.finish().context("flushing outfiles failed")?;
    info!(
        "routed {} record(s) to {} outfile(s), skipped {} malformed line(s)",
        stats.records, stats.nodes, stats.skipped
    );
    Ok(())
}
