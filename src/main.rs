//! Workload replay tool for the layered buffer
//!
//! Loads a file (or synthesizes content), drives a deterministic stream of
//! mark-based edits through the buffer, checks it against a plain byte
//! vector and reports layout statistics and timings.
//!
//! Usage:
//!   layerbuf --file big.txt --edits 100000 --seed 7
//!   layerbuf --size 4194304 --json
//!   samply record ./target/profiling/layerbuf --edits 1000000

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use layerbuf::workload::{Op, Replayer, Rng};
use layerbuf::{Anchor, BufferConfig, BufferStats};

#[derive(Parser, Debug)]
#[command(name = "layerbuf", version)]
#[command(about = "Replay randomized edit workloads against the layered buffer")]
struct Args {
    /// File to load as the initial content
    #[arg(long)]
    file: Option<PathBuf>,

    /// Size of synthesized content when no file is given
    #[arg(long, default_value = "1048576")]
    size: usize,

    /// Number of operations to apply
    #[arg(long, default_value = "10000")]
    edits: usize,

    /// Seed for the operation stream
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Largest single insertion in bytes
    #[arg(long, default_value = "64")]
    max_insert: usize,

    /// Long-lived marks tracked through the whole run
    #[arg(long, default_value = "16")]
    marks: usize,

    /// Check buffer against the model every N operations (0 = only at the end)
    #[arg(long, default_value = "1000")]
    verify_every: usize,

    /// Config file to use instead of ~/.config/layerbuf/config.yaml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the final content to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    operations: usize,
    initial_size: usize,
    final_size: usize,
    elapsed_ms: f64,
    ns_per_op: f64,
    stats: BufferStats,
    config: BufferConfig,
}

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    layerbuf::tracing::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BufferConfig::load_from(path),
        None => BufferConfig::load(),
    };

    let content = match &args.file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => synthesize(args.size),
    };
    let initial_size = content.len();
    tracing::info!(initial_size, edits = args.edits, seed = args.seed, "starting replay");

    let mut replayer = Replayer::new(content, config.clone(), args.marks)?;
    let mut rng = Rng::new(args.seed);
    let mut hint = initial_size / 2;
    let mut busy = Duration::ZERO;

    for step in 0..args.edits {
        let op = Op::random(&mut rng, replayer.model().len(), hint, args.max_insert);
        if let Op::Insert { at, .. } | Op::Remove { from: at, .. } = op {
            hint = at;
        }

        let started = Instant::now();
        replayer.apply(&op)?;
        busy += started.elapsed();

        if args.verify_every > 0 && (step + 1) % args.verify_every == 0 {
            replayer.verify()?;
            tracing::debug!(step = step + 1, stats = ?replayer.buffer().stats(), "verified");
        }
    }
    replayer.verify()?;

    if let Some(path) = &args.output {
        write_content(&mut replayer, path)?;
    }

    let report = Report {
        seed: args.seed,
        operations: args.edits,
        initial_size,
        final_size: replayer.buffer().len(),
        elapsed_ms: busy.as_secs_f64() * 1000.0,
        ns_per_op: busy.as_nanos() as f64 / args.edits.max(1) as f64,
        stats: replayer.buffer().stats(),
        config,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Text shaped like source code: lines with `;` and newlines to scan for
fn synthesize(size: usize) -> Vec<u8> {
    let line = b"let quick = brown.fox(jumps, over); // the lazy dog\n";
    line.iter().copied().cycle().take(size).collect()
}

fn write_content(replayer: &mut Replayer, path: &Path) -> Result<()> {
    let buffer = replayer.buffer_mut();
    buffer.unify()?;

    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let start = buffer.create(Anchor::Start)?;
    let copied = io::copy(&mut buffer.reader(start), &mut writer);
    buffer.destroy(start);
    copied.with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;

    tracing::info!("Wrote {}", path.display());
    Ok(())
}

fn print_report(report: &Report) {
    println!("Replay complete (seed {})", report.seed);
    println!("==============================");
    println!("Operations:   {}", report.operations);
    println!(
        "Size:         {} -> {} bytes",
        report.initial_size, report.final_size
    );
    println!(
        "Time:         {:.2}ms ({:.0} ns/op)",
        report.elapsed_ms, report.ns_per_op
    );
    println!("Layers:       {}", report.stats.layers);
    println!("Segments:     {}", report.stats.segments);
    println!("Marks:        {}", report.stats.marks);
    println!("Garbage:      {} bytes", report.stats.garbage);
}
