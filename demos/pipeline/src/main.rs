//! Drives every kernel once over large generated sequences, logging results
//! and per-kernel timings.

use clap::{value_parser, Arg, Command};
use millrace_kernels::{create_pool, Executor, LogTracer};
use std::{num::NonZeroUsize, sync::Arc, thread};
use tracing::{info, Level};

fn main() {
    // Create logger
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    // Parse arguments
    let matches = Command::new("millrace-pipeline")
        .about("drive every kernel over large generated sequences")
        .arg(
            Arg::new("len")
                .long("len")
                .help("elements in each sequence")
                .value_parser(value_parser!(usize))
                .default_value("67108864"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .help("worker threads (defaults to available parallelism)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("grain")
                .long("grain")
                .help("elements per partition (0 selects automatic granularity)")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
        .get_matches();
    let n = *matches.get_one::<usize>("len").unwrap();
    let threads = matches
        .get_one::<usize>("threads")
        .copied()
        .and_then(NonZeroUsize::new)
        .unwrap_or_else(|| {
            thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
        });
    let grain = *matches.get_one::<usize>("grain").unwrap();

    // Assemble the executor
    let pool = create_pool(threads).expect("Could not build thread pool");
    let mut executor = Executor::new(pool).with_tracer(Arc::new(LogTracer));
    if let Some(grain) = NonZeroUsize::new(grain) {
        executor = executor.with_grain(grain);
    }
    info!(n, concurrency = executor.concurrency(), "generating sequences");

    // Generate and transform
    let mut x = vec![0.0f64; n];
    let mut y = vec![0.0f64; n];
    executor.fill(&mut x, |i| (i as f64).sin());
    executor.fill(&mut y, |i| (i as f64).cos());
    executor.axpy(0.5, &mut x, &y).expect("y covers x");

    // Reduce
    info!(norm = executor.sqrt_dot(&x, &y), "inner product");
    if let Ok(smallest) = executor.min(&x) {
        info!(smallest, "minimum");
    }

    // Filter
    let kept = executor
        .filter_collect(&x, &y)
        .expect("Could not allocate filter output");
    info!(emitted = kept.len(), "filter");

    // Scan
    let total = executor.scan(&mut x);
    info!(total, "inclusive prefix sum committed");
}
