//! End-to-end pipeline shaped like a real driver: generate two sequences,
//! transform one against the other, reduce, filter and scan, comparing every
//! stage against a sequential model across thread counts and grains.

use millrace_kernels::{create_pool, Executor};
use std::num::NonZeroUsize;

const N: usize = 10_000;

fn executor(concurrency: usize, grain: Option<usize>) -> Executor {
    let pool = create_pool(NonZeroUsize::new(concurrency).unwrap()).unwrap();
    let executor = Executor::new(pool);
    match grain {
        Some(grain) => executor.with_grain(NonZeroUsize::new(grain).unwrap()),
        None => executor,
    }
}

/// Sequential model of the whole pipeline.
mod model {
    pub fn axpy(a: f64, x: &mut [f64], y: &[f64]) {
        for (xi, &yi) in x.iter_mut().zip(y) {
            *xi = a * *xi + yi;
        }
    }

    pub fn sqrt_dot(x: &[f64], y: &[f64]) -> f64 {
        x.iter().zip(y).map(|(&a, &b)| a * b).sum::<f64>().sqrt()
    }

    pub fn min(x: &[f64]) -> f64 {
        x.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn filter_collect(x: &[f64], y: &[f64]) -> Vec<f64> {
        let mut out = Vec::new();
        for i in 0..x.len().min(y.len()) {
            if x[i] > y[i] {
                out.push(x[i]);
            } else if y[i] > 0.5 && y[i] > x[i] {
                out.push(y[i]);
                out.push(x[i] * y[i]);
            }
        }
        out
    }

    pub fn scan(x: &mut [f64]) -> f64 {
        let mut run = 0.0;
        for v in x.iter_mut() {
            run += *v;
            *v = run;
        }
        run
    }
}

fn assert_close(got: f64, want: f64, what: &str) {
    let tolerance = 1e-8 * want.abs().max(1.0);
    assert!(
        (got - want).abs() <= tolerance,
        "{what}: {got} != {want} (tolerance {tolerance})"
    );
}

/// Transcendental inputs: reductions and scans agree with the sequential
/// model up to reassociation; everything order-sensitive agrees exactly.
#[test]
fn pipeline_matches_sequential_model() {
    for concurrency in [1, 2, 8] {
        for grain in [None, Some(64), Some(997), Some(N * 2)] {
            let executor = executor(concurrency, grain);

            let mut x = vec![0.0f64; N];
            let mut y = vec![0.0f64; N];
            executor.fill(&mut x, |i| (i as f64).sin());
            executor.fill(&mut y, |i| (i as f64).cos());

            let mut mx: Vec<f64> = (0..N).map(|i| (i as f64).sin()).collect();
            let my: Vec<f64> = (0..N).map(|i| (i as f64).cos()).collect();
            assert_eq!(x, mx, "fill is order-insensitive");

            executor.axpy(0.5, &mut x, &y).unwrap();
            model::axpy(0.5, &mut mx, &my);
            assert_eq!(x, mx, "axpy is elementwise exact");

            assert_close(
                executor.sqrt_dot(&x, &y),
                model::sqrt_dot(&mx, &my),
                "sqrt_dot",
            );
            assert_eq!(executor.min(&x).unwrap(), model::min(&mx));
            assert_eq!(
                executor.filter_collect(&x, &y).unwrap(),
                model::filter_collect(&mx, &my),
                "filter emission order"
            );

            let total = executor.scan(&mut x);
            let model_total = model::scan(&mut mx);
            assert_close(total, model_total, "scan total");
            for (i, (&got, &want)) in x.iter().zip(&mx).enumerate() {
                assert_close(got, want, &format!("scan[{i}]"));
            }
        }
    }
}

/// Dyadic inputs (multiples of 1/8) keep every product and sum exact, so the
/// whole pipeline must be bit-identical to the sequential model at any
/// thread count and grain.
#[test]
fn pipeline_is_exact_on_dyadic_data() {
    let gen_x = |i: usize| ((i % 17) as f64 - 8.0) / 8.0;
    let gen_y = |i: usize| ((i % 23) as f64 - 4.0) / 8.0;

    let mut mx: Vec<f64> = (0..N).map(gen_x).collect();
    let my: Vec<f64> = (0..N).map(gen_y).collect();
    model::axpy(0.5, &mut mx, &my);
    let want_norm = model::sqrt_dot(&mx, &my);
    let want_min = model::min(&mx);
    let want_kept = model::filter_collect(&mx, &my);
    let mut want_scanned = mx.clone();
    let want_total = model::scan(&mut want_scanned);

    for concurrency in [1, 2, 8] {
        for grain in [None, Some(1), Some(64), Some(997)] {
            let executor = executor(concurrency, grain);

            let mut x = vec![0.0f64; N];
            let mut y = vec![0.0f64; N];
            executor.fill(&mut x, gen_x);
            executor.fill(&mut y, gen_y);
            executor.axpy(0.5, &mut x, &y).unwrap();

            assert_eq!(executor.sqrt_dot(&x, &y), want_norm);
            assert_eq!(executor.min(&x).unwrap(), want_min);
            assert_eq!(executor.filter_collect(&x, &y).unwrap(), want_kept);

            let total = executor.scan(&mut x);
            assert_eq!(x, want_scanned);
            assert_eq!(total, want_total);
        }
    }
}
