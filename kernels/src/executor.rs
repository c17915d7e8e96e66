//! Fork-join execution of the kernels.
//!
//! An [`Executor`] owns a shared rayon [`ThreadPool`] and dispatches each
//! kernel as a set of disjoint partitions over the index domain (see
//! [`Partitions`]). Every call is synchronous: the body runs under
//! [`rayon::ThreadPool::install`] and returns only after the join barrier,
//! so no asynchronous handle ever escapes. Partitions may run in any order
//! and interleaving; a panic inside any partition aborts the whole call and
//! resurfaces at the barrier.

use crate::{
    partition::Partitions,
    tracer::{Kernel, NoopTracer, Tracer},
    Error,
};
use num_traits::Float;
use rayon::{
    iter::{
        IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, ParallelIterator,
    },
    slice::{ParallelSlice, ParallelSliceMut},
    ThreadPoolBuildError, ThreadPoolBuilder,
};
use std::{fmt, num::NonZeroUsize, ops::Range, sync::Arc, time::Instant};

/// A clone-able wrapper around a [rayon]-compatible thread pool.
pub type ThreadPool = Arc<rayon::ThreadPool>;

/// Creates a clone-able [rayon]-compatible thread pool with `concurrency`
/// named worker threads.
pub fn create_pool(concurrency: NonZeroUsize) -> Result<ThreadPool, ThreadPoolBuildError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(concurrency.get())
        .thread_name(|worker| format!("kernel-{worker}"))
        .build()?;
    Ok(Arc::new(pool))
}

/// Executes data-parallel kernels on a shared thread pool.
///
/// Cheap to clone (all state sits behind `Arc`s) and stateless across calls:
/// sequences are caller-owned, passed in and out explicitly, and never
/// retained after a call returns.
///
/// # Example
///
/// ```
/// use millrace_kernels::{create_pool, Executor};
/// use std::num::NonZeroUsize;
///
/// let pool = create_pool(NonZeroUsize::new(4).unwrap()).unwrap();
/// let executor = Executor::new(pool);
///
/// let mut x = vec![0.0f64; 1024];
/// executor.fill(&mut x, |i| i as f64);
/// let total = executor.scan(&mut x);
/// assert_eq!(total, (1023.0 * 1024.0) / 2.0);
/// ```
#[derive(Clone)]
pub struct Executor {
    pool: ThreadPool,
    tracer: Arc<dyn Tracer>,
    grain: Option<NonZeroUsize>,
}

impl Executor {
    /// Creates an executor over `pool` with automatic granularity and no
    /// instrumentation.
    pub fn new(pool: ThreadPool) -> Self {
        Self {
            pool,
            tracer: Arc::new(NoopTracer),
            grain: None,
        }
    }

    /// Overrides automatic partition granularity with a fixed grain.
    ///
    /// The grain is a scheduling hint, never a correctness requirement:
    /// every kernel produces the same contractual output for any grain.
    pub fn with_grain(mut self, grain: NonZeroUsize) -> Self {
        self.grain = Some(grain);
        self
    }

    /// Installs a [`Tracer`] that receives the elapsed wall-clock time of
    /// every kernel call.
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Number of workers in the underlying pool.
    pub fn concurrency(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn partitions(&self, domain: Range<usize>) -> Partitions {
        // current_num_threads is positive for any built pool
        let concurrency =
            NonZeroUsize::new(self.pool.current_num_threads()).unwrap_or(NonZeroUsize::MIN);
        Partitions::new(domain, concurrency, self.grain)
    }

    fn timed<R>(&self, kernel: Kernel, body: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = body();
        self.tracer.record(kernel, start.elapsed());
        out
    }

    /// Writes `f(i)` to every element of `x`.
    ///
    /// `f` must depend only on the index, never on other elements, so any
    /// evaluation order is permitted. A panic inside `f` aborts the whole
    /// call at the join barrier; elements already written stay written.
    pub fn fill<T, F>(&self, x: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let grain = self.partitions(0..x.len()).grain();
        self.timed(Kernel::Fill, || {
            self.pool.install(|| {
                x.par_chunks_mut(grain).enumerate().for_each(|(k, chunk)| {
                    let base = k * grain;
                    for (i, slot) in chunk.iter_mut().enumerate() {
                        *slot = f(base + i);
                    }
                });
            })
        });
    }

    /// Rewrites every `x[i]` to `a * x[i] + y[i]`, in place.
    ///
    /// Requires `y.len() >= x.len()` (checked before dispatch); a longer `y`
    /// is allowed and its tail ignored. Each element is independent, so only
    /// the final contents of `x` are contractual.
    pub fn axpy<T>(&self, a: T, x: &mut [T], y: &[T]) -> Result<(), Error>
    where
        T: Float + Send + Sync,
    {
        if y.len() < x.len() {
            return Err(Error::LengthMismatch {
                needed: x.len(),
                got: y.len(),
            });
        }
        let grain = self.partitions(0..x.len()).grain();
        self.timed(Kernel::Axpy, || {
            self.pool.install(|| {
                x.par_chunks_mut(grain)
                    .zip(y.par_chunks(grain))
                    .for_each(|(xs, ys)| {
                        for (xi, &yi) in xs.iter_mut().zip(ys) {
                            *xi = a * *xi + yi;
                        }
                    });
            })
        });
        Ok(())
    }

    /// Folds `domain` down to a single value.
    ///
    /// Every partition folds its sub-range from a copy of `seed` using
    /// `local`; the per-partition results then merge pairwise with
    /// `combine`. Both operators must be pure, and `combine` associative and
    /// commutative: the merge grouping is unspecified, so for floating-point
    /// accumulation the result is reproducible only up to reassociation.
    ///
    /// Because `seed` is folded into *every* partition, it must be the
    /// identity of the operators unless it is idempotent under them (a
    /// running minimum seeded from an element of the input, for example).
    /// An empty domain returns `seed` unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use millrace_kernels::{create_pool, Executor};
    /// use std::num::NonZeroUsize;
    ///
    /// let pool = create_pool(NonZeroUsize::new(2).unwrap()).unwrap();
    /// let executor = Executor::new(pool);
    ///
    /// let data: Vec<i64> = (0..1000).collect();
    /// let sum_of_squares = executor.reduce(
    ///     0..data.len(),
    ///     0i64,
    ///     |range, mut acc| {
    ///         for i in range {
    ///             acc += data[i] * data[i];
    ///         }
    ///         acc
    ///     },
    ///     |a, b| a + b,
    /// );
    /// assert_eq!(sum_of_squares, (0..1000i64).map(|v| v * v).sum());
    /// ```
    pub fn reduce<T, L, C>(&self, domain: Range<usize>, seed: T, local: L, combine: C) -> T
    where
        T: Clone + Send + Sync,
        L: Fn(Range<usize>, T) -> T + Sync,
        C: Fn(T, T) -> T + Sync,
    {
        self.timed(Kernel::Reduce, || {
            self.fold_partitions(domain, seed, local, combine)
        })
    }

    /// The reduction engine behind [`reduce`](Self::reduce),
    /// [`sqrt_dot`](Self::sqrt_dot) and [`min`](Self::min): local
    /// per-partition folds, merged at the barrier.
    fn fold_partitions<T, L, C>(&self, domain: Range<usize>, seed: T, local: L, combine: C) -> T
    where
        T: Clone + Send + Sync,
        L: Fn(Range<usize>, T) -> T + Sync,
        C: Fn(T, T) -> T + Sync,
    {
        let parts: Vec<_> = self.partitions(domain).iter().collect();
        self.pool.install(|| {
            parts
                .into_par_iter()
                .map(|range| local(range, seed.clone()))
                .reduce_with(&combine)
                .unwrap_or_else(|| seed.clone())
        })
    }

    /// Square root of the inner product of `x` and `y`.
    ///
    /// The domain is truncated to the shorter input; an empty domain yields
    /// zero. A pathologically negative accumulated total (cancellation)
    /// surfaces as NaN from the square root, never as a silently clamped
    /// value.
    pub fn sqrt_dot<T>(&self, x: &[T], y: &[T]) -> T
    where
        T: Float + Send + Sync,
    {
        let n = x.len().min(y.len());
        self.timed(Kernel::SqrtDot, || {
            self.fold_partitions(
                0..n,
                T::zero(),
                |range, mut acc| {
                    for i in range {
                        acc = acc + x[i] * y[i];
                    }
                    acc
                },
                |a, b| a + b,
            )
            .sqrt()
        })
    }

    /// Minimum element of `x`; fails on an empty input.
    ///
    /// Seeds from `x[0]` and folds the remaining indices, so a length-one
    /// input reduces to its only element. NaN handling follows
    /// [`Float::min`]: a NaN operand loses to any ordered value.
    pub fn min<T>(&self, x: &[T]) -> Result<T, Error>
    where
        T: Float + Send + Sync,
    {
        let (&seed, _) = x.split_first().ok_or(Error::EmptyInput)?;
        Ok(self.timed(Kernel::Min, || {
            self.fold_partitions(
                1..x.len(),
                seed,
                |range, mut acc| {
                    for i in range {
                        acc = acc.min(x[i]);
                    }
                    acc
                },
                |a, b| a.min(b),
            )
        }))
    }

    /// Collects the filter emissions of `x` against `y`.
    ///
    /// For each index `i` over the shorter of the two inputs, evaluated
    /// independently per index:
    ///
    /// - `x[i] > y[i]` emits `x[i]`;
    /// - otherwise `y[i] > 0.5 && y[i] > x[i]` emits `y[i]` then
    ///   `x[i] * y[i]`;
    /// - otherwise nothing.
    ///
    /// The output is indistinguishable from a sequential single pass: each
    /// partition emits into a private buffer, and the buffers are
    /// concatenated in ascending partition order by the calling thread after
    /// the join barrier. Completion order never influences the result, and
    /// no lock is taken.
    pub fn filter_collect<T>(&self, x: &[T], y: &[T]) -> Result<Vec<T>, Error>
    where
        T: Float + Send + Sync,
    {
        // 0.5 is a power of two, exact in every binary float
        let gate = T::from(0.5).unwrap();
        let n = x.len().min(y.len());
        let parts: Vec<_> = self.partitions(0..n).iter().collect();
        self.timed(Kernel::FilterCollect, || {
            let locals: Vec<Vec<T>> = self.pool.install(|| {
                parts
                    .into_par_iter()
                    .map(|range| -> Result<Vec<T>, Error> {
                        let mut local = Vec::new();
                        local.try_reserve(range.len())?;
                        for i in range {
                            if x[i] > y[i] {
                                local.push(x[i]);
                            } else if y[i] > gate && y[i] > x[i] {
                                local.push(y[i]);
                                local.push(x[i] * y[i]);
                            }
                        }
                        Ok(local)
                    })
                    .collect::<Result<_, _>>()
            })?;
            let emitted: usize = locals.iter().map(Vec::len).sum();
            let mut out = Vec::new();
            out.try_reserve_exact(emitted)?;
            for local in locals {
                out.extend(local);
            }
            Ok(out)
        })
    }

    /// Computes the inclusive prefix sum of `x` in place and returns the
    /// grand total (zero for an empty input).
    ///
    /// Two passes over the same partition set: a totals pass sums each
    /// partition without touching `x`, then a commit pass rewrites each
    /// partition on top of the combined total of every preceding partition.
    /// Only commit-pass writes are observable.
    ///
    /// Scanning is deliberately not idempotent: applying it twice yields the
    /// doubly accumulated sequence.
    pub fn scan<T>(&self, x: &mut [T]) -> T
    where
        T: Float + Send + Sync,
    {
        let grain = self.partitions(0..x.len()).grain();
        self.timed(Kernel::Scan, || {
            let totals = self.totals_pass(x, grain);
            let mut offsets = totals;
            let mut run = T::zero();
            for offset in offsets.iter_mut() {
                let total = *offset;
                *offset = run;
                run = run + total;
            }
            self.commit_pass(x, grain, &offsets);
            x.last().copied().unwrap_or_else(T::zero)
        })
    }

    /// Scan phase 1: per-partition totals, read-only.
    fn totals_pass<T>(&self, x: &[T], grain: usize) -> Vec<T>
    where
        T: Float + Send + Sync,
    {
        self.pool.install(|| {
            x.par_chunks(grain)
                .map(|chunk| chunk.iter().fold(T::zero(), |acc, &v| acc + v))
                .collect()
        })
    }

    /// Scan phase 2: rewrites each partition as its local running sum plus
    /// the offset carried in from every preceding partition.
    fn commit_pass<T>(&self, x: &mut [T], grain: usize, offsets: &[T])
    where
        T: Float + Send + Sync,
    {
        self.pool.install(|| {
            x.par_chunks_mut(grain)
                .zip(offsets.par_iter())
                .for_each(|(chunk, &offset)| {
                    let mut run = offset;
                    for v in chunk.iter_mut() {
                        run = run + *v;
                        *v = run;
                    }
                });
        });
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("concurrency", &self.pool.current_num_threads())
            .field("grain", &self.grain)
            .finish_non_exhaustive()
    }
}
