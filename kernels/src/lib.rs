//! Fork-join data-parallel kernels over contiguous numeric sequences.
//!
//! This crate provides an [`Executor`] that dispatches a small family of
//! numeric kernels across a shared rayon thread pool: elementwise generation
//! ([`Executor::fill`]), elementwise affine transform ([`Executor::axpy`]),
//! a generic reduction engine ([`Executor::reduce`]) with two concrete
//! reductions ([`Executor::sqrt_dot`], [`Executor::min`]), a
//! predicate-driven variable-output filter ([`Executor::filter_collect`]),
//! and a two-phase inclusive prefix sum ([`Executor::scan`]).
//!
//! # Execution model
//!
//! Every call splits its index domain into disjoint, contiguous partitions
//! (see [`Partitions`]) and runs them fork-join on the executor's pool: the
//! call blocks until every partition has finished, then returns. Partitions
//! execute in an unspecified order and may be visited more than once (the
//! scan's two phases); no kernel retains state across calls, and sequences
//! stay caller-owned throughout.
//!
//! # Determinism
//!
//! Reductions merge per-partition partials in an unspecified grouping, so
//! their results are reproducible only up to floating-point reassociation.
//! Output *ordering* is nevertheless guaranteed wherever it is observable:
//! [`Executor::filter_collect`] returns exactly what a sequential pass would
//! emit, and [`Executor::scan`] commits exactly the sequential inclusive
//! prefix sums (up to the same reassociation of partial totals).
//!
//! # Failure
//!
//! Precondition violations ([`Error::LengthMismatch`], [`Error::EmptyInput`])
//! are reported before any partition is dispatched, and allocation failures
//! ([`Error::Allocation`]) surface at the join barrier; in both cases the
//! call fails as a whole. A panic in a caller-supplied closure aborts the
//! call and resurfaces at the barrier. Sequences mutated in place are not
//! rolled back on failure.
//!
//! # Example
//!
//! ```
//! use millrace_kernels::{create_pool, Executor};
//! use std::num::NonZeroUsize;
//!
//! let pool = create_pool(NonZeroUsize::new(2).unwrap()).unwrap();
//! let executor = Executor::new(pool);
//!
//! // Generate, transform, reduce.
//! let mut x = vec![0.0f64; 5];
//! executor.fill(&mut x, |i| (i * i) as f64);
//! assert_eq!(x, [0.0, 1.0, 4.0, 9.0, 16.0]);
//!
//! let y = vec![1.0f64; 5];
//! executor.axpy(2.0, &mut x, &y).unwrap();
//! assert_eq!(x, [1.0, 3.0, 9.0, 19.0, 33.0]);
//!
//! // Scan in place, keeping the grand total.
//! let total = executor.scan(&mut x);
//! assert_eq!(x, [1.0, 4.0, 13.0, 32.0, 65.0]);
//! assert_eq!(total, 65.0);
//! ```

mod error;
pub use error::Error;
mod executor;
pub use executor::{create_pool, Executor, ThreadPool};
mod partition;
pub use partition::Partitions;
mod tracer;
pub use tracer::{Kernel, LogTracer, NoopTracer, Tracer};
