//! Timing instrumentation for kernel calls.
//!
//! Every [`Executor`](crate::Executor) call is timed symmetrically around its
//! body: a timestamp is taken before dispatch and the elapsed wall-clock time
//! is reported once the join barrier has passed, keyed by the [`Kernel`] that
//! ran. The default collaborator is [`NoopTracer`]; kernels behave
//! identically whichever implementation is installed.

use std::{fmt, time::Duration};
use tracing::debug;

/// Identifies a kernel in instrumentation output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    Fill,
    Axpy,
    Reduce,
    SqrtDot,
    Min,
    FilterCollect,
    Scan,
}

impl Kernel {
    /// Stable name used as the instrumentation key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Axpy => "axpy",
            Self::Reduce => "reduce",
            Self::SqrtDot => "sqrt_dot",
            Self::Min => "min",
            Self::FilterCollect => "filter_collect",
            Self::Scan => "scan",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records wall-clock time spent inside kernel bodies.
///
/// `record` is invoked exactly once per kernel call, on the calling thread,
/// after the join barrier. Implementations must be cheap and must not panic;
/// the kernels never read anything back from the tracer.
pub trait Tracer: Send + Sync {
    /// Reports that `kernel` ran for `elapsed`.
    fn record(&self, kernel: Kernel, elapsed: Duration);
}

/// Discards every observation (the default collaborator).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn record(&self, _: Kernel, _: Duration) {}
}

/// Emits one `tracing` debug event per kernel call.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn record(&self, kernel: Kernel, elapsed: Duration) {
        debug!(kernel = kernel.as_str(), ?elapsed, "kernel complete");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kernel_names_are_distinct() {
        let kernels = [
            Kernel::Fill,
            Kernel::Axpy,
            Kernel::Reduce,
            Kernel::SqrtDot,
            Kernel::Min,
            Kernel::FilterCollect,
            Kernel::Scan,
        ];
        let names: std::collections::HashSet<_> =
            kernels.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), kernels.len());
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(Kernel::SqrtDot.to_string(), "sqrt_dot");
        assert_eq!(Kernel::FilterCollect.to_string(), "filter_collect");
    }
}
