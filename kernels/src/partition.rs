//! Splitting an index domain into contiguous partitions.

use std::{num::NonZeroUsize, ops::Range};

/// Partitions targeted per worker when no grain is supplied.
///
/// Several partitions per worker leave the scheduler room to steal work from
/// a slow partition without making partitions so small that dispatch overhead
/// dominates.
const PARTITIONS_PER_WORKER: usize = 4;

/// An ordered set of disjoint, contiguous sub-ranges covering a half-open
/// index domain.
///
/// Partition `k` covers `[start + k*grain, start + (k+1)*grain)`, with the
/// final partition truncated to the end of the domain. Because every
/// partition except the last has exactly `grain` elements, views produced by
/// `slice.chunks(grain)` (or rayon's `par_chunks`) line up one-to-one with
/// the partition set.
///
/// An empty domain yields no partitions. The grain is a [`NonZeroUsize`], so
/// a zero-derived grain is unrepresentable; callers holding an untrusted hint
/// pass `None` to fall back to automatic granularity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partitions {
    domain: Range<usize>,
    grain: NonZeroUsize,
}

impl Partitions {
    /// Splits `domain` for execution on `concurrency` workers.
    ///
    /// When `grain` is `None`, granularity is derived from the domain length
    /// so that each worker receives several partitions (with a floor of one
    /// element per partition).
    pub fn new(
        domain: Range<usize>,
        concurrency: NonZeroUsize,
        grain: Option<NonZeroUsize>,
    ) -> Self {
        // Normalize inverted ranges to empty so length math stays sane.
        let domain = domain.start..domain.end.max(domain.start);
        let len = domain.end - domain.start;
        let grain = grain.unwrap_or_else(|| Self::auto_grain(len, concurrency));
        Self { domain, grain }
    }

    fn auto_grain(len: usize, concurrency: NonZeroUsize) -> NonZeroUsize {
        let target = concurrency.get().saturating_mul(PARTITIONS_PER_WORKER);
        NonZeroUsize::new(len.div_ceil(target)).unwrap_or(NonZeroUsize::MIN)
    }

    /// The domain covered by this partition set.
    pub fn domain(&self) -> Range<usize> {
        self.domain.clone()
    }

    /// Elements per partition (the final partition may hold fewer).
    pub fn grain(&self) -> usize {
        self.grain.get()
    }

    /// Number of partitions.
    pub fn count(&self) -> usize {
        (self.domain.end - self.domain.start).div_ceil(self.grain.get())
    }

    /// Iterates the partitions in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let Range { start, end } = self.domain.clone();
        let grain = self.grain.get();
        (0..self.count()).map(move |k| {
            let lo = start + k * grain;
            lo..end.min(lo + grain)
        })
    }
}
