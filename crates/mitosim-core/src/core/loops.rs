//! Loop and chain interval types, and the pure interval computations shared by
//! loop-layout and force actions: backbone derivation and root-loop detection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod random;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum LoopError {
    #[error("root loops [{0}, {1}] and [{2}, {3}] overlap")]
    OverlappingRoots(usize, usize, usize, usize),

    #[error("loop [{start}, {end}] does not fit into a system of {n} particles")]
    OutOfBounds { start: usize, end: usize, n: usize },

    #[error("invalid loop-array parameter: {0}")]
    InvalidParameter(String),
}

/// A contiguous chain of particles `[start, end)`. `end = None` stands for the
/// total particle count, which is only known once the shared state carries `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainSpan {
    pub start: usize,
    pub end: Option<usize>,
    #[serde(default)]
    pub is_ring: bool,
}

impl ChainSpan {
    pub fn new(start: usize, end: Option<usize>, is_ring: bool) -> Self {
        Self {
            start,
            end,
            is_ring,
        }
    }

    /// Resolves the open end against the total particle count.
    pub fn resolve_end(&self, n: usize) -> usize {
        self.end.unwrap_or(n)
    }
}

/// A chromatin loop anchored on the backbone at `start` and `end` (both inclusive
/// anchors; the particles strictly between them form the loop body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoopSpan {
    pub start: usize,
    pub end: usize,
}

impl LoopSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start < end, "loop anchors must be ordered");
        Self { start, end }
    }

    /// Number of bonds along the loop between its two anchors.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` lies strictly inside this loop.
    pub fn contains(&self, other: &LoopSpan) -> bool {
        (self.start <= other.start && other.end <= self.end) && self != other
    }

    pub fn shifted(self, offset: usize) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

/// Indices (into `loops`) of the root loops: loops not nested inside any other loop.
pub fn root_loops(loops: &[LoopSpan]) -> Vec<usize> {
    loops
        .iter()
        .enumerate()
        .filter(|(i, lp)| {
            !loops
                .iter()
                .enumerate()
                .any(|(j, other)| j != *i && other.contains(lp))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Particle indices forming the main chain: everything outside the interiors of
/// the root loops. Loop anchors themselves belong to the backbone.
///
/// Overlapping (non-nested) root loops make the backbone ill-defined and are
/// rejected.
pub fn backbone_indices(loops: &[LoopSpan], n: usize) -> Result<Vec<usize>, LoopError> {
    for lp in loops {
        if lp.end >= n {
            return Err(LoopError::OutOfBounds {
                start: lp.start,
                end: lp.end,
                n,
            });
        }
    }

    let roots = root_loops(loops);
    let mut root_spans: Vec<LoopSpan> = roots.iter().map(|&i| loops[i]).collect();
    root_spans.sort();
    for pair in root_spans.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(LoopError::OverlappingRoots(
                pair[0].start,
                pair[0].end,
                pair[1].start,
                pair[1].end,
            ));
        }
    }

    let mut inside = vec![false; n];
    for span in &root_spans {
        for flag in inside
            .iter_mut()
            .take(span.end)
            .skip(span.start + 1)
        {
            *flag = true;
        }
    }

    Ok((0..n).filter(|&i| !inside[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backbone_excludes_loop_interiors_but_keeps_anchors() {
        let loops = vec![LoopSpan::new(2, 5), LoopSpan::new(7, 9)];
        let backbone = backbone_indices(&loops, 12).unwrap();
        assert_eq!(backbone, vec![0, 1, 2, 5, 6, 7, 9, 10, 11]);
    }

    #[test]
    fn backbone_without_loops_is_the_whole_chain() {
        let backbone = backbone_indices(&[], 4).unwrap();
        assert_eq!(backbone, vec![0, 1, 2, 3]);
    }

    #[test]
    fn nested_loops_do_not_widen_the_excluded_interior() {
        let loops = vec![LoopSpan::new(1, 8), LoopSpan::new(2, 4)];
        let backbone = backbone_indices(&loops, 10).unwrap();
        assert_eq!(backbone, vec![0, 1, 8, 9]);
    }

    #[test]
    fn root_loops_skip_nested_intervals() {
        let loops = vec![
            LoopSpan::new(0, 10),
            LoopSpan::new(2, 4),
            LoopSpan::new(12, 20),
        ];
        assert_eq!(root_loops(&loops), vec![0, 2]);
    }

    #[test]
    fn overlapping_root_loops_are_rejected() {
        let loops = vec![LoopSpan::new(0, 5), LoopSpan::new(3, 8)];
        let err = backbone_indices(&loops, 10).unwrap_err();
        assert_eq!(err, LoopError::OverlappingRoots(0, 5, 3, 8));
    }

    #[test]
    fn out_of_bounds_loop_is_rejected() {
        let loops = vec![LoopSpan::new(2, 10)];
        assert!(matches!(
            backbone_indices(&loops, 10),
            Err(LoopError::OutOfBounds { .. })
        ));
    }
}
