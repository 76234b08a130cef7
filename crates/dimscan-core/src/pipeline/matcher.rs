//! Dimension matching against a target size.

use crate::types::MatchMode;

/// Which sides of an image satisfied the criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimensionHits {
    pub width: bool,
    pub height: bool,
}

impl DimensionHits {
    /// True if either side matched.
    pub fn any(&self) -> bool {
        self.width || self.height
    }
}

/// Pure dimension matcher.
pub struct DimensionMatcher;

impl DimensionMatcher {
    /// Whether an image of `width` x `height` matches `target` under `mode`.
    ///
    /// - `Exact`: either side equals the target
    /// - `Lte`: either side is at most the target
    pub fn matches(width: u32, height: u32, target: u32, mode: MatchMode) -> bool {
        Self::dimension_hits(width, height, target, mode).any()
    }

    /// Per-side result of the comparison.
    pub fn dimension_hits(width: u32, height: u32, target: u32, mode: MatchMode) -> DimensionHits {
        let side = |value: u32| match mode {
            MatchMode::Exact => value == target,
            MatchMode::Lte => value <= target,
        };
        DimensionHits {
            width: side(width),
            height: side(height),
        }
    }
}
