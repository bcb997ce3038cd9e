use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::{
    core::Iso3,
    error::{RaceError, RaceResult},
    interp::Lerp,
};

/// Default per-frame easing factor (~10 frames to settle).
pub const DEFAULT_LERP_FACTOR: f64 = 0.1;

/// Positions closer to their target than this snap to it exactly.
pub const SETTLE_TOLERANCE: f64 = 0.1;

const PURGE_INTERVAL: Duration = Duration::from_secs(5);

/// Per-country vertical positions, eased toward rank-derived targets so bars
/// glide instead of jumping when the ranking reorders.
///
/// Entries are created lazily at an off-screen position on first appearance
/// and purged periodically once their country leaves the visible set. Single
/// owner: the driving loop.
#[derive(Clone, Debug)]
pub struct PositionSmoother {
    positions: HashMap<Iso3, f64>,
    lerp_factor: f64,
    next_purge_at: Duration,
}

impl PositionSmoother {
    pub fn new(lerp_factor: f64) -> RaceResult<Self> {
        if !(lerp_factor > 0.0 && lerp_factor <= 1.0) {
            return Err(RaceError::validation(format!(
                "lerp factor must be in (0, 1], got {lerp_factor}"
            )));
        }
        Ok(Self {
            positions: HashMap::new(),
            lerp_factor,
            next_purge_at: PURGE_INTERVAL,
        })
    }

    /// Eases a country one step toward `target`, inserting it at `enter_from`
    /// (below the visible area) the first time it is seen. Returns the new
    /// position.
    pub fn step(&mut self, iso3: Iso3, target: f64, enter_from: f64) -> f64 {
        let current = self.positions.entry(iso3).or_insert(enter_from);
        *current = f64::lerp(current, &target, self.lerp_factor);
        *current
    }

    pub fn position(&self, iso3: Iso3) -> Option<f64> {
        self.positions.get(&iso3).copied()
    }

    /// Drops positions for countries outside `visible`, at most once per
    /// purge interval of timer time. Returns how many entries were removed.
    pub fn maybe_purge(&mut self, elapsed: Duration, visible: &HashSet<Iso3>) -> usize {
        if elapsed < self.next_purge_at {
            return 0;
        }
        self.next_purge_at = elapsed + PURGE_INTERVAL;

        let before = self.positions.len();
        self.positions.retain(|iso3, _| visible.contains(iso3));
        let removed = before - self.positions.len();
        if removed > 0 {
            tracing::debug!(removed, tracked = self.positions.len(), "purged off-screen positions");
        }
        removed
    }

    /// End-of-timeline catch-up: one extra easing step per call, snapping
    /// positions within [`SETTLE_TOLERANCE`] to their exact target. Returns
    /// true once every listed country is settled.
    pub fn finish_pass(&mut self, targets: &[(Iso3, f64)]) -> bool {
        let mut settled = true;
        for &(iso3, target) in targets {
            let Some(current) = self.positions.get_mut(&iso3) else {
                continue;
            };
            if (target - *current).abs() > SETTLE_TOLERANCE {
                settled = false;
                *current = f64::lerp(current, &target, self.lerp_factor);
            } else {
                *current = target;
            }
        }
        settled
    }

    pub fn tracked(&self) -> usize {
        self.positions.len()
    }
}
