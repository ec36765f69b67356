#![forbid(unsafe_code)]

//! Harness utilities for driving the reorder window with synthetic arrival
//! patterns. Everything is seeded so scenario runs are reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

/// The sequence numbers of `range`, shuffled deterministically.
pub fn shuffled(range: RangeInclusive<u64>, seed: u64) -> Vec<u64> {
    let mut values: Vec<u64> = range.collect();
    values.shuffle(&mut StdRng::seed_from_u64(seed));
    values
}

/// Per-packet drop decisions for `count` packets at probability `p`.
pub fn drop_mask(count: usize, p: f64, seed: u64) -> Vec<bool> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_bool(p)).collect()
}

/// How many adjacent pairs step downward. A receiver observing the sequence
/// counts exactly one reversal per such pair.
pub fn descending_adjacent_pairs(values: &[u64]) -> u64 {
    values.windows(2).filter(|w| w[1] < w[0]).count() as u64
}

/// Continuity-relevant shape of a drop mask over a single flow, assuming the
/// stream is bounded by delivered packets on both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskSummary {
    /// Total packets dropped.
    pub dropped: u64,
    /// Gap runs of length at least 2; the tracker reports each as one burst.
    pub gaps: u64,
    /// Gap runs of length at least 3; each registers one continuity break.
    pub breaks: u64,
    /// Longest gap run of length at least 2, 0 if none.
    pub longest: u64,
}

/// Summarize a mask (`true` = dropped) run by run.
pub fn summarize_mask(mask: &[bool]) -> MaskSummary {
    let mut summary = MaskSummary::default();
    let mut run = 0u64;
    for &dropped in mask {
        if dropped {
            run += 1;
            summary.dropped += 1;
            continue;
        }
        close_run(&mut summary, run);
        run = 0;
    }
    close_run(&mut summary, run);
    summary
}

fn close_run(summary: &mut MaskSummary, run: u64) {
    if run >= 2 {
        summary.gaps += 1;
        summary.longest = summary.longest.max(run);
    }
    if run >= 3 {
        summary.breaks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        assert_eq!(shuffled(1..=50, 7), shuffled(1..=50, 7));
        assert_ne!(shuffled(1..=50, 7), shuffled(1..=50, 8));
    }

    #[test]
    fn descending_pairs_counts_steps_down() {
        assert_eq!(descending_adjacent_pairs(&[1, 2, 3]), 0);
        assert_eq!(descending_adjacent_pairs(&[3, 1, 2, 1]), 2);
        assert_eq!(descending_adjacent_pairs(&[]), 0);
    }

    #[test]
    fn mask_summary_classifies_runs() {
        // Runs: 1 (invisible), 2 (gap), 4 (gap + break).
        let mask = [
            false, true, false, // run of 1
            true, true, false, // run of 2
            true, true, true, true, // trailing run of 4
        ];
        let s = summarize_mask(&mask);
        assert_eq!(s.dropped, 7);
        assert_eq!(s.gaps, 2);
        assert_eq!(s.breaks, 1);
        assert_eq!(s.longest, 4);
    }
}
