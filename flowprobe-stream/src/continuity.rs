//! Per-port continuity tracking.
//! Classifies each arrival against its own flow's last-seen sequence number,
//! independently of the stream-wide reorder window.

#![forbid(unsafe_code)]

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Continuity counters for one flowlet port.
///
/// `last_known_sn` is 0 only before the port's first arrival, because flow
/// sequence numbers start at 1 on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowInterval {
    pub last_known_sn: u64,
    /// Number of forward gaps (> +1) observed.
    pub burst_count: u64,
    /// Count of discontinuities at or below -2.
    pub reverses: u64,
    /// Count of discontinuities of exactly -1.
    pub duplicates: u64,
    /// Largest forward gap seen.
    pub longest_burst: u64,
    /// Number of discontinuities with magnitude above 2.
    pub seq_breaks: u64,
}

/// What one arrival did to its flow, as reported back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowUpdate {
    /// Forward gap length, 0 unless the arrival jumped ahead by more than one.
    pub burst_len: u64,
    /// The flow's cumulative gap count, reported only alongside a non-zero `burst_len`.
    pub burst_count: u64,
}

/// Tracks one [`FlowInterval`] per port, created lazily on first arrival.
#[derive(Debug, Default)]
pub struct ContinuityTracker {
    flows: BTreeMap<u16, FlowInterval>,
}

impl ContinuityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one arrival on `port` and classify it against the flow's
    /// expectation.
    ///
    /// `last_known_sn` is always moved to the arriving sequence number, even
    /// for reversals, so after a long reversal the next in-order arrivals
    /// register as forward gaps until the flow re-passes its previous
    /// high-water mark.
    pub fn observe(&mut self, port: u16, flow_sn: u64) -> FlowUpdate {
        let interval = match self.flows.entry(port) {
            Entry::Vacant(slot) => {
                slot.insert(FlowInterval { last_known_sn: flow_sn, ..FlowInterval::default() });
                return FlowUpdate::default();
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        let expected = interval.last_known_sn + 1;
        interval.last_known_sn = flow_sn;
        let discontinuity = flow_sn as i64 - expected as i64;

        if discontinuity.unsigned_abs() > 2 {
            debug!(port, discontinuity, "detected continuity break");
            interval.seq_breaks += 1;
        }
        if discontinuity < -1 {
            interval.reverses += 1;
            debug!(port, reverses = interval.reverses, "sequence reversal");
            return FlowUpdate::default();
        }
        if discontinuity == -1 {
            interval.duplicates += 1;
            debug!(port, duplicates = interval.duplicates, "duplicate flow sequence number");
        }
        if discontinuity > 1 {
            interval.burst_count += 1;
            let gap = discontinuity as u64;
            if gap > interval.longest_burst {
                debug!(port, gap, "updating longest burst");
                interval.longest_burst = gap;
            }
            return FlowUpdate { burst_len: gap, burst_count: interval.burst_count };
        }
        FlowUpdate::default()
    }

    /// Snapshot of one port's counters; zero-valued if the port was never seen.
    /// Never inserts.
    pub fn interval(&self, port: u16) -> FlowInterval {
        self.flows.get(&port).copied().unwrap_or_default()
    }

    /// Log a one-line continuity summary for every observed port.
    pub fn report(&self) {
        for (port, iv) in &self.flows {
            info!(
                port,
                breaks = iv.seq_breaks,
                bursts = iv.burst_count,
                longest = iv.longest_burst,
                "flow continuity"
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
