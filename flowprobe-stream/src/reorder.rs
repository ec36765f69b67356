//! Bounded circular arrival window.
//!
//! The window never delivers payloads anywhere; it exists to tell drops from
//! late arrivals and duplicates on a high-rate datagram stream, and to measure
//! the length of contiguous loss bursts once the stream is reassembled.
//!
//! Each slot holds a small arrival counter for one stream sequence number.
//! New sequence numbers beyond the window's high end force a spill: the tail
//! walks forward, and every slot it evicts is settled for good. An unmarked
//! slot is a confirmed drop; a counter above one is that many duplicates.

#![forbid(unsafe_code)]

use tracing::{debug, info};

use crate::continuity::{ContinuityTracker, FlowInterval};

/// Burst lengths ended by one arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstReport {
    /// Length of the contiguous stream-sn drop run this arrival closed, 0 if none.
    pub stream_burst_len: u64,
    /// Forward gap on the arrival's own flow, 0 if none.
    pub flow_burst_len: u64,
    /// The flow's cumulative gap count, reported only alongside a non-zero `flow_burst_len`.
    pub flow_burst_count: u64,
}

/// Circular arrival window over stream sequence numbers.
///
/// Sequence number 0 is the empty sentinel: `tail_sn == 0` means nothing has
/// ever been admitted, and a well-formed sender never emits 0.
pub struct ReorderBuffer {
    slots: Vec<u8>,
    len: usize,
    /// Index of the oldest slot in the live span.
    tail_idx: usize,
    /// Index of the newest marked slot.
    head_idx: usize,
    /// Sequence number represented by `tail_idx`; 0 iff the window is empty.
    tail_sn: u64,
    /// Highest sequence number of a marked slot ever removed by spill.
    last_spilled_good_sn: u64,
    drops: u64,
    dups: u64,
    smallest_received_sn: u64,
    largest_received_sn: u64,
    continuity: ContinuityTracker,
}

impl ReorderBuffer {
    /// Create a window of `len` slots.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "window length must be non-zero");
        Self {
            slots: vec![0; len],
            len,
            tail_idx: 0,
            head_idx: 0,
            tail_sn: 0,
            last_spilled_good_sn: 0,
            drops: 0,
            dups: 0,
            smallest_received_sn: 0,
            largest_received_sn: 0,
            continuity: ContinuityTracker::new(),
        }
    }

    /// Admit one received packet.
    ///
    /// The arrival is first recorded against its flow's continuity state, then
    /// classified against the window: a stale sequence number is ignored, an
    /// in-window one marks its slot, and one beyond the high end spills the
    /// oldest window contents to make room. The report carries the length of
    /// any stream burst the arrival closed plus the flow-level gap, if any.
    pub fn add_packet(&mut self, stream_sn: u64, flow_sn: u64, port: u16) -> BurstReport {
        if stream_sn == 0 {
            // Reserved as the empty sentinel; never legitimately on the wire.
            debug!(port, "ignoring stream sequence number 0");
            return BurstReport::default();
        }
        if stream_sn > self.largest_received_sn {
            self.largest_received_sn = stream_sn;
        }
        if self.smallest_received_sn == 0 || stream_sn < self.smallest_received_sn {
            self.smallest_received_sn = stream_sn;
        }

        let flow = self.continuity.observe(port, flow_sn);
        let mut report = BurstReport {
            stream_burst_len: 0,
            flow_burst_len: flow.burst_len,
            flow_burst_count: flow.burst_count,
        };

        // First sample into an empty window anchors the tail.
        if self.tail_sn == 0 {
            self.tail_sn = stream_sn;
            self.head_idx = self.tail_idx;
            self.slots[self.tail_idx] = 1;
            return report;
        }

        let lsn = self.lowest_possible_sn();
        if stream_sn < lsn {
            info!(stream_sn, lowest_possible_sn = lsn, "ignoring stale packet");
            return report;
        }
        if stream_sn <= self.highest_possible_sn() {
            self.mark(stream_sn);
            return report;
        }
        report.stream_burst_len = self.spill(stream_sn);
        report
    }

    /// Confirmed drops so far. Monotonic.
    pub fn drops(&self) -> u64 {
        self.drops
    }

    /// Duplicate deliveries settled so far. Monotonic.
    pub fn duplicates(&self) -> u64 {
        self.dups
    }

    /// Span of the stream observed so far, in packets, including everything
    /// that was lost inside it. 0 before the first arrival.
    pub fn stream_length_in_packets(&self) -> u64 {
        if self.largest_received_sn == 0 {
            return 0;
        }
        1 + self.largest_received_sn - self.smallest_received_sn
    }

    /// Snapshot of one port's continuity counters; zero-valued for an unknown port.
    pub fn flow_interval(&self, port: u16) -> FlowInterval {
        self.continuity.interval(port)
    }

    /// Log a continuity summary for every observed port.
    pub fn report_bursts(&self) {
        if self.continuity.is_empty() {
            return;
        }
        self.continuity.report();
    }

    /// Sequence number currently represented by slot `idx`, or 0 when the slot
    /// lies outside the live span.
    pub fn slot_sn(&self, idx: usize) -> u64 {
        assert!(idx < self.len);
        if self.tail_sn == 0 {
            return 0;
        }
        let offset = (idx + self.len - self.tail_idx) % self.len;
        if offset >= self.occupancy() {
            return 0;
        }
        self.tail_sn + offset as u64
    }

    /// Log the window bookkeeping and every live slot.
    pub fn dump(&self) {
        debug!(
            tail_idx = self.tail_idx,
            tail_sn = self.tail_sn,
            head_idx = self.head_idx,
            occupancy = self.occupancy(),
            drops = self.drops,
            "window state"
        );
        for idx in 0..self.len {
            debug!(idx, sn = self.slot_sn(idx), count = self.slots[idx], "slot");
        }
    }

    /// Number of slots in the live span, tail through head inclusive.
    fn occupancy(&self) -> usize {
        if self.tail_sn == 0 {
            return 0;
        }
        (self.head_idx + self.len - self.tail_idx) % self.len + 1
    }

    /// Oldest admissible sequence number. Arrivals below it are stale; the
    /// floor sits below the tail whenever free slots remain, leaving room for
    /// out-of-order stragglers.
    fn lowest_possible_sn(&self) -> u64 {
        let free = (self.len - self.occupancy()) as u64;
        self.tail_sn.saturating_sub(free)
    }

    /// Highest representable sequence number.
    fn highest_possible_sn(&self) -> u64 {
        self.tail_sn + self.len as u64 - 1
    }

    /// Slot index for an admissible sequence number, circular in both
    /// directions around the tail.
    fn idx_for(&self, sn: u64) -> usize {
        if sn >= self.tail_sn {
            (self.tail_idx + (sn - self.tail_sn) as usize % self.len) % self.len
        } else {
            let back = (self.tail_sn - sn) as usize % self.len;
            (self.tail_idx + self.len - back) % self.len
        }
    }

    /// Count one arrival into its slot; advance the head when the arrival is
    /// the newest sequence seen by the window.
    fn mark(&mut self, sn: u64) {
        let newest_sn = self.tail_sn + self.occupancy() as u64 - 1;
        let idx = self.idx_for(sn);
        self.slots[idx] = self.slots[idx].saturating_add(1);
        if sn > newest_sn {
            self.head_idx = idx;
        }
    }

    /// Advance the tail far enough that `sn` becomes representable, settling
    /// every slot that leaves the window. Returns the length of the stream
    /// burst the arrival closed, if any.
    fn spill(&mut self, sn: u64) -> u64 {
        let hsn = self.highest_possible_sn();
        debug_assert!(sn > hsn);
        let len = self.len as u64;

        let mut patchup_burst = 0u64;
        let mut distance = sn - hsn;
        if distance >= len {
            // The arrival skips the entire window: everything between the old
            // high end and the arrival provably never passed through here.
            patchup_burst = distance - 1;
            self.drops += patchup_burst;
            distance = len;
        }

        let mut largest_burst = 0u64;
        let mut current_burst = 0u64;
        for _ in 0..distance {
            let counter = self.slots[self.tail_idx];
            self.slots[self.tail_idx] = 0;
            if counter == 0 {
                self.drops += 1;
                // An isolated empty slot right after a marked one is jitter,
                // not a burst.
                if self.tail_sn > self.last_spilled_good_sn + 2 {
                    current_burst += 1;
                }
            } else {
                self.dups += u64::from(counter - 1);
                self.last_spilled_good_sn = self.tail_sn;
                largest_burst = largest_burst.max(current_burst);
                current_burst = 0;
            }
            self.tail_idx = (self.tail_idx + 1) % self.len;
            self.tail_sn += 1;
        }

        if patchup_burst != 0 {
            // Re-anchor the wiped window on the arrival.
            self.tail_sn = sn;
            self.head_idx = self.tail_idx;
            self.slots[self.tail_idx] = 1;
        } else {
            // The arrival is the newest sequence by construction. The head is
            // placed directly: when the walk drained the whole span the old
            // head index is stale and must not feed the occupancy.
            let idx = self.idx_for(sn);
            self.slots[idx] = self.slots[idx].saturating_add(1);
            self.head_idx = idx;
        }

        if current_burst != 0 {
            largest_burst = largest_burst.max(current_burst + patchup_burst);
        } else {
            largest_burst = largest_burst.max(patchup_burst);
        }
        largest_burst
    }
}
