//! Periodic collectors.
//!
//! Two independent ticks: the drops tick snapshots cumulative stream totals,
//! the flows tick snapshots per-port continuity state. Both run on the
//! reactor; per-arrival burst events bypass them entirely.

#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use tracing::info;

use flowprobe_core::wall_clock_ns;
use flowprobe_stream::ReorderBuffer;

use crate::records::{DropsRecord, FlowStatsRecord, Record, RecordSink};

/// Tick cadence.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub drops_period: Duration,
    pub flows_period: Duration,
    /// Offset of the first flows tick relative to the first drops tick.
    pub flows_offset: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            drops_period: Duration::from_secs(10),
            flows_period: Duration::from_secs(10),
            flows_offset: Duration::from_secs(5),
        }
    }
}

/// Receive totals summed across every flowlet port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeTotals {
    pub packets: u64,
    pub bytes: u64,
}

/// Instantaneous bit-rate from byte-count deltas.
#[derive(Debug, Default)]
pub struct RateMeter {
    last: Option<(u64, Instant)>,
}

impl RateMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gigabits per second since the previous sample. Reports 0 until a
    /// previous sample has actually seen traffic.
    pub fn sample(&mut self, bytes_now: u64, now: Instant) -> f64 {
        let rate = match self.last {
            Some((last_bytes, last_at)) if last_bytes != 0 => {
                let diff_bits = (bytes_now.saturating_sub(last_bytes) * 8) as f64;
                let diff_ns = now.duration_since(last_at).as_nanos() as f64;
                if diff_ns > 0.0 {
                    diff_bits / diff_ns
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        self.last = Some((bytes_now, now));
        rate
    }
}

/// Builds tick records from the reactor-owned state and hands them to the sink.
#[derive(Debug, Default)]
pub struct Sampler {
    rate: RateMeter,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops tick body: one cumulative `drops` row plus a burst summary in the
    /// log.
    pub fn drops_tick<S: RecordSink>(
        &mut self,
        buffer: &ReorderBuffer,
        totals: IntakeTotals,
        sink: &S,
    ) {
        let media_rate = self.rate.sample(totals.bytes, Instant::now());
        info!(
            packets = totals.packets,
            dropped = buffer.drops(),
            media_rate_gbit = media_rate,
            "total received"
        );
        sink.submit(Record::Drops(DropsRecord {
            timestamp: wall_clock_ns(),
            packets_dropped: buffer.drops(),
            packets_total: totals.packets,
            duplicates: buffer.duplicates(),
            media_rate,
        }));
        buffer.report_bursts();
    }

    /// Flows tick body: one `flows` row per configured port that has ever been
    /// observed.
    pub fn flows_tick<S: RecordSink>(&self, buffer: &ReorderBuffer, ports: &[u16], sink: &S) {
        for &port in ports {
            let iv = buffer.flow_interval(port);
            if iv.last_known_sn == 0 {
                continue;
            }
            sink.submit(Record::Flows(FlowStatsRecord {
                timestamp: wall_clock_ns(),
                port,
                burst_count: iv.burst_count,
                reverses: iv.reverses,
                duplicates: iv.duplicates,
                longest_burst: iv.longest_burst,
                sequence_breaks: iv.seq_breaks,
            }));
        }
    }
}
