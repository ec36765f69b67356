//! Packet intake: the adapter between the receive loops and the reorder
//! window.
//!
//! Validation happens on the receive loop; everything stateful happens on the
//! reactor, which owns the window and the per-port counters exclusively.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use flowprobe_core::wall_clock_ns;
use flowprobe_stream::{parse_preamble, Preamble, ReorderBuffer};
use flowprobe_telemetry::{BurstRecord, IntakeTotals, Record, RecordSink, StreamBurstRecord};
use flowprobe_transport::DatagramHandler;

/// One validated arrival, as forwarded to the reactor.
#[derive(Debug, Clone, Copy)]
pub struct Arrival {
    pub port: u16,
    pub wire_len: usize,
    pub preamble: Preamble,
}

/// Receive-loop side: parses the preamble and forwards without ever blocking
/// the socket loop. Malformed datagrams are dropped here.
pub struct PreambleGate {
    tx: mpsc::Sender<Arrival>,
}

impl PreambleGate {
    pub fn new(tx: mpsc::Sender<Arrival>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl DatagramHandler for PreambleGate {
    async fn handle_datagram(&self, port: u16, data: &[u8]) {
        if data.is_empty() {
            error!(port, "got zero-length datagram");
            return;
        }
        match parse_preamble(data) {
            Ok(preamble) => {
                let arrival = Arrival { port, wire_len: data.len(), preamble };
                if self.tx.try_send(arrival).is_err() {
                    warn!(port, "arrival queue full, dropping datagram");
                }
            }
            Err(e) => error!(port, "rejecting datagram: {e}"),
        }
    }
}

/// Per-port receive counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortStats {
    pub packets: u64,
    pub bytes: u64,
    /// Arrivals whose stream sequence number did not follow the port's
    /// previous one by exactly the flowlet stride.
    pub discontinuities: u64,
    previous_sn: u64,
}

/// Reactor side: applies arrivals to the window one at a time and emits
/// per-arrival burst events.
pub struct Intake {
    buffer: ReorderBuffer,
    ports: Vec<u16>,
    stats: BTreeMap<u16, PortStats>,
}

impl Intake {
    pub fn new(window: usize, ports: Vec<u16>) -> Self {
        Self { buffer: ReorderBuffer::new(window), ports, stats: BTreeMap::new() }
    }

    /// Apply one arrival: counters, continuity, window, burst events.
    pub fn process<S: RecordSink>(&mut self, arrival: Arrival, sink: &S) {
        let stride = self.ports.len() as u64;
        let stats = self.stats.entry(arrival.port).or_default();
        stats.packets += 1;
        stats.bytes += arrival.wire_len as u64;
        if stats.previous_sn != 0 && arrival.preamble.stream_sn != stats.previous_sn + stride {
            stats.discontinuities += 1;
        }
        stats.previous_sn = arrival.preamble.stream_sn;
        let (packets_received, bytes_received) = (stats.packets, stats.bytes);

        let report = self.buffer.add_packet(
            arrival.preamble.stream_sn,
            arrival.preamble.flow_sn,
            arrival.port,
        );
        if report.flow_burst_len != 0 {
            sink.submit(Record::Bursts(BurstRecord {
                timestamp: wall_clock_ns(),
                port: arrival.port,
                packets_received,
                bytes_received,
                burst_errors: report.flow_burst_count,
                burst_length: report.flow_burst_len,
            }));
        }
        if report.stream_burst_len > 1 {
            sink.submit(Record::Sbursts(StreamBurstRecord {
                timestamp: wall_clock_ns(),
                burst_length: report.stream_burst_len,
            }));
        }
    }

    pub fn buffer(&self) -> &ReorderBuffer {
        &self.buffer
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Log a final per-port receive summary.
    pub fn report_ports(&self) {
        for (port, stats) in &self.stats {
            info!(
                port,
                packets = stats.packets,
                bytes = stats.bytes,
                discontinuities = stats.discontinuities,
                "port totals"
            );
        }
    }

    /// Receive totals summed across every port, for the drops tick.
    pub fn totals(&self) -> IntakeTotals {
        let mut totals = IntakeTotals::default();
        for stats in self.stats.values() {
            totals.packets += stats.packets;
            totals.bytes += stats.bytes;
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowprobe_stream::{build_preamble, PREAMBLE_LEN};
    use flowprobe_telemetry::MemorySink;

    fn arrival(port: u16, stream_sn: u64, flow_sn: u64) -> Arrival {
        Arrival {
            port,
            wire_len: 1400,
            preamble: Preamble { stream_sn, flow_sn, sender_time_ns: 0 },
        }
    }

    fn port_stats(intake: &Intake, port: u16) -> PortStats {
        intake.stats.get(&port).copied().unwrap_or_default()
    }

    #[test]
    fn counters_accumulate_per_port() {
        let mut intake = Intake::new(64, vec![5678, 5679]);
        let sink = MemorySink::new();
        intake.process(arrival(5678, 1, 1), &sink);
        intake.process(arrival(5679, 2, 1), &sink);
        intake.process(arrival(5678, 3, 2), &sink);

        assert_eq!(port_stats(&intake, 5678).packets, 2);
        assert_eq!(port_stats(&intake, 5678).bytes, 2800);
        assert_eq!(port_stats(&intake, 5679).packets, 1);
        assert_eq!(intake.totals(), IntakeTotals { packets: 3, bytes: 4200 });
        assert_eq!(port_stats(&intake, 5678).discontinuities, 0);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn flow_burst_emits_one_bursts_row() {
        let mut intake = Intake::new(64, vec![5678]);
        let sink = MemorySink::new();
        intake.process(arrival(5678, 1, 1), &sink);
        intake.process(arrival(5678, 2, 2), &sink);
        // Jump ahead by five on the flow.
        intake.process(arrival(5678, 8, 8), &sink);

        let records = sink.take();
        // One bursts row; the jump stayed inside the window, so no stream
        // burst accompanies it.
        assert_eq!(records.len(), 1);
        match &records[0] {
            Record::Bursts(r) => {
                assert_eq!(r.port, 5678);
                assert_eq!(r.burst_length, 5);
                assert_eq!(r.burst_errors, 1);
                assert_eq!(r.packets_received, 3);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn stream_burst_emits_one_sbursts_row() {
        let mut intake = Intake::new(8, vec![5678]);
        let sink = MemorySink::new();
        for sn in 1..=8 {
            intake.process(arrival(5678, sn, sn), &sink);
        }
        // Jump far past the window: patch-up spill ends a stream burst.
        intake.process(arrival(5678, 109, 109), &sink);

        let records = sink.take();
        assert_eq!(records.len(), 2);
        match &records[1] {
            Record::Sbursts(r) => assert_eq!(r.burst_length, 100),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn stream_stride_mismatch_counts_a_discontinuity() {
        let mut intake = Intake::new(64, vec![5678, 5679]);
        let sink = MemorySink::new();
        intake.process(arrival(5678, 1, 1), &sink);
        intake.process(arrival(5678, 3, 2), &sink);
        intake.process(arrival(5678, 6, 3), &sink);
        assert_eq!(port_stats(&intake, 5678).discontinuities, 1);
    }

    #[tokio::test]
    async fn gate_forwards_valid_and_drops_malformed() {
        let (tx, mut rx) = mpsc::channel(4);
        let gate = PreambleGate::new(tx);

        let mut datagram = vec![0u8; 64];
        datagram[..PREAMBLE_LEN].copy_from_slice(&build_preamble(Preamble {
            stream_sn: 9,
            flow_sn: 3,
            sender_time_ns: 0,
        }));
        gate.handle_datagram(7000, &datagram).await;
        gate.handle_datagram(7000, &[]).await;
        gate.handle_datagram(7000, &[0u8; 16]).await;
        gate.handle_datagram(7000, &[0xAAu8; 64]).await;

        let arrival = rx.try_recv().unwrap();
        assert_eq!(arrival.preamble.stream_sn, 9);
        assert_eq!(arrival.wire_len, 64);
        assert!(rx.try_recv().is_err());
    }
}
