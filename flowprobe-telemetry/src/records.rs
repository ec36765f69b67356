//! Record types for the four persisted tables.
//!
//! The sink contract is table-oriented and append-only; nothing here assumes a
//! concrete storage engine. All timestamps are wall-clock nanoseconds.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// One cumulative drops sample, emitted by the drops tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropsRecord {
    pub timestamp: u64,
    pub packets_dropped: u64,
    pub packets_total: u64,
    pub duplicates: u64,
    /// Instantaneous receive rate in gigabits per second.
    pub media_rate: f64,
}

/// One flow-burst event, emitted when an arrival jumped ahead on its flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstRecord {
    pub timestamp: u64,
    pub port: u16,
    pub packets_received: u64,
    pub bytes_received: u64,
    /// The flow's cumulative gap count at the time of the event.
    pub burst_errors: u64,
    pub burst_length: u64,
}

/// One stream-burst event: a contiguous drop run on the reassembled stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamBurstRecord {
    pub timestamp: u64,
    pub burst_length: u64,
}

/// One per-port continuity sample, emitted by the flows tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStatsRecord {
    pub timestamp: u64,
    pub port: u16,
    pub burst_count: u64,
    pub reverses: u64,
    pub duplicates: u64,
    pub longest_burst: u64,
    pub sequence_breaks: u64,
}

/// The persisted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Drops,
    Bursts,
    Sbursts,
    Flows,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Drops, Table::Bursts, Table::Sbursts, Table::Flows];

    /// File stem the table's rows are appended to.
    pub fn file_name(self) -> &'static str {
        match self {
            Table::Drops => "drops.jsonl",
            Table::Bursts => "bursts.jsonl",
            Table::Sbursts => "sbursts.jsonl",
            Table::Flows => "flows.jsonl",
        }
    }
}

/// One row destined for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum Record {
    Drops(DropsRecord),
    Bursts(BurstRecord),
    Sbursts(StreamBurstRecord),
    Flows(FlowStatsRecord),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Drops(_) => Table::Drops,
            Record::Bursts(_) => Table::Bursts,
            Record::Sbursts(_) => Table::Sbursts,
            Record::Flows(_) => Table::Flows,
        }
    }
}

/// Anything that accepts records. Implementations must return quickly; the
/// caller is the packet-processing path.
pub trait RecordSink {
    fn submit(&self, record: Record);
}

/// Collects records in memory; the sink used by tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: std::cell::RefCell<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Record> {
        self.records.take()
    }
}

impl RecordSink for MemorySink {
    fn submit(&self, record: Record) {
        self.records.borrow_mut().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_rows_tag_their_table() {
        let r = Record::Sbursts(StreamBurstRecord { timestamp: 1, burst_length: 9 });
        assert_eq!(r.table(), Table::Sbursts);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"table\":\"sbursts\""));
        assert!(json.contains("\"burst_length\":9"));
    }

    #[test]
    fn rows_round_trip() {
        let r = Record::Flows(FlowStatsRecord {
            timestamp: 5,
            port: 5678,
            burst_count: 1,
            reverses: 2,
            duplicates: 3,
            longest_burst: 4,
            sequence_breaks: 5,
        });
        let back: Record = serde_json::from_str(&serde_json::to_string(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }
}
