#![forbid(unsafe_code)]
//! flowprobe telemetry: record types, the append-only persistence sink and the
//! periodic sampler.

mod recorder;
mod records;
mod sampler;

pub use recorder::{Recorder, RecorderConfig};
pub use records::{
    BurstRecord, DropsRecord, FlowStatsRecord, MemorySink, Record, RecordSink, StreamBurstRecord,
    Table,
};
pub use sampler::{IntakeTotals, RateMeter, Sampler, SamplerConfig};
