#![forbid(unsafe_code)]
//! flowprobe stream layer: arrival-window accounting and wire preamble.

mod continuity;
mod preamble;
mod reorder;
mod sequencer;

pub use continuity::{ContinuityTracker, FlowInterval, FlowUpdate};
pub use preamble::{
    build_preamble, parse_preamble, write_preamble, Preamble, PreambleError, MARKER, PREAMBLE_LEN,
};
pub use reorder::{BurstReport, ReorderBuffer};
pub use sequencer::{Emission, FlowletSequencer};
