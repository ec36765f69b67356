//! Datagram preamble: the fixed 32-byte prefix every probe packet carries.

#![forbid(unsafe_code)]

use nom::number::complete::le_u64;
use nom::IResult;
use thiserror::Error;

/// Sentinel value opening every probe datagram.
pub const MARKER: u64 = 0x0000_0000_1234_5678;

/// Bytes occupied by the preamble; payload beyond it is not inspected.
pub const PREAMBLE_LEN: usize = 32;

/// Parsed preamble fields. The sender timestamp is informational; the two
/// clocks are never synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    pub stream_sn: u64,
    pub flow_sn: u64,
    pub sender_time_ns: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreambleError {
    #[error("datagram too short for preamble: {0} bytes")]
    Truncated(usize),

    #[error("unexpected marker value {0:#x}")]
    BadMarker(u64),
}

fn fields(input: &[u8]) -> IResult<&[u8], (u64, u64, u64, u64)> {
    let (input, marker) = le_u64(input)?;
    let (input, stream_sn) = le_u64(input)?;
    let (input, flow_sn) = le_u64(input)?;
    let (input, sender_time_ns) = le_u64(input)?;
    Ok((input, (marker, stream_sn, flow_sn, sender_time_ns)))
}

/// Parse the preamble off the front of a datagram. Trailing payload bytes are
/// ignored.
pub fn parse_preamble(input: &[u8]) -> Result<Preamble, PreambleError> {
    let (_, (marker, stream_sn, flow_sn, sender_time_ns)) =
        fields(input).map_err(|_| PreambleError::Truncated(input.len()))?;
    if marker != MARKER {
        return Err(PreambleError::BadMarker(marker));
    }
    Ok(Preamble { stream_sn, flow_sn, sender_time_ns })
}

/// Write the preamble into the first [`PREAMBLE_LEN`] bytes of `buf`.
///
/// Panics if `buf` is shorter than the preamble; the sender validates its
/// payload length up front.
pub fn write_preamble(buf: &mut [u8], preamble: Preamble) {
    assert!(buf.len() >= PREAMBLE_LEN, "payload shorter than preamble");
    buf[0..8].copy_from_slice(&MARKER.to_le_bytes());
    buf[8..16].copy_from_slice(&preamble.stream_sn.to_le_bytes());
    buf[16..24].copy_from_slice(&preamble.flow_sn.to_le_bytes());
    buf[24..32].copy_from_slice(&preamble.sender_time_ns.to_le_bytes());
}

/// Build a standalone preamble block.
pub fn build_preamble(preamble: Preamble) -> [u8; PREAMBLE_LEN] {
    let mut buf = [0u8; PREAMBLE_LEN];
    write_preamble(&mut buf, preamble);
    buf
}
