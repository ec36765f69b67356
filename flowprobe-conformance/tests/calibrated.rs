//! Calibrated random loss on a single flow: after a flush, the window's drop
//! total must equal the exact number of packets withheld, and the continuity
//! counters must match the run structure of the loss mask.

use flowprobe_conformance::{drop_mask, summarize_mask};
use flowprobe_stream::ReorderBuffer;

fn calibrated(p: f64, total: usize, seed: u64) {
    let mut buf = ReorderBuffer::new(1024);
    let mask = drop_mask(total, p, seed);

    let mut sn = 10u64;
    buf.add_packet(sn, sn, 0);
    sn += 1;

    let mut withheld = 0u64;
    for &dropped in &mask {
        if dropped {
            withheld += 1;
        } else {
            buf.add_packet(sn, sn, 0);
        }
        sn += 1;
    }
    // Flush: one full window of in-order arrivals settles everything behind it.
    for _ in 0..1024 {
        buf.add_packet(sn, sn, 0);
        sn += 1;
    }

    assert_eq!(buf.drops(), withheld, "p = {p}");
    assert_eq!(buf.duplicates(), 0, "p = {p}");

    let summary = summarize_mask(&mask);
    assert_eq!(summary.dropped, withheld);
    let iv = buf.flow_interval(0);
    assert_eq!(iv.burst_count, summary.gaps, "p = {p}");
    assert_eq!(iv.seq_breaks, summary.breaks, "p = {p}");
    assert_eq!(iv.longest_burst, summary.longest, "p = {p}");
    assert_eq!(iv.reverses, 0);
}

#[test]
fn heavy_loss() {
    calibrated(0.45, 120_000, 0xC0FFEE);
}

#[test]
fn moderate_loss() {
    calibrated(0.10, 120_000, 0xBEEF);
}

#[test]
fn light_loss() {
    calibrated(0.01, 240_000, 0xFACADE);
}

#[test]
fn loss_free_mask_is_silent() {
    calibrated(0.0, 50_000, 1);
}
