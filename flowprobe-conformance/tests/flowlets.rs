//! Four flowlets, one of them losing a contiguous run of rounds: the damaged
//! port must report exactly one burst of the run length while the other ports
//! stay spotless.

use flowprobe_stream::{BurstReport, ReorderBuffer};

#[test]
fn one_damaged_flowlet_among_four() {
    let mut buf = ReorderBuffer::new(512);
    let mut sn = 1u64;
    let mut flow_sn = 1u64;

    for _ in 0..8000 {
        for port in 0..4u16 {
            let report = buf.add_packet(sn, flow_sn, port);
            assert_eq!(report, BurstReport::default(), "clean phase, sn {sn} port {port}");
            sn += 1;
        }
        flow_sn += 1;
    }
    assert_eq!(buf.drops(), 0);

    // 800 more rounds; port 0 loses rounds 101..=200.
    let mut burst_seen = false;
    for i in 0..800u64 {
        for port in 0..4u16 {
            let skipped = port == 0 && (101..=200).contains(&i);
            if !skipped {
                let report = buf.add_packet(sn, flow_sn, port);
                if report != BurstReport::default() {
                    // Only the recovery packet on port 0 may say anything.
                    assert_eq!(port, 0, "unexpected report on port {port}: {report:?}");
                    assert_eq!(report.flow_burst_len, 100);
                    assert_eq!(report.flow_burst_count, 1);
                    assert_eq!(report.stream_burst_len, 0);
                    burst_seen = true;
                }
            }
            sn += 1;
        }
        flow_sn += 1;
    }
    assert!(burst_seen, "the gap on port 0 was never reported");
    assert_eq!(buf.drops(), 100);

    let p0 = buf.flow_interval(0);
    assert_eq!(p0.burst_count, 1);
    assert_eq!(p0.longest_burst, 100);
    assert_eq!(p0.seq_breaks, 1);
    assert_eq!(p0.reverses, 0);
    assert_eq!(p0.duplicates, 0);

    for port in 1..4u16 {
        let iv = buf.flow_interval(port);
        assert_eq!(iv.burst_count, 0, "port {port}");
        assert_eq!(iv.longest_burst, 0, "port {port}");
        assert_eq!(iv.seq_breaks, 0, "port {port}");
        assert_eq!(iv.reverses, 0, "port {port}");
        assert_eq!(iv.duplicates, 0, "port {port}");
    }
}
