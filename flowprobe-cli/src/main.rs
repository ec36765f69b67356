#![forbid(unsafe_code)]

//! flowprobe sender.
//!
//! Emits one preamble-tagged datagram per payload at a configured frame rate,
//! round-robin across the flowlet ports. Pacing is enforced per packet against
//! a deadline; the sender never reads anything back.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};

use flowprobe_core::wall_clock_ns;
use flowprobe_stream::{write_preamble, FlowletSequencer, Preamble, PREAMBLE_LEN};
use flowprobe_telemetry::RateMeter;
use flowprobe_transport::dial_flowlet;

/// TTL applied to probe sockets; distinctive in path captures.
const PROBE_TTL: u32 = 123;

/// Seconds between transmit-rate reports.
const REPORT_PERIOD: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(version, about = "Emits a sequenced probe stream across flowlet ports")]
struct Cli {
    /// Destination address:port
    #[arg(long, default_value = "127.0.0.1:5678")]
    dst: String,

    /// Number of flowlets on consecutive ports
    #[arg(long, default_value_t = 1)]
    flowlets: u16,

    /// Payload length in bytes (suggest 1400 on azure)
    #[arg(long, default_value_t = 8100)]
    plen: usize,

    /// Video format preset: 422, 444 or 4444
    #[arg(long, default_value = "422")]
    fmt: String,

    /// Bytes per frame (overrides --fmt)
    #[arg(long)]
    bpf: Option<u64>,

    /// Frame rate in Hz
    #[arg(long, default_value_t = 60.0)]
    rate: f32,
}

/// Split `host:port`, falling back to the default port when none was given.
fn split_destination(dst: &str) -> (String, u16) {
    match dst.rsplit_once(':') {
        Some((host, "")) => {
            info!("no port provided, using 5678");
            (host.to_string(), 5678)
        }
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => {
                info!("no usable port in destination, using 5678");
                (host.to_string(), 5678)
            }
        },
        None => {
            info!("no port provided, using 5678");
            (dst.to_string(), 5678)
        }
    }
}

fn bytes_per_frame(fmt: &str, bpf: Option<u64>) -> u64 {
    if let Some(bpf) = bpf {
        info!(bpf, "using explicit bytes-per-frame");
        return bpf;
    }
    match fmt {
        "444" => 12_441_600,
        "4444" => 16_588_800,
        // 4:2:2
        _ => 5_184_000,
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("looking up {host}:{port}"))?
        .next()
        .with_context(|| format!("no address for {host}:{port}"))
}

/// Prints transmit statistics every few seconds.
fn reporter(bytes_sent: Arc<AtomicU64>) {
    let mut meter = RateMeter::new();
    loop {
        thread::sleep(REPORT_PERIOD);
        let rate = meter.sample(bytes_sent.load(Ordering::Relaxed), Instant::now());
        info!(rate_gbit = rate, "transmit rate");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.flowlets == 0 {
        bail!("at least one flowlet required");
    }
    if cli.plen < PREAMBLE_LEN {
        bail!("payload length must be at least {PREAMBLE_LEN} bytes");
    }

    let (host, base_port) = split_destination(&cli.dst);
    let mut sockets = Vec::with_capacity(cli.flowlets as usize);
    for i in 0..cli.flowlets {
        let addr = resolve(&host, base_port + i)?;
        let socket = dial_flowlet(addr, PROBE_TTL)
            .with_context(|| format!("connecting flowlet {i} to {addr}"))?;
        sockets.push(socket);
    }

    let bpf = bytes_per_frame(&cli.fmt, cli.bpf);
    let packets_per_frame = (bpf / cli.plen as u64).max(1);
    let packet_period = Duration::from_nanos(
        (1_000_000_000.0 / (f64::from(cli.rate) * packets_per_frame as f64)) as u64,
    );
    info!(plen = cli.plen, "sending {packets_per_frame} packets per frame");

    let bytes_sent = Arc::new(AtomicU64::new(0));
    let reporter_bytes = Arc::clone(&bytes_sent);
    thread::spawn(move || reporter(reporter_bytes));
    thread::sleep(Duration::from_secs(1));
    info!(dst = %cli.dst, flowlets = cli.flowlets, "sending");

    let mut payload = vec![0u8; cli.plen];
    let mut sequencer = FlowletSequencer::new(cli.flowlets as usize);
    loop {
        let emission = sequencer.next();
        let deadline = Instant::now() + packet_period;
        write_preamble(
            &mut payload,
            Preamble {
                stream_sn: emission.stream_sn,
                flow_sn: emission.flow_sn,
                sender_time_ns: wall_clock_ns(),
            },
        );
        match sockets[emission.flowlet].send(&payload) {
            Ok(n) => {
                bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
            }
            Err(e) => error!(flowlet = emission.flowlet, "error writing to socket: {e}"),
        }
        // Per-packet deadline pacing.
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_without_port_gets_the_default() {
        assert_eq!(split_destination("10.0.0.1"), ("10.0.0.1".to_string(), 5678));
        assert_eq!(split_destination("10.0.0.1:"), ("10.0.0.1".to_string(), 5678));
    }

    #[test]
    fn destination_with_port_is_split() {
        assert_eq!(split_destination("probe.example:9000"), ("probe.example".to_string(), 9000));
    }

    #[test]
    fn format_presets_resolve() {
        assert_eq!(bytes_per_frame("422", None), 5_184_000);
        assert_eq!(bytes_per_frame("444", None), 12_441_600);
        assert_eq!(bytes_per_frame("4444", None), 16_588_800);
        assert_eq!(bytes_per_frame("422", Some(1000)), 1000);
    }
}
