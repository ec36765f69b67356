#![forbid(unsafe_code)]

//! flowprobe UDP transport adapter.
//!
//! * One socket per flowlet port, bound with address reuse.
//! * Async receive loop per socket dispatches datagrams to a handler trait.
//! * Sender-side helper producing connected, TTL-tagged sockets.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use socket2::{Domain, Type};
use tokio::net::UdpSocket;
use tracing::{error, info};

/// Maximum datagram size accepted by the receive loops.
pub const MAX_DATAGRAM: usize = 1 << 14;

/// Trait for components that consume inbound datagrams.
///
/// Called from the receive loop of the port the datagram arrived on; the
/// implementation must stay cheap and must never block the loop on downstream
/// work.
#[async_trait]
pub trait DatagramHandler: Send + Sync + 'static {
    async fn handle_datagram(&self, port: u16, data: &[u8]);
}

/// One bound receive socket, shared behind an `Arc`.
#[derive(Clone)]
pub struct UdpPool {
    socket: Arc<UdpSocket>,
    port: u16,
}

impl UdpPool {
    /// Bind on 0.0.0.0:port with address reuse.
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        let socket = socket2::Socket::new(Domain::for_address(addr), Type::DGRAM, None)?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        let std_sock: std::net::UdpSocket = socket.into();
        std_sock.set_nonblocking(true)?;
        let udp = UdpSocket::from_std(std_sock)?;
        Ok(Self { socket: Arc::new(udp), port })
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Receive side of a flowlet group: one socket and one receive loop per
/// consecutive port starting at `base_port`.
pub struct FlowletListener {
    ports: Vec<u16>,
}

impl FlowletListener {
    /// Bind every flowlet port and spawn its receive loop. Fails if any bind
    /// fails, before any loop has started.
    pub async fn start<H: DatagramHandler>(
        base_port: u16,
        flowlets: u16,
        handler: Arc<H>,
    ) -> std::io::Result<Self> {
        if flowlets == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "at least one flowlet required",
            ));
        }
        let mut pools = Vec::with_capacity(flowlets as usize);
        for i in 0..flowlets {
            pools.push(UdpPool::bind(base_port + i).await?);
        }
        let ports: Vec<u16> = pools.iter().map(UdpPool::port).collect();

        for pool in pools {
            let sock = pool.socket();
            let port = pool.port();
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut buf = vec![0u8; MAX_DATAGRAM];
                loop {
                    match sock.recv_from(&mut buf).await {
                        Ok((len, _src)) => handler.handle_datagram(port, &buf[..len]).await,
                        Err(e) => error!(port, "udp recv error: {e}"),
                    }
                }
            });
        }

        info!(
            first = base_port,
            last = base_port + flowlets - 1,
            "flowprobe-transport listening"
        );
        Ok(Self { ports })
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }
}

/// Sender-side socket: connected to one flowlet destination with the probe
/// TTL applied at creation.
pub fn dial_flowlet(dst: SocketAddr, ttl: u32) -> std::io::Result<std::net::UdpSocket> {
    let socket = socket2::Socket::new(Domain::for_address(dst), Type::DGRAM, None)?;
    socket.set_ttl(ttl)?;
    socket.connect(&dst.into())?;
    Ok(socket.into())
}
