use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportKind};

/// UDP socket transport.
///
/// The socket is bound to a local port (ephemeral when zero) and sends every
/// message to a single fixed remote endpoint. It never binds to the port it
/// sends to. Datagrams are accepted from any sender.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
    closed: AtomicBool,
}

impl UdpTransport {
    /// Resolve `address:remote_port` and bind the local socket to `local_port`.
    pub fn bind(address: &str, remote_port: u16, local_port: u16) -> Result<Self> {
        let remote = resolve(address, remote_port)?;
        let local = SocketAddr::new(unspecified_for(&remote), local_port);

        let socket = UdpSocket::bind(local).map_err(|e| TransportError::Bind {
            addr: local,
            source: e,
        })?;

        info!(%local, %remote, "bound udp socket");

        Ok(Self {
            socket,
            remote,
            closed: AtomicBool::new(false),
        })
    }

    /// Remote endpoint every message is sent to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::new(ErrorKind::NotConnected, "udp transport closed"));
        }
        Ok(())
    }
}

impl Transport for UdpTransport {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let (read, from) = self.socket.recv_from(buf)?;
        debug!(%from, size = read, "received datagram");
        Ok(read)
    }

    fn send(&self, payload: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        let sent = self.socket.send_to(payload, self.remote)?;
        if sent != payload.len() {
            return Err(io::Error::new(
                ErrorKind::WriteZero,
                format!("datagram truncated ({sent} of {} bytes)", payload.len()),
            ));
        }
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(remote = %self.remote, "closing udp socket");
        }
    }

    fn set_poll_interval(&self, interval: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(interval).map_err(Into::into)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Datagram
    }
}

/// Resolve a host name or literal address, preferring IPv4 results.
pub(crate) fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    let resolve_err = |source| TransportError::Resolve {
        address: format!("{address}:{port}"),
        source,
    };
    let addrs: Vec<SocketAddr> = (address, port)
        .to_socket_addrs()
        .map_err(resolve_err)?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            resolve_err(io::Error::new(
                ErrorKind::AddrNotAvailable,
                "no addresses found",
            ))
        })
}

fn unspecified_for(remote: &SocketAddr) -> IpAddr {
    match remote {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::is_poll_tick;

    #[test]
    fn test_bind_ephemeral_and_exchange() {
        let receiver = UdpTransport::bind("127.0.0.1", 9, 0).unwrap();
        let port = receiver.local_addr().unwrap().port();
        assert_ne!(port, 0);

        let sender = UdpTransport::bind("127.0.0.1", port, 0).unwrap();
        sender.send(b"Start").unwrap();

        let mut buf = [0u8; 64];
        receiver
            .set_poll_interval(Some(Duration::from_secs(2)))
            .unwrap();
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"Start");
    }

    #[test]
    fn test_bind_conflict_reports_bind_error() {
        let first = UdpTransport::bind("127.0.0.1", 9, 0).unwrap();
        let port = first.local_addr().unwrap().port();

        let result = UdpTransport::bind("127.0.0.1", 9, port);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        let result = UdpTransport::bind("not a host name!", 9, 0);
        assert!(matches!(result, Err(TransportError::Resolve { .. })));
    }

    #[test]
    fn test_poll_interval_produces_tick() {
        let transport = UdpTransport::bind("127.0.0.1", 9, 0).unwrap();
        transport
            .set_poll_interval(Some(Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 16];
        let err = transport.recv(&mut buf).unwrap_err();
        assert!(is_poll_tick(&err));
    }

    #[test]
    fn test_closed_transport_rejects_io() {
        let transport = UdpTransport::bind("127.0.0.1", 9, 0).unwrap();
        transport.close();
        transport.close();

        let err = transport.send(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
        let mut buf = [0u8; 4];
        let err = transport.recv(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }
}
