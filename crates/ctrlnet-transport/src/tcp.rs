use std::io::{self, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportKind};
use crate::udp::resolve;

/// A connected TCP stream.
///
/// Receives return whatever bytes the OS has buffered, so callers must
/// re-assemble messages themselves. An orderly shutdown by the peer is
/// reported as `UnexpectedEof`.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    closed: AtomicBool,
}

impl TcpTransport {
    /// Connect to a listening peer (blocking).
    pub fn connect(address: &str, port: u16) -> Result<Self> {
        let addr = resolve(address, port)?;
        let stream =
            TcpStream::connect(addr).map_err(|e| TransportError::Connect { addr, source: e })?;
        debug!(%addr, "connected tcp stream");
        Self::from_stream(stream)
    }

    pub(crate) fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer,
            closed: AtomicBool::new(false),
        })
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for TcpTransport {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match (&self.stream).read(buf) {
                Ok(0) if !buf.is_empty() => {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "peer closed the connection",
                    ))
                }
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    fn send(&self, payload: &[u8]) -> io::Result<()> {
        let mut stream = &self.stream;
        stream.write_all(payload)?;
        stream.flush()
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(peer = %self.peer, "shutting down tcp stream");
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }

    fn set_poll_interval(&self, interval: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(interval).map_err(Into::into)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr().map_err(Into::into)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }
}

/// TCP listener handing out one [`TcpTransport`] per accepted client.
#[derive(Debug)]
pub struct TcpLineListener {
    listener: TcpListener,
    local: SocketAddr,
}

impl TcpLineListener {
    /// Bind and listen on all interfaces at `port` (ephemeral when zero).
    pub fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener =
            TcpListener::bind(addr).map_err(|e| TransportError::Bind { addr, source: e })?;
        let local = listener.local_addr()?;
        info!(%local, "listening on tcp socket");
        Ok(Self { listener, local })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<TcpTransport> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        TcpTransport::from_stream(stream)
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_connect_exchange() {
        let listener = TcpLineListener::bind(0).unwrap();
        let port = listener.local_addr().port();

        let handle = std::thread::spawn(move || {
            let client = TcpTransport::connect("127.0.0.1", port).unwrap();
            client.send(b"PWR?\r\n").unwrap();
            client
        });

        let server = listener.accept().unwrap();
        let _client = handle.join().unwrap();

        let mut received = Vec::new();
        let mut buf = [0u8; 16];
        while received.len() < 6 {
            let n = server.recv(&mut buf).unwrap();
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, b"PWR?\r\n");
    }

    #[test]
    fn test_peer_close_is_eof() {
        let listener = TcpLineListener::bind(0).unwrap();
        let port = listener.local_addr().port();

        let handle = std::thread::spawn(move || {
            let client = TcpTransport::connect("127.0.0.1", port).unwrap();
            client.close();
        });

        let server = listener.accept().unwrap();
        handle.join().unwrap();

        let mut buf = [0u8; 16];
        let err = server.recv(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpLineListener::bind(0).unwrap();
        let port = listener.local_addr().port();
        drop(listener);

        let result = TcpTransport::connect("127.0.0.1", port);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_bind_conflict_reports_bind_error() {
        let first = TcpLineListener::bind(0).unwrap();
        let result = TcpLineListener::bind(first.local_addr().port());
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }
}
