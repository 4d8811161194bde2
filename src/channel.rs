//! The datagram channel collaborator: connectionless send and
//! blocking-with-timeout receive, plus the ability to pin a reply
//! address to whoever sent the most recent datagram.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

/// Minimum interface the core transport needs from a datagram socket.
/// Modeled as a trait so the sender/receiver state machines can be
/// driven over an in-memory fake in tests.
pub trait DatagramChannel {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Returns `Ok(None)` on timeout, `Ok(Some(n))` with the datagram
    /// written into `buf[..n]` otherwise.
    fn recv_timeout(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    fn set_recv_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Directs subsequent `send` calls at the given address.
    fn set_peer(&mut self, addr: SocketAddr);

    /// Directs subsequent `send` calls at the source address of the
    /// most recently received datagram. No-op if nothing has been
    /// received yet.
    fn pin_peer_to_last_sender(&mut self);
}

pub struct UdpChannel {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    last_sender: Option<SocketAddr>,
}

impl UdpChannel {
    pub fn bind(local_port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", local_port))?;
        Ok(UdpChannel {
            socket,
            peer: None,
            last_sender: None,
        })
    }

    pub fn connect(local_port: u16, peer: impl ToSocketAddrs) -> io::Result<Self> {
        let mut chan = Self::bind(local_port)?;
        let addr = peer
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address resolved"))?;
        chan.set_peer(addr);
        Ok(chan)
    }
}

impl DatagramChannel for UdpChannel {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let peer = self
            .peer
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no peer address set"))?;
        self.socket.send_to(bytes, peer)?;
        Ok(())
    }

    fn recv_timeout(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv_from(buf) {
            Ok((n, from)) => {
                self.last_sender = Some(from);
                Ok(Some(n))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn set_recv_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.socket.set_read_timeout(Some(timeout))
    }

    fn set_peer(&mut self, addr: SocketAddr) {
        self.peer = Some(addr);
    }

    fn pin_peer_to_last_sender(&mut self) {
        if let Some(addr) = self.last_sender {
            self.peer = Some(addr);
        }
    }
}

