use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::timeout;

use crate::config::MAX_FRAME_LEN;
use crate::error::NetError;
use crate::transport::{FrameReader, FrameWriter};

/// Backlog for the host's listening socket. Only one peer is ever accepted.
const LISTEN_BACKLOG: u32 = 1;

/// An established TCP stream that is about to be split into framed halves.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    max_frame_len: u32,
}

impl TcpTransport {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self::with_limit(stream, peer, MAX_FRAME_LEN)
    }

    pub fn with_limit(stream: TcpStream, peer: SocketAddr, max_frame_len: u32) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("could not set TCP_NODELAY for {}: {}", peer, e);
        }
        Self {
            stream,
            peer,
            max_frame_len,
        }
    }

    /// Open a listening socket with address reuse so a restarted host can
    /// rebind the well-known port immediately.
    pub fn bind(addr: SocketAddr) -> Result<TcpListener, NetError> {
        let bind = || -> io::Result<TcpListener> {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            socket.set_reuseaddr(true)?;
            socket.bind(addr)?;
            socket.listen(LISTEN_BACKLOG)
        };
        bind().map_err(|source| NetError::Bind { addr, source })
    }

    /// A single dial attempt bounded by `limit`.
    pub async fn connect(addr: SocketAddr, limit: Duration) -> Result<TcpStream, NetError> {
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(NetError::Dial { addr, source }),
            Err(_) => Err(NetError::Dial {
                addr,
                source: io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("timed out after {:?}", limit),
                ),
            }),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Split into independently owned framed halves so one task can block
    /// on receive while others send.
    pub fn split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        let (read, write) = self.stream.into_split();
        (
            FrameReader::with_limit(read, self.max_frame_len),
            FrameWriter::with_limit(write, self.max_frame_len),
        )
    }
}
