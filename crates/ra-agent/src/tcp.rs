//! # Blocking TCP Client Transport
//!
//! One request in flight per connection. A reply that misses the read
//! timeout is still owed by the agent; the transport remembers it and
//! discards it before reading the next reply, so replies never shift onto
//! later requests.

use crate::framing::to_frame;
use parking_lot::Mutex;
use ra_04_proxy::{Transport, TransportError};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    /// Bytes of a reply cut off by a timeout. Kept raw since the cut may
    /// land inside a UTF-8 sequence.
    partial: Vec<u8>,
    /// Replies still owed for requests that timed out.
    abandoned: usize,
}

impl Connection {
    fn new(stream: TcpStream) -> io::Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            partial: Vec::new(),
            abandoned: 0,
        })
    }

    fn read_frame(&mut self) -> Result<String, TransportError> {
        match self.reader.read_until(b'\n', &mut self.partial) {
            Ok(_) if self.partial.ends_with(b"\n") => {
                let bytes = std::mem::take(&mut self.partial);
                let line = String::from_utf8(bytes)
                    .map_err(|e| TransportError::Io(format!("reply is not UTF-8: {e}")))?;
                Ok(line.trim_end().to_string())
            }
            Ok(_) => Err(TransportError::Closed),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(TransportError::Timeout)
            }
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }
}

pub struct TcpTransport {
    conn: Mutex<Connection>,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Connects to an agent. `timeout` bounds the wait for each reply.
    pub fn connect(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(timeout)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self {
            conn: Mutex::new(Connection::new(stream)?),
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for TcpTransport {
    fn send_and_receive(&self, request: &str) -> Result<String, TransportError> {
        let mut conn = self.conn.lock();
        conn.writer
            .write_all(to_frame(request).as_bytes())
            .map_err(|e| TransportError::Io(e.to_string()))?;

        while conn.abandoned > 0 {
            match conn.read_frame() {
                Ok(_) => {
                    conn.abandoned -= 1;
                    debug!(peer = %self.peer, "discarded late reply");
                }
                Err(TransportError::Timeout) => {
                    conn.abandoned += 1;
                    return Err(TransportError::Timeout);
                }
                Err(e) => return Err(e),
            }
        }

        match conn.read_frame() {
            Err(TransportError::Timeout) => {
                conn.abandoned += 1;
                Err(TransportError::Timeout)
            }
            other => other,
        }
    }
}
