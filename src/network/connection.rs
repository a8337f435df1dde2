//! Connection
//!
//! Dials the switch and wraps the live TCP stream.

use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::config::Config;
use crate::error::{Result, SwitchError};
use crate::protocol::{write_frame, Frame, FrameReader};

/// A freshly dialed, configured TCP stream to the switch
pub struct Connection {
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Dial `config.addr`, trying each resolved address within the dial timeout
    pub fn dial(config: &Config) -> Result<Self> {
        let connect_err = |source: io::Error| SwitchError::Connect {
            addr: config.addr.clone(),
            source,
        };

        let addrs = config.addr.to_socket_addrs().map_err(connect_err)?;

        let mut last_err = None;
        for addr in addrs {
            tracing::trace!("Dialing {}", addr);
            match TcpStream::connect_timeout(&addr, config.dial_timeout()) {
                Ok(stream) => return Self::from_stream(stream, config),
                Err(e) => last_err = Some(e),
            }
        }

        Err(connect_err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        })))
    }

    /// Wrap an already connected stream
    ///
    /// Disables Nagle and installs the read deadline and write timeout.
    pub fn from_stream(stream: TcpStream, config: &Config) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.addr.clone());

        // Commands are single small frames; don't let them sit in the kernel
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.read_timeout()))?;
        stream.set_write_timeout(Some(config.write_timeout()))?;

        Ok(Self { stream, peer_addr })
    }

    /// Split into the read half (for the read loop) and the write half
    pub fn split(self) -> Result<(FrameReader<TcpStream>, ConnectionWriter)> {
        let read_stream = self.stream.try_clone()?;
        Ok((
            FrameReader::new(read_stream),
            ConnectionWriter {
                stream: self.stream,
                peer_addr: self.peer_addr,
            },
        ))
    }
}

/// Write half of a connection
pub struct ConnectionWriter {
    stream: TcpStream,
    peer_addr: String,
}

impl ConnectionWriter {
    /// Send one frame
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        tracing::debug!("Sending to {}: {}", self.peer_addr, frame);
        write_frame(&mut self.stream, frame)
    }

    /// Shut the socket down in both directions
    ///
    /// The read half sees EOF, which is how a write-side fault reaches the
    /// read loop.
    pub fn close(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                tracing::debug!("Error closing socket to {}: {}", self.peer_addr, e);
            }
        }
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
