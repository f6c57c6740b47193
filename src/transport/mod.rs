//! Byte-pipe transports
//!
//! A transport knows nothing about framing. It moves bytes and guarantees
//! full-buffer semantics through [`Transport::send`] and
//! [`Transport::recv_exact`].

use crate::error::{MotoError, Result};

pub mod mock;
mod tcp;

pub use tcp::TcpTransport;

/// Closes a transport from another thread, unblocking a pending read.
pub type Interrupt = Box<dyn Fn() + Send + Sync>;

pub trait Transport: Send {
    /// Opens (or reopens) the underlying socket.
    fn connect(&mut self) -> Result<()>;

    /// Reads at least one byte, or returns `Ok(0)` when the peer closed.
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Writes some prefix of `buf` and returns its length.
    fn write_some(&mut self, buf: &[u8]) -> Result<usize>;

    fn close(&mut self);

    /// Human-readable peer name for logs and errors.
    fn peer(&self) -> String;

    fn interrupter(&self) -> Option<Interrupt> {
        None
    }

    /// Writes the whole buffer, retrying partial writes.
    fn send(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < buf.len() {
            match self.write_some(&buf[written..])? {
                0 => {
                    return Err(MotoError::ConnectionClosed(format!(
                        "{} stopped accepting data after {} of {} bytes",
                        self.peer(),
                        written,
                        buf.len()
                    )))
                }
                n => written += n,
            }
        }
        Ok(())
    }

    /// Fills the whole buffer, looping over partial reads.
    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read_some(&mut buf[filled..])? {
                0 => {
                    return Err(MotoError::ConnectionClosed(format!(
                        "{} closed the connection after {} of {} bytes",
                        self.peer(),
                        filled,
                        buf.len()
                    )))
                }
                n => filled += n,
            }
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_some(buf)
    }

    fn write_some(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write_some(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn peer(&self) -> String {
        (**self).peer()
    }

    fn interrupter(&self) -> Option<Interrupt> {
        (**self).interrupter()
    }
}
