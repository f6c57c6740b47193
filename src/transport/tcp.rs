//! TCP transport to a fixed `(host, port)`

use super::{Interrupt, Transport};
use crate::error::{MotoError, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Option<Duration>,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout: None,
            stream: None,
        }
    }

    /// Bounds connect, read and write calls. An expired read or write is
    /// reported as a closed connection.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open(&self) -> std::io::Result<TcpStream> {
        let stream = match self.timeout {
            None => TcpStream::connect((self.host.as_str(), self.port))?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(last_err.unwrap_or_else(|| {
                            std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
                        }))
                    }
                }
            }
        };
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        Ok(stream)
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        let addr = self.addr();
        self.stream
            .as_mut()
            .ok_or_else(|| MotoError::ConnectionClosed(format!("{} is not connected", addr)))
    }

    fn closed(&self, op: &str, e: std::io::Error) -> MotoError {
        match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                MotoError::ConnectionClosed(format!("{} timed out on {}", self.addr(), op))
            }
            _ => MotoError::ConnectionClosed(format!("{} failed on {}: {}", self.addr(), op, e)),
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        self.close();
        let stream = self.open().map_err(|source| MotoError::Connection {
            addr: self.addr(),
            source,
        })?;
        info!("Connected to {}", self.addr());
        self.stream = Some(stream);
        Ok(())
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let read = self.stream()?.read(buf);
            match read {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.closed("read", e)),
            }
        }
    }

    fn write_some(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            let written = self.stream()?.write(buf);
            match written {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.closed("write", e)),
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("Closing {}", self.addr());
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn peer(&self) -> String {
        self.addr()
    }

    fn interrupter(&self) -> Option<Interrupt> {
        let stream = self.stream.as_ref()?.try_clone().ok()?;
        Some(Box::new(move || {
            let _ = stream.shutdown(Shutdown::Both);
        }))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_unconnected_read_fails_fast() {
        let mut transport = TcpTransport::new("127.0.0.1", 1);
        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.recv_exact(&mut buf),
            Err(MotoError::ConnectionClosed(_))
        ));
    }

    #[test]
    fn test_connect_refused_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = TcpTransport::new("127.0.0.1", port);
        assert!(matches!(transport.connect(), Err(MotoError::Connection { .. })));
    }

    #[test]
    fn test_send_and_recv_exact_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 8];
            socket.read_exact(&mut buf).unwrap();
            socket.write_all(&buf[..3]).unwrap();
            socket.flush().unwrap();
            std::thread::sleep(Duration::from_millis(20));
            socket.write_all(&buf[3..]).unwrap();
        });

        let mut transport = TcpTransport::new("127.0.0.1", port).with_timeout(Some(Duration::from_secs(5)));
        transport.connect().unwrap();
        transport.send(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let mut echoed = [0u8; 8];
        transport.recv_exact(&mut echoed).unwrap();
        assert_eq!(echoed, [1, 2, 3, 4, 5, 6, 7, 8]);
        server.join().unwrap();
    }

    #[test]
    fn test_read_timeout_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_millis(300));
            drop(socket);
        });

        let mut transport = TcpTransport::new("127.0.0.1", port).with_timeout(Some(Duration::from_millis(50)));
        transport.connect().unwrap();
        let mut buf = [0u8; 4];
        let err = transport.recv_exact(&mut buf).unwrap_err();
        assert!(matches!(err, MotoError::ConnectionClosed(ref msg) if msg.contains("timed out")));
        server.join().unwrap();
    }
}
