//! Connection lifecycle and the serialized request/reply cycle
//!
//! ```text
//! Unconnected -> Connecting -> Connected -> { Broken, Closed }
//!                    ^                           |
//!                    +------- connect() ---------+
//! ```
//!
//! Only `Connected` permits I/O. Any transport or framing failure moves the
//! connection to `Broken`, after which every call fails fast with
//! [`MotoError::ConnectionClosed`] until `connect()` succeeds again.

use crate::codec::{self, Frame, Header};
use crate::error::{FrameError, MotoError, Result};
use crate::messages::{Body, MsgType};
use crate::transport::{Interrupt, TcpTransport, Transport};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Broken,
    Closed,
}

/// A transport plus its lifecycle state. Not shared; wrap it in a lock.
pub(crate) struct Link<T> {
    name: &'static str,
    transport: T,
    state: ConnectionState,
}

impl<T: Transport> Link<T> {
    pub(crate) fn new(name: &'static str, transport: T) -> Self {
        Self {
            name,
            transport,
            state: ConnectionState::Unconnected,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        self.state = ConnectionState::Connecting;
        match self.transport.connect() {
            Ok(()) => {
                info!("{} connection established to {}", self.name, self.transport.peer());
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                warn!("{} connection to {} failed: {}", self.name, self.transport.peer(), e);
                self.state = ConnectionState::Broken;
                Err(e)
            }
        }
    }

    pub(crate) fn close(&mut self) {
        self.transport.close();
        if self.state != ConnectionState::Unconnected {
            self.state = ConnectionState::Closed;
        }
    }

    pub(crate) fn interrupter(&self) -> Option<Interrupt> {
        self.transport.interrupter()
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            state => Err(MotoError::ConnectionClosed(format!(
                "{} connection is {:?}",
                self.name, state
            ))),
        }
    }

    /// Marks the link broken for errors that desynchronise or kill the stream.
    fn fail(&mut self, err: MotoError) -> MotoError {
        if matches!(err, MotoError::Frame(_)) || err.is_connection_failure() {
            warn!("{} connection broken: {}", self.name, err);
            self.transport.close();
            self.state = ConnectionState::Broken;
        }
        err
    }

    pub(crate) fn write_frame(&mut self, header: &Header, body: &Body) -> Result<()> {
        self.ensure_connected()?;
        let bytes = codec::encode(header, body);
        // Ex bodies with more groups than the controller accepts still encode;
        // refuse them here instead of sending a frame the peer cannot parse.
        if let Err(e) = codec::decode_bytes(&bytes) {
            return Err(MotoError::InvalidArgument(format!(
                "refusing to send {:?} on {} connection: {}",
                header.msg_type, self.name, e
            )));
        }
        debug!("{} -> {:?} ({} bytes)", self.name, header.msg_type, bytes.len());
        match self.transport.send(&bytes) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub(crate) fn read_frame(&mut self) -> Result<Frame> {
        self.ensure_connected()?;
        match codec::read_frame(&mut self.transport) {
            Ok(frame) => {
                debug!("{} <- {:?} ({} bytes)", self.name, frame.header.msg_type, frame.prefix.length);
                Ok(frame)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

/// A request/reply connection shared between caller threads.
///
/// The protocol carries no request id, so a reply can only be matched to
/// its request by ordering. The lock is held across the whole write + read.
pub struct SimpleMessageConnection<T: Transport = TcpTransport> {
    link: Mutex<Link<T>>,
}

impl<T: Transport> SimpleMessageConnection<T> {
    pub fn new(name: &'static str, transport: T) -> Self {
        Self {
            link: Mutex::new(Link::new(name, transport)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Link<T>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self) -> Result<()> {
        self.lock().connect()
    }

    pub fn close(&self) {
        self.lock().close()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Sends a one-way message without waiting for anything back.
    pub fn send(&self, header: &Header, body: &Body) -> Result<()> {
        self.lock().write_frame(header, body)
    }

    /// Receives the next frame without sending anything.
    pub fn recv(&self) -> Result<Frame> {
        self.lock().read_frame()
    }

    /// Sends `body` as a service request and returns the reply frame.
    pub fn send_and_receive(&self, body: impl Into<Body>) -> Result<Frame> {
        self.send_and_receive_skipping(body, |_| false)
    }

    /// Like [`send_and_receive`](Self::send_and_receive), but discards
    /// incoming frames for which `skip` returns true until the reply shows
    /// up. For connections where the peer streams topics between replies.
    pub fn send_and_receive_skipping<F>(&self, body: impl Into<Body>, skip: F) -> Result<Frame>
    where
        F: Fn(&Frame) -> bool,
    {
        let body = body.into();
        let header = Header::request(body.msg_type());
        let mut link = self.lock();
        link.write_frame(&header, &body)?;
        loop {
            let frame = link.read_frame()?;
            if !skip(&frame) {
                return Ok(frame);
            }
            debug!("Skipping {:?} while awaiting reply", frame.header.msg_type);
        }
    }
}

/// Error for a reply whose body is not the expected variant.
pub(crate) fn unexpected(expected: MsgType, frame: &Frame) -> MotoError {
    MotoError::Frame(FrameError::UnexpectedMessage {
        expected,
        actual: frame.header.msg_type,
    })
}
