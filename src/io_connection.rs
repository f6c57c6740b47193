//! I/O connection: synchronous bit and group reads/writes

use crate::codec::Frame;
use crate::connection::{unexpected, ConnectionState, SimpleMessageConnection};
use crate::error::Result;
use crate::messages::{
    Body, MotoIoCtrlReply, MotoReadIoBit, MotoReadIoBitReply, MotoReadIoGroup, MotoReadIoGroupReply, MotoWriteIoBit,
    MotoWriteIoBitReply, MotoWriteIoGroup, MotoWriteIoGroupReply, MsgType,
};
use crate::transport::{TcpTransport, Transport};
use tracing::warn;

pub const TCP_PORT_IO: u16 = 50242;

/// Outcome of an I/O request. A controller that cannot serve the request
/// answers with a generic I/O control reply instead of the typed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoOutcome<R> {
    Completed(R),
    Rejected(MotoIoCtrlReply),
}

impl<R> IoOutcome<R> {
    pub fn completed(self) -> Option<R> {
        match self {
            IoOutcome::Completed(reply) => Some(reply),
            IoOutcome::Rejected(_) => None,
        }
    }
}

pub struct IoConnection<T: Transport = TcpTransport> {
    conn: SimpleMessageConnection<T>,
}

impl IoConnection<TcpTransport> {
    pub fn new(host: &str) -> Self {
        Self::with_transport(TcpTransport::new(host, TCP_PORT_IO))
    }
}

impl<T: Transport> IoConnection<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            conn: SimpleMessageConnection::new("io", transport),
        }
    }

    pub fn start(&self) -> Result<()> {
        self.conn.start()
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn close(&self) {
        self.conn.close()
    }

    fn outcome<R>(frame: Frame, expected: MsgType, pick: fn(&Body) -> Option<R>) -> Result<IoOutcome<R>> {
        if let Body::IoCtrlReply(rejected) = &frame.body {
            warn!(
                "I/O request rejected: result {} subcode {}",
                rejected.result_code, rejected.subcode
            );
            return Ok(IoOutcome::Rejected(rejected.clone()));
        }
        match pick(&frame.body) {
            Some(reply) => Ok(IoOutcome::Completed(reply)),
            None => Err(unexpected(expected, &frame)),
        }
    }

    pub fn read_io_bit(&self, address: i32) -> Result<IoOutcome<MotoReadIoBitReply>> {
        let frame = self.conn.send_and_receive(MotoReadIoBit { address })?;
        Self::outcome(frame, MsgType::MotoReadIoBitReply, |body| match body {
            Body::ReadIoBitReply(reply) => Some(reply.clone()),
            _ => None,
        })
    }

    pub fn write_io_bit(&self, address: i32, value: i32) -> Result<IoOutcome<MotoWriteIoBitReply>> {
        let frame = self.conn.send_and_receive(MotoWriteIoBit { address, value })?;
        Self::outcome(frame, MsgType::MotoWriteIoBitReply, |body| match body {
            Body::WriteIoBitReply(reply) => Some(reply.clone()),
            _ => None,
        })
    }

    pub fn read_io_group(&self, address: i32) -> Result<IoOutcome<MotoReadIoGroupReply>> {
        let frame = self.conn.send_and_receive(MotoReadIoGroup { address })?;
        Self::outcome(frame, MsgType::MotoReadIoGroupReply, |body| match body {
            Body::ReadIoGroupReply(reply) => Some(reply.clone()),
            _ => None,
        })
    }

    pub fn write_io_group(&self, address: i32, value: i32) -> Result<IoOutcome<MotoWriteIoGroupReply>> {
        let frame = self.conn.send_and_receive(MotoWriteIoGroup { address, value })?;
        Self::outcome(frame, MsgType::MotoWriteIoGroupReply, |body| match body {
            Body::WriteIoGroupReply(reply) => Some(reply.clone()),
            _ => None,
        })
    }
}
