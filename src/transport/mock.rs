//! Scripted in-memory transport for tests
//!
//! Reads are served chunk by chunk exactly as queued, so tests control
//! where a frame is split. An optional responder produces a reply for every
//! complete frame written, and overlapping exchanges are counted.

use super::{Interrupt, Transport};
use crate::codec::PREFIX_SIZE;
use crate::error::{MotoError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    connected: bool,
    connects: usize,
    refuse_connect: bool,
    closed_by_peer: bool,
    reads: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    frames: Vec<Vec<u8>>,
    partial_frame: Vec<u8>,
    responder: Option<Responder>,
    max_write: Option<usize>,
    write_delay: Option<Duration>,
    overlaps: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues one chunk to be returned by a single read call (or several,
    /// if the reader asks for fewer bytes).
    pub fn push_read(&self, chunk: &[u8]) {
        self.lock().reads.push_back(chunk.to_vec());
    }

    /// Called with every complete frame written; returned chunks are queued
    /// for reading.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    /// Caps each write call, forcing callers through the partial-write path.
    pub fn limit_write(&self, max: usize, delay: Option<Duration>) {
        let mut inner = self.lock();
        inner.max_write = Some(max);
        inner.write_delay = delay;
    }

    pub fn refuse_connect(&self, refuse: bool) {
        self.lock().refuse_connect = refuse;
    }

    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Complete frames written so far, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().frames.clone()
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Number of frames that started while a previous reply was still unread.
    pub fn overlaps(&self) -> usize {
        self.lock().overlaps
    }
}

impl MockTransportInner {
    fn frame_complete(&self) -> Option<usize> {
        let raw = self.partial_frame.get(..PREFIX_SIZE)?;
        let len = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]).max(0) as usize;
        (self.partial_frame.len() >= PREFIX_SIZE + len).then_some(PREFIX_SIZE + len)
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.connects += 1;
        if inner.refuse_connect {
            return Err(MotoError::Connection {
                addr: "mock".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            });
        }
        inner.connected = true;
        inner.closed_by_peer = false;
        Ok(())
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock();
        if !inner.connected || inner.closed_by_peer {
            return Ok(0);
        }
        let Some(chunk) = inner.reads.front_mut() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            inner.reads.pop_front();
        }
        Ok(n)
    }

    fn write_some(&mut self, buf: &[u8]) -> Result<usize> {
        let delay = {
            let mut inner = self.lock();
            if !inner.connected {
                return Err(MotoError::ConnectionClosed("mock is not connected".to_string()));
            }
            if inner.partial_frame.is_empty() && !inner.reads.is_empty() && inner.responder.is_some() {
                inner.overlaps += 1;
            }
            let n = inner.max_write.map_or(buf.len(), |max| max.min(buf.len()));
            inner.written.extend_from_slice(&buf[..n]);
            inner.partial_frame.extend_from_slice(&buf[..n]);
            while let Some(len) = inner.frame_complete() {
                let frame: Vec<u8> = inner.partial_frame.drain(..len).collect();
                let replies = match inner.responder.as_mut() {
                    Some(responder) => responder(&frame),
                    None => Vec::new(),
                };
                inner.reads.extend(replies);
                inner.frames.push(frame);
            }
            (inner.write_delay, n)
        };
        if let Some(pause) = delay.0 {
            std::thread::sleep(pause);
        }
        Ok(delay.1)
    }

    fn close(&mut self) {
        self.lock().connected = false;
    }

    fn peer(&self) -> String {
        "mock".to_string()
    }

    fn interrupter(&self) -> Option<Interrupt> {
        let inner = Arc::clone(&self.inner);
        Some(Box::new(move || {
            inner.lock().unwrap_or_else(PoisonError::into_inner).closed_by_peer = true;
        }))
    }
}
