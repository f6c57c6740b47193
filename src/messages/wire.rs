//! Little-endian field readers and writers shared by every message layout

use crate::error::FrameError;

/// Cursor over a body region whose total length was already validated.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], FrameError> {
        let end = self.pos + N;
        let bytes = self.buf.get(self.pos..end).ok_or(FrameError::Truncated {
            needed: end,
            available: self.buf.len(),
        })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn i32(&mut self) -> Result<i32, FrameError> {
        self.take::<4>().map(i32::from_le_bytes)
    }

    pub fn f32(&mut self) -> Result<f32, FrameError> {
        self.take::<4>().map(f32::from_le_bytes)
    }

    pub fn f32_array<const N: usize>(&mut self) -> Result<[f32; N], FrameError> {
        let mut out = [0.0f32; N];
        for value in out.iter_mut() {
            *value = self.f32()?;
        }
        Ok(out)
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Growable little-endian output buffer.
#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn f32_slice(&mut self, values: &[f32]) {
        for &value in values {
            self.f32(value);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_reports_truncation() {
        let mut reader = WireReader::new(&[1, 0, 0, 0, 2, 0]);
        assert_eq!(reader.i32().unwrap(), 1);
        assert_eq!(reader.remaining(), 2);
        assert_eq!(
            reader.i32().unwrap_err(),
            FrameError::Truncated { needed: 8, available: 6 }
        );
    }

    #[test]
    fn test_writer_is_little_endian() {
        let mut writer = WireWriter::new();
        writer.i32(-1);
        writer.f32(1.0);
        assert_eq!(
            writer.into_inner(),
            vec![0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x80, 0x3f]
        );
    }
}
