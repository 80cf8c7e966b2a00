// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte sinks and sources used by `dump` and `load`.
//!
//! The marshalling code only needs "write these bytes" and "fill this
//! buffer". Implementations:
//!
//! - `Vec<u8>`: growable in-memory sink
//! - [`SliceWriter`] / [`SliceReader`]: bounds-checked fixed buffers, no
//!   allocation, errors instead of panics
//! - [`IoSink`] / [`IoSource`]: any `std::io::Write` / `std::io::Read`

use crate::config::CONTAINER_COUNT_SIZE;
use crate::error::{Error, Result};
use std::io::{self, Read, Write};

/// Destination of dumped bytes.
pub trait OutputStream {
    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Bytes written so far.
    fn position(&self) -> usize;
}

/// Source of loaded bytes.
pub trait InputStream {
    /// Fill `data` entirely.
    fn read(&mut self, data: &mut [u8]) -> Result<()>;

    /// Bytes consumed so far.
    fn position(&self) -> usize;

    /// Bytes left, when the source knows.
    fn remaining_hint(&self) -> Option<usize> {
        None
    }
}

impl OutputStream for Vec<u8> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }

    fn position(&self) -> usize {
        self.len()
    }
}

impl<T: OutputStream + ?Sized> OutputStream for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn position(&self) -> usize {
        (**self).position()
    }
}

impl<T: InputStream + ?Sized> InputStream for &mut T {
    fn read(&mut self, data: &mut [u8]) -> Result<()> {
        (**self).read(data)
    }

    fn position(&self) -> usize {
        (**self).position()
    }

    fn remaining_hint(&self) -> Option<usize> {
        (**self).remaining_hint()
    }
}

/// Write a container element count.
pub(crate) fn write_count(sink: &mut dyn OutputStream, count: u64) -> Result<()> {
    sink.write(&count.to_ne_bytes())
}

/// Read a container element count.
pub(crate) fn read_count(source: &mut dyn InputStream) -> Result<u64> {
    let mut bytes = [0u8; CONTAINER_COUNT_SIZE];
    source.read(&mut bytes)?;
    Ok(u64::from_ne_bytes(bytes))
}

/// Generate common cursor methods (offset, remaining)
macro_rules! impl_cursor_common {
    () => {
        pub fn offset(&self) -> usize {
            self.offset
        }

        pub fn remaining(&self) -> usize {
            self.buffer.len().saturating_sub(self.offset)
        }

        pub fn is_eof(&self) -> bool {
            self.offset >= self.buffer.len()
        }
    };
}

/// Fixed-size sink (bounds-checked, zero-copy)
pub struct SliceWriter<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_cursor_common!();

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.offset]
    }
}

impl OutputStream for SliceWriter<'_> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.remaining() {
            return Err(Error::BufferFull {
                offset: self.offset,
                needed: data.len(),
                available: self.remaining(),
            });
        }
        self.buffer[self.offset..self.offset + data.len()].copy_from_slice(data);
        self.offset += data.len();
        Ok(())
    }

    fn position(&self) -> usize {
        self.offset
    }
}

/// Fixed-size source (bounds-checked, zero-copy)
pub struct SliceReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_cursor_common!();
}

impl InputStream for SliceReader<'_> {
    fn read(&mut self, data: &mut [u8]) -> Result<()> {
        if data.len() > self.remaining() {
            return Err(Error::DataTruncated {
                offset: self.offset,
                needed: data.len(),
                available: self.remaining(),
            });
        }
        data.copy_from_slice(&self.buffer[self.offset..self.offset + data.len()]);
        self.offset += data.len();
        Ok(())
    }

    fn position(&self) -> usize {
        self.offset
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.remaining())
    }
}

/// Sink over any [`Write`] (files, sockets).
#[derive(Debug)]
pub struct IoSink<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Flush and return the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> OutputStream for IoSink<W> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.written += data.len();
        Ok(())
    }

    fn position(&self) -> usize {
        self.written
    }
}

/// Source over any [`Read`]. Running out of data is `DataTruncated`.
#[derive(Debug)]
pub struct IoSource<R: Read> {
    inner: R,
    consumed: usize,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> InputStream for IoSource<R> {
    fn read(&mut self, data: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(data) {
            Ok(()) => {
                self.consumed += data.len();
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Err(Error::DataTruncated {
                offset: self.consumed,
                needed: data.len(),
                available: 0,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn position(&self) -> usize {
        self.consumed
    }
}
