//! Streaming body abstractions.
//!
//! Bodies flow through three shapes: a [`Source`] produces a finite byte
//! stream (serializer side), a [`Sink`] consumes one (parser side), and
//! a [`BodyFilter`] transforms bytes in flight (content and transfer
//! codings). All calls are synchronous and cooperative: they return
//! with partial progress or an error, never suspend.

use bytes::Bytes;

use crate::error::{Error, Kind, Result};

/// Result of a [`Source::read`] call.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceRead {
    /// Bytes written into the destination.
    pub bytes: usize,
    /// The source has produced its final byte.
    pub finished: bool,
}

/// Result of a [`BodyFilter::process`] call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Processed {
    /// Input bytes consumed.
    pub in_bytes: usize,
    /// Output bytes produced.
    pub out_bytes: usize,
    /// All pending output, including any trailing bytes required by the
    /// encoding, has been emitted.
    pub finished: bool,
}

/// A producer of a finite byte stream.
///
/// Sources are single-use: once `finished` has been reported the source
/// is spent. A read that makes no progress and is not finished simply
/// returns `bytes == 0`; the caller decides when to retry.
pub trait Source {
    /// Fill `dest` from the front.
    fn read(&mut self, dest: &mut [u8]) -> Result<SourceRead>;
}

/// A consumer of a finite byte stream.
///
/// `more` is false exactly once, with the final bytes (possibly empty).
/// A sink that cannot accept the whole input while `more` is true
/// returns short; repeatedly accepting nothing is the sink's failure to
/// arrange for progress and surfaces as an error from the driver.
pub trait Sink {
    /// Consume a prefix of `data`; returns the bytes taken.
    fn write(&mut self, data: &[u8], more: bool) -> Result<usize>;
}

/// A byte-in/byte-out transform.
pub trait BodyFilter {
    /// Consume a prefix of `input`, producing into `out`.
    ///
    /// `more` is false once no further input will ever arrive; the
    /// filter then drains its trailing bytes across as many calls as
    /// needed and reports `finished`.
    fn process(&mut self, out: &mut [u8], input: &[u8], more: bool) -> Result<Processed>;
}

/// A [`Source`] over a single in-memory buffer.
#[derive(Debug)]
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> BytesSource {
        BytesSource { data: data.into() }
    }
}

impl Source for BytesSource {
    fn read(&mut self, dest: &mut [u8]) -> Result<SourceRead> {
        let n = self.data.len().min(dest.len());
        dest[..n].copy_from_slice(&self.data[..n]);
        self.data = self.data.slice(n..);
        Ok(SourceRead {
            bytes: n,
            finished: self.data.is_empty(),
        })
    }
}

/// Drive a sink with full delivery, failing if it stalls.
///
/// Used by the parser to hand decoded body chunks to an attached sink:
/// partial writes are retried, but a sink that accepts nothing twice in
/// a row while data is pending is broken.
pub(crate) fn write_all(sink: &mut dyn Sink, mut data: &[u8], more: bool) -> Result<()> {
    let mut stalled = false;
    loop {
        let n = sink.write(data, more)?;
        if n >= data.len() {
            return Ok(());
        }
        data = &data[n..];
        if n == 0 {
            if stalled {
                return Err(Error::new(Kind::BufferOverflow));
            }
            stalled = true;
        } else {
            stalled = false;
        }
    }
}
