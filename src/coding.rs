//! Deflate and gzip body filters.
//!
//! Thin [`BodyFilter`] adapters over the flate2 streaming codecs. The
//! parser installs an [`InflateFilter`] when transparent decoding is
//! enabled and the message's effective body encoding calls for it; the
//! serializer installs a [`DeflateFilter`] symmetrically. The HTTP
//! `deflate` coding is the zlib-wrapped stream.

use std::io::Write;

use flate2::write::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use crate::body::{BodyFilter, Processed};
use crate::error::{Error, Kind, Result};

// Input fed to the codec per step, so the transient decoded backlog
// stays proportional to the caller's output buffer.
const FEED_MAX: usize = 1024;

/// Workspace charge for an inflate stream (window plus state).
pub(crate) const INFLATE_RESERVE: usize = 48 * 1024;

/// Workspace charge for a deflate stream (windows, hash chains, state).
pub(crate) const DEFLATE_RESERVE: usize = 272 * 1024;

fn codec_err(e: std::io::Error) -> Error {
    Error::new(Kind::BadPayload).with(e)
}

fn drain_into(pending: &mut Vec<u8>, out: &mut [u8]) -> usize {
    let n = pending.len().min(out.len());
    out[..n].copy_from_slice(&pending[..n]);
    pending.drain(..n);
    n
}

/// Decoding filter: compressed bytes in, plain bytes out.
pub struct InflateFilter {
    codec: Inflate,
    done: bool,
}

enum Inflate {
    Zlib(ZlibDecoder<Vec<u8>>),
    Gzip(GzDecoder<Vec<u8>>),
}

impl InflateFilter {
    /// Decoder for the `deflate` coding (zlib wrapper).
    pub fn zlib() -> InflateFilter {
        InflateFilter {
            codec: Inflate::Zlib(ZlibDecoder::new(Vec::new())),
            done: false,
        }
    }

    /// Decoder for the `gzip` coding.
    pub fn gzip() -> InflateFilter {
        InflateFilter {
            codec: Inflate::Gzip(GzDecoder::new(Vec::new())),
            done: false,
        }
    }

    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match self.codec {
            Inflate::Zlib(ref mut c) => c.write(data),
            Inflate::Gzip(ref mut c) => c.write(data),
        }
    }

    fn finish(&mut self) -> std::io::Result<()> {
        match self.codec {
            Inflate::Zlib(ref mut c) => c.try_finish(),
            Inflate::Gzip(ref mut c) => c.try_finish(),
        }
    }

    fn pending(&mut self) -> &mut Vec<u8> {
        match self.codec {
            Inflate::Zlib(ref mut c) => c.get_mut(),
            Inflate::Gzip(ref mut c) => c.get_mut(),
        }
    }
}

impl BodyFilter for InflateFilter {
    fn process(&mut self, out: &mut [u8], input: &[u8], more: bool) -> Result<Processed> {
        let mut res = Processed::default();
        res.out_bytes += drain_into(self.pending(), out);

        if !self.done {
            while res.in_bytes < input.len() && res.out_bytes < out.len() {
                let end = (res.in_bytes + FEED_MAX).min(input.len());
                let n = self.write(&input[res.in_bytes..end]).map_err(codec_err)?;
                res.in_bytes += n;
                let taken = drain_into(self.pending(), &mut out[res.out_bytes..]);
                res.out_bytes += taken;
                if n == 0 {
                    // the compressed stream ended before the input did
                    self.done = true;
                    break;
                }
            }
            if !more && res.in_bytes == input.len() && !self.done {
                self.finish().map_err(codec_err)?;
                self.done = true;
                res.out_bytes += drain_into(self.pending(), &mut out[res.out_bytes..]);
            }
        }

        res.finished = self.done && self.pending().is_empty();
        Ok(res)
    }
}

/// Encoding filter: plain bytes in, compressed bytes out.
pub struct DeflateFilter {
    codec: Deflate,
    done: bool,
}

enum Deflate {
    Zlib(ZlibEncoder<Vec<u8>>),
    Gzip(GzEncoder<Vec<u8>>),
}

impl DeflateFilter {
    /// Encoder for the `deflate` coding (zlib wrapper).
    pub fn zlib() -> DeflateFilter {
        DeflateFilter {
            codec: Deflate::Zlib(ZlibEncoder::new(Vec::new(), Compression::default())),
            done: false,
        }
    }

    /// Encoder for the `gzip` coding.
    pub fn gzip() -> DeflateFilter {
        DeflateFilter {
            codec: Deflate::Gzip(GzEncoder::new(Vec::new(), Compression::default())),
            done: false,
        }
    }

    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match self.codec {
            Deflate::Zlib(ref mut c) => c.write(data),
            Deflate::Gzip(ref mut c) => c.write(data),
        }
    }

    fn finish(&mut self) -> std::io::Result<()> {
        match self.codec {
            Deflate::Zlib(ref mut c) => c.try_finish(),
            Deflate::Gzip(ref mut c) => c.try_finish(),
        }
    }

    fn pending(&mut self) -> &mut Vec<u8> {
        match self.codec {
            Deflate::Zlib(ref mut c) => c.get_mut(),
            Deflate::Gzip(ref mut c) => c.get_mut(),
        }
    }
}

impl BodyFilter for DeflateFilter {
    fn process(&mut self, out: &mut [u8], input: &[u8], more: bool) -> Result<Processed> {
        let mut res = Processed::default();
        res.out_bytes += drain_into(self.pending(), out);

        if !self.done {
            while res.in_bytes < input.len() && res.out_bytes < out.len() {
                let end = (res.in_bytes + FEED_MAX).min(input.len());
                let n = self.write(&input[res.in_bytes..end]).map_err(codec_err)?;
                res.in_bytes += n;
                res.out_bytes += drain_into(self.pending(), &mut out[res.out_bytes..]);
                if n == 0 {
                    break;
                }
            }
            if !more && res.in_bytes == input.len() {
                self.finish().map_err(codec_err)?;
                self.done = true;
                res.out_bytes += drain_into(self.pending(), &mut out[res.out_bytes..]);
            }
        }

        res.finished = self.done && self.pending().is_empty();
        Ok(res)
    }
}

impl std::fmt::Debug for InflateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.codec {
            Inflate::Zlib(_) => "InflateFilter::zlib",
            Inflate::Gzip(_) => "InflateFilter::gzip",
        };
        f.debug_struct(name).field("done", &self.done).finish()
    }
}

impl std::fmt::Debug for DeflateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.codec {
            Deflate::Zlib(_) => "DeflateFilter::zlib",
            Deflate::Gzip(_) => "DeflateFilter::gzip",
        };
        f.debug_struct(name).field("done", &self.done).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut dyn BodyFilter, mut input: &[u8]) -> Result<Vec<u8>> {
        let mut all = Vec::new();
        let mut buf = [0u8; 61];
        for _ in 0..100_000 {
            let r = filter.process(&mut buf, input, false)?;
            all.extend_from_slice(&buf[..r.out_bytes]);
            input = &input[r.in_bytes..];
            if r.finished {
                return Ok(all);
            }
        }
        panic!("filter made no progress");
    }

    #[test]
    fn zlib_round_trip() {
        let plain: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let packed = run(&mut DeflateFilter::zlib(), &plain).unwrap();
        assert!(packed.len() < plain.len());
        let unpacked = run(&mut InflateFilter::zlib(), &packed).unwrap();
        assert_eq!(unpacked, plain);
    }

    #[test]
    fn gzip_round_trip() {
        let plain = b"the quick brown fox jumps over the lazy dog".repeat(100);
        let packed = run(&mut DeflateFilter::gzip(), &plain).unwrap();
        let unpacked = run(&mut InflateFilter::gzip(), &packed).unwrap();
        assert_eq!(unpacked, plain);
    }

    #[test]
    fn truncated_stream_is_bad_payload() {
        let plain = b"some reasonably sized payload for truncation".repeat(10);
        let packed = run(&mut DeflateFilter::zlib(), &plain).unwrap();
        let err = run(&mut InflateFilter::zlib(), &packed[..packed.len() - 6]).unwrap_err();
        assert_eq!(err.kind(), Kind::BadPayload);
    }

    #[test]
    fn empty_stream_round_trip() {
        let packed = run(&mut DeflateFilter::gzip(), b"").unwrap();
        assert!(!packed.is_empty());
        let unpacked = run(&mut InflateFilter::gzip(), &packed).unwrap();
        assert!(unpacked.is_empty());
    }
}
