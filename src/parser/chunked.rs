//! Chunked transfer-coding decoder.
//!
//! A byte-driven state machine over whatever input is currently
//! buffered. Chunk extensions are validated and discarded; trailer
//! bytes are accumulated for the parser to append to the header store.

use crate::error::{Error, Kind, Result};
use crate::grammar;

// Applied to the extensions of all chunks combined.
const EXTENSIONS_LIMIT: usize = 16 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Size,
    SizeLws,
    Ext,
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    Done,
}

/// One decoding step's outcome.
#[derive(Debug)]
pub(crate) enum ChunkStep {
    /// Framing consumed, nothing to report; feed more input.
    NeedData { consumed: usize },
    /// Chunk payload available at `input[off..off + len]`.
    ///
    /// The range lies inside the first `consumed` bytes; stage the
    /// payload before consuming.
    Data {
        consumed: usize,
        off: usize,
        len: usize,
    },
    /// The final chunk, trailers and terminator have been consumed.
    Done { consumed: usize },
}

#[derive(Debug)]
pub(crate) struct ChunkedDecoder {
    state: State,
    chunk_len: u64,
    ext: Vec<u8>,
    ext_total: usize,
    trailer: Vec<u8>,
    trailer_limit: usize,
}

impl ChunkedDecoder {
    pub(crate) fn new(trailer_limit: usize) -> ChunkedDecoder {
        ChunkedDecoder {
            state: State::Start,
            chunk_len: 0,
            ext: Vec::new(),
            ext_total: 0,
            trailer: Vec::new(),
            trailer_limit,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// The accumulated trailer block (field lines plus the final
    /// CRLF), empty if the message carried no trailers.
    pub(crate) fn take_trailers(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.trailer)
    }

    fn push_trailer(&mut self, b: u8) -> Result<()> {
        if self.trailer.len() >= self.trailer_limit {
            return Err(Error::new(Kind::HeadersLimit));
        }
        self.trailer.push(b);
        Ok(())
    }

    fn hex_digit(b: u8) -> Option<u64> {
        match b {
            b'0'..=b'9' => Some(u64::from(b - b'0')),
            b'a'..=b'f' => Some(u64::from(b - b'a') + 10),
            b'A'..=b'F' => Some(u64::from(b - b'A') + 10),
            _ => None,
        }
    }

    /// Advance over `input`, returning at the first payload range, at
    /// the end of the message, or when input runs dry.
    pub(crate) fn step(&mut self, input: &[u8]) -> Result<ChunkStep> {
        let mut i = 0;
        loop {
            if self.state == State::Done {
                return Ok(ChunkStep::Done { consumed: i });
            }
            if self.state == State::Body {
                let avail = input.len() - i;
                if avail == 0 {
                    return Ok(ChunkStep::NeedData { consumed: i });
                }
                let len = (self.chunk_len.min(avail as u64)) as usize;
                self.chunk_len -= len as u64;
                if self.chunk_len == 0 {
                    self.state = State::BodyCr;
                }
                let off = i;
                i += len;
                return Ok(ChunkStep::Data {
                    consumed: i,
                    off,
                    len,
                });
            }
            if i >= input.len() {
                return Ok(ChunkStep::NeedData { consumed: i });
            }
            let b = input[i];
            i += 1;
            self.state = match self.state {
                State::Start => match Self::hex_digit(b) {
                    Some(d) => {
                        self.chunk_len = d;
                        State::Size
                    }
                    None => return Err(Error::new(Kind::BadPayload)),
                },
                State::Size => match b {
                    b'\t' | b' ' => State::SizeLws,
                    b';' => State::Ext,
                    b'\r' => State::SizeLf,
                    _ => match Self::hex_digit(b) {
                        Some(d) => {
                            self.chunk_len = self
                                .chunk_len
                                .checked_mul(16)
                                .and_then(|v| v.checked_add(d))
                                .ok_or_else(|| Error::new(Kind::NumericOverflow))?;
                            State::Size
                        }
                        None => return Err(Error::new(Kind::BadPayload)),
                    },
                },
                State::SizeLws => match b {
                    b'\t' | b' ' => State::SizeLws,
                    b';' => State::Ext,
                    b'\r' => State::SizeLf,
                    _ => return Err(Error::new(Kind::BadPayload)),
                },
                State::Ext => match b {
                    b'\r' => {
                        grammar::validate_chunk_ext(&self.ext)?;
                        self.ext.clear();
                        State::SizeLf
                    }
                    b'\n' => return Err(Error::new(Kind::BadLineEnding)),
                    _ => {
                        self.ext_total += 1;
                        if self.ext_total > EXTENSIONS_LIMIT {
                            return Err(Error::new(Kind::BadPayload));
                        }
                        self.ext.push(b);
                        State::Ext
                    }
                },
                State::SizeLf => match b {
                    b'\n' => {
                        if self.chunk_len == 0 {
                            State::EndCr
                        } else {
                            State::Body
                        }
                    }
                    _ => return Err(Error::new(Kind::BadLineEnding)),
                },
                State::Body => unreachable!("handled above"),
                State::BodyCr => match b {
                    b'\r' => State::BodyLf,
                    _ => return Err(Error::new(Kind::BadPayload)),
                },
                State::BodyLf => match b {
                    b'\n' => State::Start,
                    _ => return Err(Error::new(Kind::BadLineEnding)),
                },
                // after the last chunk: either the terminating CRLF or
                // the first byte of a trailer field
                State::EndCr => match b {
                    b'\r' => State::EndLf,
                    _ => {
                        self.push_trailer(b)?;
                        State::Trailer
                    }
                },
                State::Trailer => {
                    self.push_trailer(b)?;
                    match b {
                        b'\r' => State::TrailerLf,
                        _ => State::Trailer,
                    }
                }
                State::TrailerLf => match b {
                    b'\n' => {
                        self.push_trailer(b)?;
                        State::EndCr
                    }
                    _ => return Err(Error::new(Kind::BadLineEnding)),
                },
                State::EndLf => match b {
                    b'\n' => {
                        if !self.trailer.is_empty() {
                            // terminate the block for field parsing
                            self.trailer.extend_from_slice(b"\r\n");
                        }
                        State::Done
                    }
                    _ => return Err(Error::new(Kind::BadLineEnding)),
                },
                State::Done => unreachable!("handled above"),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut dec = ChunkedDecoder::new(16 * 1024);
        let mut body = Vec::new();
        let mut rest = input;
        loop {
            match dec.step(rest)? {
                ChunkStep::NeedData { consumed } => {
                    if consumed == 0 && rest.is_empty() {
                        panic!("ran out of input");
                    }
                    rest = &rest[consumed..];
                }
                ChunkStep::Data { consumed, off, len } => {
                    body.extend_from_slice(&rest[off..off + len]);
                    rest = &rest[consumed..];
                }
                ChunkStep::Done { consumed } => {
                    rest = &rest[consumed..];
                    return Ok((body, dec.take_trailers()));
                }
            }
        }
    }

    #[test]
    fn simple_chunks() {
        let (body, trailers) = decode_all(b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n").unwrap();
        assert_eq!(body, b"hello world");
        assert!(trailers.is_empty());
    }

    #[test]
    fn sizes_are_hex_case_insensitive() {
        let (body, _) = decode_all(b"A\r\n0123456789\r\n0\r\n\r\n").unwrap();
        assert_eq!(body.len(), 10);
        let (body, _) = decode_all(b"a\r\n0123456789\r\n0\r\n\r\n").unwrap();
        assert_eq!(body.len(), 10);
    }

    #[test]
    fn extensions_are_validated_and_discarded() {
        let (body, _) = decode_all(b"5;ext=x\r\nhello\r\n0;a=\"q\"\r\n\r\n").unwrap();
        assert_eq!(body, b"hello");

        assert_eq!(
            decode_all(b"5;=bad\r\nhello\r\n0\r\n\r\n").unwrap_err().kind(),
            Kind::BadPayload
        );
        assert_eq!(
            decode_all(b"5;e\nx\r\nhello\r\n0\r\n\r\n").unwrap_err().kind(),
            Kind::BadLineEnding
        );
    }

    #[test]
    fn trailers_are_accumulated() {
        let (body, trailers) =
            decode_all(b"5\r\nhello\r\n0\r\nTrailer-Field: z\r\nX: y\r\n\r\n").unwrap();
        assert_eq!(body, b"hello");
        assert_eq!(trailers, b"Trailer-Field: z\r\nX: y\r\n\r\n");
    }

    #[test]
    fn max_size_parses_and_overflows() {
        // u64::MAX is fine as a size (the body itself is not present)
        let mut dec = ChunkedDecoder::new(1024);
        match dec.step(b"ffffffffffffffff\r\n").unwrap() {
            ChunkStep::NeedData { consumed } => assert_eq!(consumed, 18),
            other => panic!("unexpected {:?}", other),
        }

        // one more digit overflows
        let mut dec = ChunkedDecoder::new(1024);
        let err = dec.step(b"ffffffffffffffff0\r\n").unwrap_err();
        assert_eq!(err.kind(), Kind::NumericOverflow);
    }

    #[test]
    fn missing_size_digit() {
        let mut dec = ChunkedDecoder::new(1024);
        assert_eq!(
            dec.step(b"\r\n").unwrap_err().kind(),
            Kind::BadPayload
        );
    }

    #[test]
    fn bad_chunk_terminator() {
        assert_eq!(
            decode_all(b"1\r\nXY\r\n0\r\n\r\n").unwrap_err().kind(),
            Kind::BadPayload
        );
    }

    #[test]
    fn byte_at_a_time() {
        let input = b"5;x=1\r\nhello\r\n1\r\n!\r\n0\r\nT: v\r\n\r\n";
        let mut dec = ChunkedDecoder::new(1024);
        let mut body = Vec::new();
        for (n, _) in input.iter().enumerate() {
            let window = &input[n..n + 1];
            match dec.step(window).unwrap() {
                ChunkStep::Data { off, len, .. } => {
                    body.extend_from_slice(&window[off..off + len]);
                }
                ChunkStep::NeedData { .. } => {}
                ChunkStep::Done { .. } => break,
            }
        }
        assert!(dec.is_done());
        assert_eq!(body, b"hello!");
        assert_eq!(dec.take_trailers(), b"T: v\r\n\r\n");
    }

    #[test]
    fn extension_flood_is_rejected() {
        let mut dec = ChunkedDecoder::new(1024);
        let mut input = vec![b'1', b';'];
        input.extend(std::iter::repeat(b'x').take(EXTENSIONS_LIMIT + 2));
        let err = dec.step(&input).unwrap_err();
        assert_eq!(err.kind(), Kind::BadPayload);
    }
}
