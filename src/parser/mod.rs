//! The incremental HTTP/1 parser.
//!
//! The parser is strict: malformed input per the HTTP ABNF is an
//! unrecoverable error for the current message. It is fed bytes via
//! `prepare`/`commit`, never performing I/O itself, and advances with
//! each `parse` call until the header is available and then the body is
//! delivered in place, into an elastic buffer, or into a sink.

mod chunked;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::body::{write_all, BodyFilter, Sink};
use crate::buffer::{CircularBuffer, FlatBuffer};
use crate::coding::{InflateFilter, INFLATE_RESERVE};
use crate::error::{Error, Kind, Result};
use crate::fields::metadata::{Encoding, Payload};
use crate::fields::store::{Header, HeaderKind};
use crate::fields::{RequestView, ResponseView};
use crate::version::Version;
use crate::workspace::{Workspace, WsSlot};

use self::chunked::{ChunkStep, ChunkedDecoder};

/// Limits applied to the header section.
#[derive(Clone, Copy, Debug)]
pub struct HeaderLimits {
    /// Total header section limit in bytes.
    pub max_size: usize,
    /// Start-line limit in bytes.
    pub max_start_line: usize,
    /// Single-field limit in bytes.
    pub max_field: usize,
    /// Field count limit.
    pub max_fields: usize,
}

impl Default for HeaderLimits {
    fn default() -> HeaderLimits {
        HeaderLimits {
            max_size: 8 * 1024,
            max_start_line: 4 * 1024,
            max_field: 4 * 1024,
            max_fields: 100,
        }
    }
}

/// Parser configuration, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Header section limits.
    pub headers: HeaderLimits,
    /// Largest allowed size for a decoded body.
    pub body_limit: u64,
    /// Minimum working-buffer size; also the lower bound for the
    /// in-place body.
    pub min_buffer: usize,
    /// Upper bound on the space returned from `prepare`.
    pub max_prepare: usize,
    /// Space reserved for type-erased sinks and filters.
    pub max_type_erase: usize,
    /// Decode `deflate` transfer/content encoding transparently.
    pub apply_deflate_decoder: bool,
    /// Decode `gzip` transfer/content encoding transparently.
    pub apply_gzip_decoder: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            headers: HeaderLimits::default(),
            body_limit: 64 * 1024,
            min_buffer: 4 * 1024,
            max_prepare: usize::max_value(),
            max_type_erase: 1024,
            apply_deflate_decoder: false,
            apply_gzip_decoder: false,
        }
    }
}

impl Config {
    /// Defaults for response parsing (a larger body limit).
    pub fn response() -> Config {
        Config {
            body_limit: 1024 * 1024,
            ..Config::default()
        }
    }
}

/// Writable input regions returned from `prepare`.
///
/// The first slice fills before the second; the second is non-empty
/// only while body input wraps the internal ring.
#[derive(Debug)]
pub struct InputBuffers<'a> {
    pub first: &'a mut [u8],
    pub second: &'a mut [u8],
}

impl InputBuffers<'_> {
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy from `data` into the writable space; returns the number of
    /// bytes taken, to pass to `commit`.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n1 = self.first.len().min(data.len());
        self.first[..n1].copy_from_slice(&data[..n1]);
        let n2 = self.second.len().min(data.len() - n1);
        self.second[..n2].copy_from_slice(&data[n1..n1 + n2]);
        n1 + n2
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    Reset,
    Start,
    Header,
    Body,
    CompleteInPlace,
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BodyMode {
    InPlace,
    Elastic,
    Sink,
}

#[derive(Debug)]
enum Decoder {
    None,
    Length { remaining: u64 },
    Chunked(ChunkedDecoder),
    Eof,
}

enum Event {
    NeedData,
    Data { last: bool },
    Done,
}

impl Decoder {
    // Advance over `input`; data ranges are staged by the caller
    // before the consumed count is applied.
    fn step(&mut self, input: &[u8], eof: bool) -> Result<(usize, usize, usize, Event)> {
        match self {
            Decoder::None => Ok((0, 0, 0, Event::Done)),
            Decoder::Length { remaining } => {
                if *remaining == 0 {
                    return Ok((0, 0, 0, Event::Done));
                }
                if input.is_empty() {
                    return Ok((0, 0, 0, Event::NeedData));
                }
                let n = (*remaining).min(input.len() as u64) as usize;
                *remaining -= n as u64;
                Ok((
                    n,
                    0,
                    n,
                    Event::Data {
                        last: *remaining == 0,
                    },
                ))
            }
            Decoder::Eof => {
                if !input.is_empty() {
                    Ok((input.len(), 0, input.len(), Event::Data { last: false }))
                } else if eof {
                    Ok((0, 0, 0, Event::Done))
                } else {
                    Ok((0, 0, 0, Event::NeedData))
                }
            }
            Decoder::Chunked(c) => match c.step(input)? {
                ChunkStep::NeedData { consumed } => Ok((consumed, 0, 0, Event::NeedData)),
                ChunkStep::Data { consumed, off, len } => {
                    Ok((consumed, off, len, Event::Data { last: false }))
                }
                ChunkStep::Done { consumed } => Ok((consumed, 0, 0, Event::Done)),
            },
        }
    }
}

struct ParserCore {
    cfg: Config,
    kind: HeaderKind,
    ws: Workspace,
    state: State,
    h: Option<Header>,

    fb: FlatBuffer,
    rb: CircularBuffer,

    decoder: Decoder,
    mode: BodyMode,
    filter_slot: Option<WsSlot>,
    filter_finished: bool,
    codec_reserved: bool,
    sink_slot: Option<WsSlot>,
    sink_closed: bool,
    elastic: Option<BytesMut>,

    // decoded bytes not yet accepted by the destination
    pending: Vec<u8>,
    // raw (pre-filter) bytes staged out of the input buffers
    stage: Vec<u8>,
    // filter output scratch
    scratch: Box<[u8]>,
    // the in-place body
    inplace: Vec<u8>,
    inplace_pos: usize,
    inplace_cap: usize,

    body_limit: u64,
    body_total: u64,
    body_done: bool,

    got_eof: bool,
    head_response: bool,
    failed: bool,
}

impl ParserCore {
    fn new(kind: HeaderKind, cfg: Config) -> ParserCore {
        let ws_cap = cfg.max_type_erase
            + if cfg.apply_deflate_decoder || cfg.apply_gzip_decoder {
                INFLATE_RESERVE + 64
            } else {
                0
            };
        let inplace_cap = cfg
            .min_buffer
            .max(cfg.body_limit.min(64 * 1024) as usize);
        ParserCore {
            cfg,
            kind,
            ws: Workspace::new(ws_cap),
            state: State::Reset,
            h: None,
            fb: FlatBuffer::new(cfg.headers.max_size),
            rb: CircularBuffer::new(cfg.min_buffer),
            decoder: Decoder::None,
            mode: BodyMode::InPlace,
            filter_slot: None,
            filter_finished: false,
            codec_reserved: false,
            sink_slot: None,
            sink_closed: false,
            elastic: None,
            pending: Vec::new(),
            stage: Vec::new(),
            scratch: vec![0; cfg.min_buffer].into_boxed_slice(),
            inplace: Vec::new(),
            inplace_pos: 0,
            inplace_cap,
            body_limit: cfg.body_limit,
            body_total: 0,
            body_done: false,
            got_eof: false,
            head_response: false,
            failed: false,
        }
    }

    //--------------------------------------------------------------
    // observers

    fn got_header(&self) -> bool {
        self.h.is_some()
    }

    fn is_complete(&self) -> bool {
        self.state >= State::CompleteInPlace
    }

    fn is_end_of_stream(&self) -> bool {
        self.failed || self.state == State::Reset || (self.is_complete() && self.got_eof)
    }

    //--------------------------------------------------------------
    // input

    fn prepare(&mut self) -> InputBuffers<'_> {
        let max = self.cfg.max_prepare;
        if self.state == State::Body {
            let (first, second) = self.rb.prepare(max);
            InputBuffers { first, second }
        } else {
            InputBuffers {
                first: self.fb.prepare(max),
                second: &mut [],
            }
        }
    }

    fn commit(&mut self, n: usize) {
        if self.state == State::Body {
            self.rb.commit(n);
        } else {
            self.fb.commit(n);
        }
    }

    fn commit_eof(&mut self) {
        self.got_eof = true;
    }

    //--------------------------------------------------------------
    // lifecycle

    fn reset(&mut self) {
        self.fb.clear();
        self.rb.clear();
        self.ws.clear();
        self.h = None;
        self.state = State::Reset;
        self.decoder = Decoder::None;
        self.mode = BodyMode::InPlace;
        self.filter_slot = None;
        self.filter_finished = false;
        self.sink_slot = None;
        self.sink_closed = false;
        self.elastic = None;
        self.pending.clear();
        self.stage.clear();
        self.inplace.clear();
        self.inplace_pos = 0;
        self.body_limit = self.cfg.body_limit;
        self.body_total = 0;
        self.body_done = false;
        self.got_eof = false;
        self.head_response = false;
        self.failed = false;
    }

    fn start_impl(&mut self, head_response: bool) {
        debug_assert!(
            matches!(self.state, State::Reset) || self.is_complete(),
            "start() requires a finished message"
        );
        // bytes past the previous message begin the next one; fold the
        // ring remainder behind the flat remainder
        if self.rb.len() > 0 || self.fb.len() > 0 {
            let mut merged = Vec::with_capacity(self.fb.len() + self.rb.len());
            merged.extend_from_slice(self.fb.committed());
            let (a, b) = self.rb.readable();
            merged.extend_from_slice(a);
            merged.extend_from_slice(b);
            self.fb.clear();
            self.rb.clear();
            let dst = self.fb.prepare(usize::max_value());
            let n = dst.len().min(merged.len());
            dst[..n].copy_from_slice(&merged[..n]);
            self.fb.commit(n);
            if n < merged.len() {
                self.rb.push_slice(&merged[n..]);
            }
        }
        self.ws.clear();
        self.h = None;
        self.state = State::Start;
        self.decoder = Decoder::None;
        self.mode = BodyMode::InPlace;
        self.filter_slot = None;
        self.filter_finished = false;
        self.sink_slot = None;
        self.sink_closed = false;
        self.elastic = None;
        self.pending.clear();
        self.stage.clear();
        self.inplace.clear();
        self.inplace_pos = 0;
        self.body_limit = self.cfg.body_limit;
        self.body_total = 0;
        self.body_done = false;
        self.head_response = head_response;
    }

    //--------------------------------------------------------------
    // parsing

    fn parse(&mut self) -> Result<()> {
        if self.failed {
            return Err(Error::new(Kind::EndOfStream));
        }
        let r = self.parse_inner();
        if let Err(ref e) = r {
            if !matches!(e.kind(), Kind::NeedData | Kind::InPlaceOverflow) {
                debug!(kind = ?e.kind(), "parse failed");
                self.failed = true;
            }
        }
        r
    }

    fn parse_inner(&mut self) -> Result<()> {
        loop {
            match self.state {
                State::Reset => {
                    // tolerated: behave as if start() was called
                    self.start_impl(false);
                }
                State::Start => {
                    // skip stray CRLF before the start line
                    let data = self.fb.committed();
                    let mut n = 0;
                    while data[n..].starts_with(b"\r\n") {
                        n += 2;
                    }
                    self.fb.consume(n);
                    if self.fb.len() == 0 {
                        if self.got_eof {
                            return Err(Error::new(Kind::EndOfStream));
                        }
                        return Err(Error::new(Kind::NeedData));
                    }
                    self.state = State::Header;
                }
                State::Header => {
                    self.parse_header()?;
                    self.setup_body()?;
                }
                State::Body => return self.parse_body(),
                State::CompleteInPlace | State::Complete => return Ok(()),
            }
        }
    }

    fn parse_header(&mut self) -> Result<()> {
        let data = self.fb.committed();
        let end = data
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|i| i + 4);
        let end = match end {
            Some(end) => end,
            None => {
                let limits = &self.cfg.headers;
                let first_line_end = data.windows(2).position(|w| w == b"\r\n");
                if first_line_end.is_none() && data.len() > limits.max_start_line {
                    return Err(Error::new(Kind::StartLineLimit));
                }
                if data.len() >= limits.max_size {
                    return Err(Error::new(Kind::HeadersLimit));
                }
                if self.got_eof {
                    return Err(Error::new(Kind::Incomplete));
                }
                return Err(Error::new(Kind::NeedData));
            }
        };
        let h = Header::parse_install(self.kind, &data[..end], &self.cfg.headers)?;
        trace!(fields = h.count(), "parsed header");
        self.fb.consume(end);
        self.h = Some(h);
        Ok(())
    }

    // The framing decision at header_done, then into the body.
    fn setup_body(&mut self) -> Result<()> {
        let h = self.h.as_ref().expect("header parsed");
        if let Some(kind) = h.md.field_error() {
            return Err(Error::new(kind));
        }
        // Transfer-Encoding next to Content-Length on HTTP/1.0 peers
        // cannot be framed reliably
        if h.version == Version::Http10
            && h.md.transfer_encoding.count > 0
            && h.md.content_length.count > 0
        {
            return Err(Error::new(Kind::BadTransferEncoding));
        }

        let payload = if self.head_response {
            Payload::None
        } else {
            h.md.payload
        };
        trace!(?payload, "framing decided");

        self.decoder = match payload {
            Payload::None => Decoder::None,
            Payload::Size(n) => Decoder::Length { remaining: n },
            Payload::Chunked => {
                Decoder::Chunked(ChunkedDecoder::new(self.cfg.headers.max_size))
            }
            Payload::ToEof => Decoder::Eof,
            Payload::Error => unreachable!("field errors reported above"),
        };

        if !matches!(self.decoder, Decoder::None) {
            let wanted = match h.md.transfer_encoding.encoding {
                Encoding::Deflate if self.cfg.apply_deflate_decoder => Some(InflateFilter::zlib()),
                Encoding::Gzip if self.cfg.apply_gzip_decoder => Some(InflateFilter::gzip()),
                _ => None,
            };
            if let Some(filter) = wanted {
                if !self.codec_reserved {
                    self.ws.reserve_front(INFLATE_RESERVE)?;
                    self.codec_reserved = true;
                }
                let boxed: Box<dyn BodyFilter> = Box::new(filter);
                let slot = self
                    .ws
                    .emplace_sized(boxed, std::mem::size_of::<InflateFilter>())?;
                self.filter_slot = Some(slot);
            }
        }

        self.state = State::Body;
        Ok(())
    }

    fn parse_body(&mut self) -> Result<()> {
        if self.body_done {
            return self.finish_body();
        }
        loop {
            // deliver what a previous call could not
            self.flush_pending(false)?;

            let use_fb = self.fb.len() > 0;
            let (consumed, event) = {
                let input: &[u8] = if use_fb {
                    self.fb.committed()
                } else {
                    self.rb.readable().0
                };
                let (consumed, off, len, event) = self.decoder.step(input, self.got_eof)?;
                if len > 0 {
                    self.stage.clear();
                    self.stage.extend_from_slice(&input[off..off + len]);
                }
                (consumed, event)
            };
            if use_fb {
                self.fb.consume(consumed);
            } else {
                self.rb.consume(consumed);
            }

            match event {
                Event::NeedData => {
                    if self.fb.len() > 0 || self.rb.len() > 0 {
                        // switch to the other input region
                        continue;
                    }
                    if self.got_eof {
                        return Err(Error::new(Kind::Incomplete));
                    }
                    return Err(Error::new(Kind::NeedData));
                }
                Event::Data { last } => {
                    self.process_stage(last)?;
                    self.flush_pending(false)?;
                    if last {
                        self.body_done = true;
                        return self.finish_body();
                    }
                }
                Event::Done => {
                    self.body_done = true;
                    return self.finish_body();
                }
            }
        }
    }

    // Raw staged bytes go through the filter (if any) into `pending`,
    // with the decoded total held to the body limit.
    fn process_stage(&mut self, last: bool) -> Result<()> {
        if self.filter_slot.is_none() {
            let n = self.stage.len() as u64;
            if self.body_total + n > self.body_limit {
                return Err(Error::new(Kind::BodyTooLarge));
            }
            self.body_total += n;
            self.pending.extend_from_slice(&self.stage);
            self.stage.clear();
            return Ok(());
        }
        if self.filter_finished {
            // compressed stream ended but framing kept sending bytes
            if !self.stage.is_empty() {
                return Err(Error::new(Kind::BadPayload));
            }
            return Ok(());
        }
        let slot = self.filter_slot.expect("checked above");
        let mut pos = 0;
        loop {
            let filter = self.ws.get_mut::<Box<dyn BodyFilter>>(slot);
            let r = filter.process(&mut self.scratch, &self.stage[pos..], !last)?;
            pos += r.in_bytes;
            let out = r.out_bytes as u64;
            if self.body_total + out > self.body_limit {
                return Err(Error::new(Kind::BodyTooLarge));
            }
            self.body_total += out;
            self.pending.extend_from_slice(&self.scratch[..r.out_bytes]);
            if r.finished {
                self.filter_finished = true;
                if pos < self.stage.len() {
                    return Err(Error::new(Kind::BadPayload));
                }
                break;
            }
            if r.in_bytes == 0 && r.out_bytes == 0 {
                if pos < self.stage.len() || last {
                    return Err(Error::new(Kind::BadPayload));
                }
                break;
            }
            if pos >= self.stage.len() && r.out_bytes == 0 {
                break;
            }
        }
        self.stage.clear();
        Ok(())
    }

    // Move `pending` into the delivery target. `last` is true on the
    // final flush of the message body.
    fn flush_pending(&mut self, last: bool) -> Result<()> {
        match self.mode {
            BodyMode::InPlace => {
                if !self.pending.is_empty() {
                    if self.inplace_pos > 0 {
                        self.inplace.drain(..self.inplace_pos);
                        self.inplace_pos = 0;
                    }
                    let space = self.inplace_cap.saturating_sub(self.inplace.len());
                    let n = space.min(self.pending.len());
                    self.inplace.extend_from_slice(&self.pending[..n]);
                    self.pending.drain(..n);
                    if !self.pending.is_empty() {
                        return Err(Error::new(Kind::InPlaceOverflow));
                    }
                }
            }
            BodyMode::Elastic => {
                if let Some(ref mut eb) = self.elastic {
                    eb.extend_from_slice(&self.pending);
                }
                self.pending.clear();
            }
            BodyMode::Sink => {
                if !self.pending.is_empty() || (last && !self.sink_closed) {
                    let pending = std::mem::take(&mut self.pending);
                    if let Some(slot) = self.sink_slot {
                        let sink = self.ws.get_mut::<Box<dyn Sink>>(slot);
                        write_all(sink.as_mut(), &pending, !last)?;
                    }
                    if last {
                        self.sink_closed = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn finish_body(&mut self) -> Result<()> {
        // drain the decompressor's tail
        if let Some(slot) = self.filter_slot {
            while !self.filter_finished {
                let filter = self.ws.get_mut::<Box<dyn BodyFilter>>(slot);
                let r = filter.process(&mut self.scratch, &[], false)?;
                let out = r.out_bytes as u64;
                if self.body_total + out > self.body_limit {
                    return Err(Error::new(Kind::BodyTooLarge));
                }
                self.body_total += out;
                self.pending.extend_from_slice(&self.scratch[..r.out_bytes]);
                if r.finished {
                    self.filter_finished = true;
                } else if r.out_bytes == 0 {
                    return Err(Error::new(Kind::BadPayload));
                }
            }
        }
        // chunked trailers join the header section
        if let Decoder::Chunked(ref mut c) = self.decoder {
            let trailers = c.take_trailers();
            if !trailers.is_empty() {
                let h = self.h.as_mut().expect("header parsed");
                h.append_trailers(&trailers, &self.cfg.headers)?;
            }
        }
        self.flush_pending(true)?;
        self.state = if self.mode == BodyMode::InPlace {
            State::CompleteInPlace
        } else {
            State::Complete
        };
        trace!(total = self.body_total, "message complete");
        Ok(())
    }

    //--------------------------------------------------------------
    // body access

    fn set_body(&mut self, mut buf: BytesMut) {
        debug_assert!(self.got_header(), "set_body() requires the header");
        buf.extend_from_slice(&self.inplace[self.inplace_pos..]);
        self.inplace.clear();
        self.inplace_pos = 0;
        self.elastic = Some(buf);
        self.mode = BodyMode::Elastic;
        if self.state == State::CompleteInPlace {
            self.state = State::Complete;
        }
    }

    fn take_body(&mut self) -> BytesMut {
        self.elastic.take().unwrap_or_else(BytesMut::new)
    }

    fn set_body_sink<S: Sink + 'static>(&mut self, sink: S) -> Result<()> {
        debug_assert!(self.got_header(), "set_body_sink() requires the header");
        let boxed: Box<dyn Sink> = Box::new(sink);
        let slot = self.ws.emplace_sized(boxed, std::mem::size_of::<S>())?;
        self.sink_slot = Some(slot);
        self.mode = BodyMode::Sink;
        // hand over anything already buffered in place
        let existing = self.inplace[self.inplace_pos..].to_vec();
        self.inplace.clear();
        self.inplace_pos = 0;
        let last = self.is_complete();
        if !existing.is_empty() || last {
            let sink = self.ws.get_mut::<Box<dyn Sink>>(slot);
            write_all(sink.as_mut(), &existing, !last)?;
            if last {
                self.sink_closed = true;
                self.state = State::Complete;
            }
        }
        Ok(())
    }

    fn set_body_limit(&mut self, n: u64) {
        self.body_limit = n;
    }

    fn pull_body(&self) -> &[u8] {
        &self.inplace[self.inplace_pos..]
    }

    fn consume_body(&mut self, n: usize) {
        let avail = self.inplace.len() - self.inplace_pos;
        debug_assert!(n <= avail, "consumed more body than available");
        self.inplace_pos += n.min(avail);
        if self.state == State::CompleteInPlace && self.inplace_pos >= self.inplace.len() {
            self.state = State::Complete;
        }
    }

    fn body(&self) -> &[u8] {
        &self.inplace[self.inplace_pos..]
    }

    fn release_buffered_data(&mut self) -> Bytes {
        let mut merged = Vec::with_capacity(self.fb.len() + self.rb.len());
        merged.extend_from_slice(self.fb.committed());
        let (a, b) = self.rb.readable();
        merged.extend_from_slice(a);
        merged.extend_from_slice(b);
        self.fb.clear();
        self.rb.clear();
        Bytes::from(merged)
    }
}

macro_rules! forward_parser_api {
    () => {
        /// Prepare for a brand-new stream.
        pub fn reset(&mut self) {
            self.p.reset()
        }

        /// Prepare for the next message on the current stream.
        pub fn start(&mut self) {
            self.p.start_impl(false)
        }

        /// The writable input regions.
        pub fn prepare(&mut self) -> InputBuffers<'_> {
            self.p.prepare()
        }

        /// Commit `n` bytes written into the prepared regions.
        pub fn commit(&mut self, n: usize) {
            self.p.commit(n)
        }

        /// Signal that no more input will ever arrive.
        pub fn commit_eof(&mut self) {
            self.p.commit_eof()
        }

        /// Advance the state machine as far as the input allows.
        ///
        /// `Ok(())` means the current message is complete. A `NeedData`
        /// error is recoverable (commit more input and call again), as
        /// is `InPlaceOverflow` (consume body bytes first). Everything
        /// else is terminal for the message.
        pub fn parse(&mut self) -> Result<()> {
            self.p.parse()
        }

        /// True once the full header section has been parsed.
        pub fn got_header(&self) -> bool {
            self.p.got_header()
        }

        /// True once the current message is complete.
        pub fn is_complete(&self) -> bool {
            self.p.is_complete()
        }

        /// True when parsing can no longer continue on this stream.
        pub fn is_end_of_stream(&self) -> bool {
            self.p.is_end_of_stream()
        }

        /// Attach an elastic buffer that receives the decoded body.
        pub fn set_body(&mut self, buf: BytesMut) {
            self.p.set_body(buf)
        }

        /// Recover the elastic body buffer.
        pub fn take_body(&mut self) -> BytesMut {
            self.p.take_body()
        }

        /// Attach a sink that receives the decoded body in chunks.
        pub fn set_body_sink<S: Sink + 'static>(&mut self, sink: S) -> Result<()> {
            self.p.set_body_sink(sink)
        }

        /// Override the configured body limit for this message only.
        pub fn set_body_limit(&mut self, n: u64) {
            self.p.set_body_limit(n)
        }

        /// The decoded body bytes available in place.
        pub fn pull_body(&self) -> &[u8] {
            self.p.pull_body()
        }

        /// Mark `n` pulled body bytes as consumed.
        pub fn consume_body(&mut self, n: usize) {
            self.p.consume_body(n)
        }

        /// The complete in-place body, if never consumed.
        pub fn body(&self) -> &[u8] {
            self.p.body()
        }

        /// Any bytes lying past the end of the parsed message, for
        /// tunnels and protocol upgrades.
        pub fn release_buffered_data(&mut self) -> Bytes {
            self.p.release_buffered_data()
        }
    };
}

/// An incremental parser for HTTP/1 requests.
#[derive(Debug)]
pub struct RequestParser {
    p: ParserCore,
}

impl RequestParser {
    pub fn new(cfg: Config) -> RequestParser {
        RequestParser {
            p: ParserCore::new(HeaderKind::Request, cfg),
        }
    }

    /// The parsed request header, once available.
    pub fn get(&self) -> Option<RequestView<'_>> {
        self.p.h.as_ref().map(RequestView::new)
    }

    forward_parser_api!();
}

impl Default for RequestParser {
    fn default() -> RequestParser {
        RequestParser::new(Config::default())
    }
}

/// An incremental parser for HTTP/1 responses.
#[derive(Debug)]
pub struct ResponseParser {
    p: ParserCore,
}

impl ResponseParser {
    pub fn new(cfg: Config) -> ResponseParser {
        ResponseParser {
            p: ParserCore::new(HeaderKind::Response, cfg),
        }
    }

    /// Prepare for a response to a HEAD request: the next message has
    /// no body regardless of its framing fields.
    pub fn start_head_response(&mut self) {
        self.p.start_impl(true)
    }

    /// The parsed response header, once available.
    pub fn get(&self) -> Option<ResponseView<'_>> {
        self.p.h.as_ref().map(ResponseView::new)
    }

    forward_parser_api!();
}

impl Default for ResponseParser {
    fn default() -> ResponseParser {
        ResponseParser::new(Config::response())
    }
}

impl std::fmt::Debug for ParserCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("body_total", &self.body_total)
            .field("got_eof", &self.got_eof)
            .finish()
    }
}
