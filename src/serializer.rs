//! The message serializer.
//!
//! Turns a header plus a body representation into a sequence of byte
//! ranges. The header octets and any generated framing are staged in
//! an internal buffer; in-memory bodies are emitted zero-copy. The
//! cycle is `start* → (prepare → consume)* → is_done`, then `reset`
//! for the next message.

use std::io::Write as _;

use bytes::Bytes;
use tracing::trace;

use crate::body::{BodyFilter, Source};
use crate::coding::{DeflateFilter, DEFLATE_RESERVE};
use crate::error::{Error, Kind, Result};
use crate::fields::metadata::{Encoding, Payload};
use crate::fields::store::HeaderKind;
use crate::fields::{AsFieldsView, Fields};
use crate::workspace::{Workspace, WsSlot};

/// Serializer configuration, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Staging-buffer size: the largest body batch framed per
    /// `prepare`.
    pub buffer_size: usize,
    /// Space reserved for type-erased sources and filters.
    pub max_type_erase: usize,
    /// Compress bodies whose effective encoding is `deflate`.
    pub apply_deflate_encoder: bool,
    /// Compress bodies whose effective encoding is `gzip`.
    pub apply_gzip_encoder: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            buffer_size: 16 * 1024,
            max_type_erase: 1024,
            apply_deflate_encoder: false,
            apply_gzip_encoder: false,
        }
    }
}

/// Read-only output regions returned from [`Serializer::prepare`].
///
/// The regions form a prefix of the remaining wire bytes, in order.
#[derive(Debug)]
pub struct OutputBuffers<'a> {
    slices: [&'a [u8]; MAX_OUT],
    len: usize,
}

const MAX_OUT: usize = 8;

impl<'a> OutputBuffers<'a> {
    fn new() -> OutputBuffers<'a> {
        OutputBuffers {
            slices: [&[]; MAX_OUT],
            len: 0,
        }
    }

    // false if a non-empty slice was dropped because all slots are
    // taken; the caller must then hold back everything that follows
    fn push(&mut self, s: &'a [u8]) -> bool {
        if s.is_empty() {
            return true;
        }
        if self.len == MAX_OUT {
            return false;
        }
        self.slices[self.len] = s;
        self.len += 1;
        true
    }

    /// The byte ranges, in wire order.
    pub fn slices(&self) -> &[&'a [u8]] {
        &self.slices[..self.len]
    }

    pub fn total(&self) -> usize {
        self.slices().iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    /// Frame each staged batch as one chunk.
    Chunked,
    /// Emit raw bytes, enforcing the declared length.
    Length(u64),
    /// Emit raw bytes until the representation ends.
    Untracked,
}

enum BodyRep {
    Empty,
    /// Zero-copy slices (only without a compression filter).
    Buffers,
    Source,
    Stream,
}

/// Serializes HTTP/1 messages.
pub struct Serializer {
    cfg: Config,
    ws: Workspace,
    codec_reserved: bool,

    started: bool,
    // staged header + framed body bytes, drained from out_pos
    out: Vec<u8>,
    out_pos: usize,
    header_end: usize,
    // zero-copy body
    slices: Vec<Bytes>,
    slice_idx: usize,
    slice_off: usize,
    // staged bytes that follow the zero-copy region
    tail: Vec<u8>,
    tail_pos: usize,

    rep: BodyRep,
    framing: Framing,
    finished_framing: bool,
    source_slot: Option<WsSlot>,
    source_done: bool,
    filter_slot: Option<WsSlot>,
    filter_finished: bool,

    // interactive stream input
    sbuf: Box<[u8]>,
    slen: usize,
    stream_closed: bool,

    paused: bool,
    trailers: Option<Fields>,

    scratch_in: Box<[u8]>,
    scratch_out: Box<[u8]>,
}

impl Serializer {
    pub fn new(cfg: Config) -> Serializer {
        let ws_cap = cfg.max_type_erase
            + if cfg.apply_deflate_encoder || cfg.apply_gzip_encoder {
                DEFLATE_RESERVE + 64
            } else {
                0
            };
        Serializer {
            cfg,
            ws: Workspace::new(ws_cap),
            codec_reserved: false,
            started: false,
            out: Vec::new(),
            out_pos: 0,
            header_end: 0,
            slices: Vec::new(),
            slice_idx: 0,
            slice_off: 0,
            tail: Vec::new(),
            tail_pos: 0,
            rep: BodyRep::Empty,
            framing: Framing::Untracked,
            finished_framing: false,
            source_slot: None,
            source_done: false,
            filter_slot: None,
            filter_finished: false,
            sbuf: vec![0; cfg.buffer_size].into_boxed_slice(),
            slen: 0,
            stream_closed: false,
            paused: false,
            trailers: None,
            scratch_in: vec![0; cfg.buffer_size].into_boxed_slice(),
            scratch_out: vec![0; cfg.buffer_size].into_boxed_slice(),
        }
    }

    /// Attach trailer fields, emitted after the last chunk of a
    /// chunked body. Must be called before `start`.
    pub fn set_trailers(&mut self, trailers: Fields) {
        debug_assert!(!self.started, "trailers must be attached before start()");
        self.trailers = Some(trailers);
    }

    /// Prepare for the next message.
    pub fn reset(&mut self) {
        self.ws.clear();
        self.started = false;
        self.out.clear();
        self.out_pos = 0;
        self.header_end = 0;
        self.slices.clear();
        self.slice_idx = 0;
        self.slice_off = 0;
        self.tail.clear();
        self.tail_pos = 0;
        self.rep = BodyRep::Empty;
        self.framing = Framing::Untracked;
        self.finished_framing = false;
        self.source_slot = None;
        self.source_done = false;
        self.filter_slot = None;
        self.filter_finished = false;
        self.slen = 0;
        self.stream_closed = false;
        self.paused = false;
        self.trailers = None;
    }

    //--------------------------------------------------------------
    // start variants

    /// Start a message with no body.
    pub fn start(&mut self, msg: &impl AsFieldsView) -> Result<()> {
        self.start_init(msg, BodyRep::Empty)?;
        self.finalize_empty()
    }

    /// Start a response to a HEAD request: the header is emitted, the
    /// body octets are suppressed regardless of the framing fields.
    pub fn start_head(&mut self, msg: &impl AsFieldsView) -> Result<()> {
        self.start_init(msg, BodyRep::Empty)?;
        self.framing = Framing::Untracked;
        self.finished_framing = true;
        Ok(())
    }

    /// Start a message whose body is already in memory; the slices are
    /// emitted zero-copy unless a compression filter applies.
    pub fn start_buffers(&mut self, msg: &impl AsFieldsView, body: Vec<Bytes>) -> Result<()> {
        self.start_init(msg, BodyRep::Buffers)?;
        if self.filter_slot.is_some() {
            // compressed output cannot alias the caller's buffers
            let source = SliceSource {
                slices: body,
                idx: 0,
                off: 0,
            };
            let slot = self
                .ws
                .emplace_sized::<Box<dyn Source>>(Box::new(source), std::mem::size_of::<SliceSource>())?;
            self.source_slot = Some(slot);
            self.rep = BodyRep::Source;
            return Ok(());
        }
        let total: u64 = body.iter().map(|b| b.len() as u64).sum();
        match self.framing {
            Framing::Length(n) => {
                if total > n {
                    return Err(Error::new(Kind::BodyTooLarge));
                }
                if total < n {
                    return Err(Error::new(Kind::Incomplete));
                }
            }
            Framing::Chunked => {
                if total > 0 {
                    write!(self.out, "{:X}\r\n", total).expect("vec write");
                }
            }
            Framing::Untracked => {}
        }
        self.slices = body;
        if matches!(self.framing, Framing::Chunked) {
            if total > 0 {
                self.tail.extend_from_slice(b"\r\n");
            }
            self.stage_last_chunk();
        }
        self.finished_framing = true;
        Ok(())
    }

    /// Start a message whose body is pulled from a source.
    pub fn start_source<S: Source + 'static>(
        &mut self,
        msg: &impl AsFieldsView,
        source: S,
    ) -> Result<()> {
        self.start_init(msg, BodyRep::Source)?;
        let boxed: Box<dyn Source> = Box::new(source);
        let slot = self.ws.emplace_sized(boxed, std::mem::size_of::<S>())?;
        self.source_slot = Some(slot);
        Ok(())
    }

    /// Start a message whose body arrives interactively through
    /// `stream_prepare`/`stream_commit`/`stream_close`.
    pub fn start_stream(&mut self, msg: &impl AsFieldsView) -> Result<()> {
        self.start_init(msg, BodyRep::Stream)
    }

    fn start_init(&mut self, msg: &impl AsFieldsView, rep: BodyRep) -> Result<()> {
        debug_assert!(!self.started, "reset() before starting a new message");
        let view = msg.as_fields_view();
        let h = view.h;
        let md = &h.md;

        self.started = true;
        self.rep = rep;
        self.out.extend_from_slice(h.wire());
        self.header_end = self.out.len();

        self.framing = if md.transfer_encoding.is_chunked {
            Framing::Chunked
        } else {
            match md.payload {
                Payload::Size(n) => Framing::Length(n),
                _ => Framing::Untracked,
            }
        };

        // compression applies when configured and declared
        let filter = match md.transfer_encoding.encoding {
            Encoding::Deflate if self.cfg.apply_deflate_encoder => Some(DeflateFilter::zlib()),
            Encoding::Gzip if self.cfg.apply_gzip_encoder => Some(DeflateFilter::gzip()),
            _ => None,
        };
        if let Some(f) = filter {
            if !self.codec_reserved {
                self.ws.reserve_front(DEFLATE_RESERVE)?;
                self.codec_reserved = true;
            }
            let boxed: Box<dyn BodyFilter> = Box::new(f);
            let slot = self
                .ws
                .emplace_sized(boxed, std::mem::size_of::<DeflateFilter>())?;
            self.filter_slot = Some(slot);
        }

        // a request carrying Expect: 100-continue pauses after the
        // header until resume()
        self.paused = h.kind() == HeaderKind::Request
            && md.expect.is_100_continue
            && !matches!(self.rep, BodyRep::Empty);

        trace!(framing = ?self.framing, paused = self.paused, "serializer started");
        Ok(())
    }

    fn finalize_empty(&mut self) -> Result<()> {
        match self.framing {
            Framing::Length(n) if n > 0 => return Err(Error::new(Kind::Incomplete)),
            Framing::Chunked => self.stage_last_chunk(),
            _ => {}
        }
        self.finished_framing = true;
        Ok(())
    }

    fn stage_last_chunk(&mut self) {
        self.tail.extend_from_slice(b"0\r\n");
        match self.trailers {
            Some(ref t) => self.tail.extend_from_slice(t.buffer()),
            None => self.tail.extend_from_slice(b"\r\n"),
        }
    }

    //--------------------------------------------------------------
    // interactive stream input

    /// Free space in the stream buffer.
    pub fn stream_capacity(&self) -> usize {
        debug_assert!(matches!(self.rep, BodyRep::Stream));
        self.sbuf.len() - self.slen
    }

    /// The writable region of the stream buffer.
    pub fn stream_prepare(&mut self) -> &mut [u8] {
        debug_assert!(matches!(self.rep, BodyRep::Stream));
        &mut self.sbuf[self.slen..]
    }

    /// Commit `n` bytes written into the stream buffer.
    pub fn stream_commit(&mut self, n: usize) {
        debug_assert!(self.slen + n <= self.sbuf.len());
        self.slen += n;
    }

    /// Declare the interactive body finished.
    pub fn stream_close(&mut self) {
        debug_assert!(matches!(self.rep, BodyRep::Stream));
        self.stream_closed = true;
    }

    //--------------------------------------------------------------
    // output

    /// The next prefix of wire bytes.
    ///
    /// With `Expect: 100-continue`, once the header bytes have been
    /// consumed this returns the `ExpectContinue` signal until
    /// [`resume`](Serializer::resume) is called.
    pub fn prepare(&mut self) -> Result<OutputBuffers<'_>> {
        debug_assert!(self.started, "prepare() before start()");
        if self.paused {
            if self.out_pos >= self.header_end {
                return Err(Error::new(Kind::ExpectContinue));
            }
            let mut o = OutputBuffers::new();
            o.push(&self.out[self.out_pos..self.header_end]);
            return Ok(o);
        }
        self.refill()?;

        let mut o = OutputBuffers::new();
        let mut in_order = o.push(&self.out[self.out_pos..]);
        if in_order && self.slice_idx < self.slices.len() {
            in_order = o.push(&self.slices[self.slice_idx][self.slice_off..]);
            for s in &self.slices[self.slice_idx + 1..] {
                if !in_order {
                    break;
                }
                in_order = o.push(s);
            }
        }
        if in_order {
            // the trailing stage may only follow a complete body
            o.push(&self.tail[self.tail_pos..]);
        }
        Ok(o)
    }

    /// Continue after the peer's interim response to
    /// `Expect: 100-continue`.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Commit the first `n` prepared bytes as sent.
    pub fn consume(&mut self, mut n: usize) {
        let head = self.out.len() - self.out_pos;
        let take = head.min(n);
        self.out_pos += take;
        n -= take;

        while n > 0 && self.slice_idx < self.slices.len() {
            let rem = self.slices[self.slice_idx].len() - self.slice_off;
            let take = rem.min(n);
            self.slice_off += take;
            n -= take;
            if self.slice_off == self.slices[self.slice_idx].len() {
                self.slice_idx += 1;
                self.slice_off = 0;
            }
        }

        let rem = self.tail.len() - self.tail_pos;
        let take = rem.min(n);
        self.tail_pos += take;
        n -= take;
        debug_assert_eq!(n, 0, "consumed more than prepared");

        // reclaim the staging buffer once drained
        if self.out_pos == self.out.len() {
            self.out.clear();
            self.out_pos = 0;
            self.header_end = 0;
        }
    }

    /// True when every byte of the message has been produced and
    /// consumed.
    pub fn is_done(&self) -> bool {
        self.started
            && !self.paused
            && self.finished_framing
            && self.out_pos >= self.out.len()
            && self.slice_idx >= self.slices.len()
            && self.tail_pos >= self.tail.len()
    }

    //--------------------------------------------------------------
    // body staging

    // Pull from the active representation into `out`, framing as
    // needed, until a batch is staged or input dries up.
    fn refill(&mut self) -> Result<()> {
        if self.finished_framing {
            return Ok(());
        }
        match self.rep {
            BodyRep::Empty | BodyRep::Buffers => Ok(()),
            BodyRep::Source => self.refill_from_source(),
            BodyRep::Stream => self.refill_from_stream(),
        }
    }

    fn refill_from_source(&mut self) -> Result<()> {
        let slot = self.source_slot.expect("source attached");
        while self.out.len() - self.out_pos < self.cfg.buffer_size && !self.finished_framing {
            if !self.source_done {
                let source = self.ws.get_mut::<Box<dyn Source>>(slot);
                let r = source.read(&mut self.scratch_in)?;
                if r.finished {
                    self.source_done = true;
                }
                if r.bytes == 0 && !r.finished {
                    // cooperative source has nothing right now
                    break;
                }
                self.emit_payload_from_scratch_in(r.bytes)?;
            }
            if self.source_done {
                self.finish_payload()?;
                break;
            }
        }
        Ok(())
    }

    fn refill_from_stream(&mut self) -> Result<()> {
        if self.slen > 0 && self.out.len() - self.out_pos < self.cfg.buffer_size {
            let n = self.slen;
            self.scratch_in[..n].copy_from_slice(&self.sbuf[..n]);
            self.slen = 0;
            self.emit_payload_from_scratch_in(n)?;
        }
        if self.stream_closed && self.slen == 0 && !self.finished_framing {
            self.finish_payload()?;
        }
        Ok(())
    }

    // Frame (and possibly compress) scratch_in[..n] into `out`.
    fn emit_payload_from_scratch_in(&mut self, n: usize) -> Result<()> {
        if self.filter_slot.is_none() {
            self.track_length(n)?;
            if n > 0 {
                if self.framing == Framing::Chunked {
                    write!(self.out, "{:X}\r\n", n).expect("vec write");
                }
                let take = &self.scratch_in[..n];
                self.out.extend_from_slice(take);
                if self.framing == Framing::Chunked {
                    self.out.extend_from_slice(b"\r\n");
                }
            }
            return Ok(());
        }
        let slot = self.filter_slot.expect("checked above");
        let mut pos = 0;
        loop {
            let filter = self.ws.get_mut::<Box<dyn BodyFilter>>(slot);
            let r = filter.process(&mut self.scratch_out, &self.scratch_in[pos..n], true)?;
            pos += r.in_bytes;
            if r.out_bytes > 0 {
                self.track_length(r.out_bytes)?;
                if self.framing == Framing::Chunked {
                    write!(self.out, "{:X}\r\n", r.out_bytes).expect("vec write");
                }
                // split borrow: copy out of scratch_out
                let out_len = r.out_bytes;
                let tmp = &self.scratch_out[..out_len];
                self.out.extend_from_slice(tmp);
                if self.framing == Framing::Chunked {
                    self.out.extend_from_slice(b"\r\n");
                }
            }
            if pos >= n && r.out_bytes == 0 {
                break;
            }
            if r.in_bytes == 0 && r.out_bytes == 0 {
                break;
            }
        }
        Ok(())
    }

    // End of the representation: drain the filter and stage the
    // terminator.
    fn finish_payload(&mut self) -> Result<()> {
        if let Some(slot) = self.filter_slot {
            while !self.filter_finished {
                let filter = self.ws.get_mut::<Box<dyn BodyFilter>>(slot);
                let r = filter.process(&mut self.scratch_out, &[], false)?;
                if r.out_bytes > 0 {
                    self.track_length(r.out_bytes)?;
                    if self.framing == Framing::Chunked {
                        write!(self.out, "{:X}\r\n", r.out_bytes).expect("vec write");
                    }
                    let out_len = r.out_bytes;
                    let tmp = &self.scratch_out[..out_len];
                    self.out.extend_from_slice(tmp);
                    if self.framing == Framing::Chunked {
                        self.out.extend_from_slice(b"\r\n");
                    }
                }
                if r.finished {
                    self.filter_finished = true;
                } else if r.out_bytes == 0 {
                    return Err(Error::new(Kind::BadPayload));
                }
            }
        }
        if let Framing::Length(rem) = self.framing {
            if rem > 0 {
                return Err(Error::new(Kind::Incomplete));
            }
        }
        if self.framing == Framing::Chunked {
            self.stage_last_chunk();
        }
        self.finished_framing = true;
        trace!("payload finished");
        Ok(())
    }

    fn track_length(&mut self, n: usize) -> Result<()> {
        if let Framing::Length(ref mut rem) = self.framing {
            let n = n as u64;
            if n > *rem {
                return Err(Error::new(Kind::BodyTooLarge));
            }
            *rem -= n;
        }
        Ok(())
    }
}

/// A source over a sequence of in-memory buffers.
struct SliceSource {
    slices: Vec<Bytes>,
    idx: usize,
    off: usize,
}

impl Source for SliceSource {
    fn read(&mut self, dest: &mut [u8]) -> Result<crate::body::SourceRead> {
        let mut n = 0;
        while n < dest.len() && self.idx < self.slices.len() {
            let s = &self.slices[self.idx];
            let take = (s.len() - self.off).min(dest.len() - n);
            dest[n..n + take].copy_from_slice(&s[self.off..self.off + take]);
            n += take;
            self.off += take;
            if self.off == s.len() {
                self.idx += 1;
                self.off = 0;
            }
        }
        Ok(crate::body::SourceRead {
            bytes: n,
            finished: self.idx >= self.slices.len(),
        })
    }
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("started", &self.started)
            .field("framing", &self.framing)
            .field("paused", &self.paused)
            .field("done", &self.is_done())
            .finish()
    }
}
