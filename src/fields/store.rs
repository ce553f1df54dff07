//! Header storage.
//!
//! One message's header section lives in a single allocation: the
//! canonical wire bytes at the front, and a field-index table packed in
//! reverse order at the high end of the allocation. Entry *i* sits at
//! `capacity - (i + 1) * ENTRY_SIZE`. All offsets fit the 32-bit offset
//! type. Empty stores borrow a static default buffer per kind and
//! allocate on first mutation.

use crate::error::{Error, Kind, Result};
use crate::field::FieldId;
use crate::grammar;
use crate::method::Method;
use crate::parser::HeaderLimits;
use crate::status::Status;
use crate::version::Version;

use super::metadata::Metadata;

/// Serialized size of one table entry: four offsets plus the field id.
pub(crate) const ENTRY_SIZE: usize = 20;

/// Largest representable offset into a header buffer.
pub(crate) const MAX_OFFSET: usize = u32::MAX as usize;

const DEFAULT_FIELDS: &[u8] = b"\r\n";
const DEFAULT_REQUEST: &[u8] = b"GET / HTTP/1.1\r\n\r\n";
const DEFAULT_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HeaderKind {
    Fields,
    Request,
    Response,
}

/// One decoded table entry.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Entry {
    pub name_pos: usize,
    pub name_len: usize,
    pub value_pos: usize,
    pub value_len: usize,
    pub id: FieldId,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum StartLine {
    Fields,
    Request {
        method: Method,
        method_len: usize,
        target_len: usize,
    },
    Response {
        status: Status,
        code: u16,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Header {
    kind: HeaderKind,
    buf: Option<Box<[u8]>>,
    size: usize,
    count: usize,
    prefix: usize,
    max_cap: usize,
    pub(crate) version: Version,
    pub(crate) start: StartLine,
    pub(crate) md: Metadata,
}

fn write_entry(buf: &mut [u8], i: usize, e: &Entry) {
    let at = buf.len() - (i + 1) * ENTRY_SIZE;
    let mut put = |off: usize, v: usize| {
        debug_assert!(v <= MAX_OFFSET);
        buf[at + off..at + off + 4].copy_from_slice(&(v as u32).to_le_bytes());
    };
    put(0, e.name_pos);
    put(4, e.name_len);
    put(8, e.value_pos);
    put(12, e.value_len);
    put(16, e.id.to_u32() as usize);
}

fn read_entry(buf: &[u8], i: usize) -> Entry {
    let at = buf.len() - (i + 1) * ENTRY_SIZE;
    let get = |off: usize| -> usize {
        u32::from_le_bytes([buf[at + off], buf[at + off + 1], buf[at + off + 2], buf[at + off + 3]])
            as usize
    };
    Entry {
        name_pos: get(0),
        name_len: get(4),
        value_pos: get(8),
        value_len: get(12),
        id: FieldId::from_u32(get(16) as u32),
    }
}

fn count_crlf(buf: &[u8]) -> usize {
    buf.windows(2).filter(|w| w == b"\r\n").count()
}

impl Header {
    pub(crate) fn new(kind: HeaderKind) -> Header {
        let (size, prefix, start) = match kind {
            HeaderKind::Fields => (DEFAULT_FIELDS.len(), 0, StartLine::Fields),
            HeaderKind::Request => (
                DEFAULT_REQUEST.len(),
                DEFAULT_REQUEST.len() - 2,
                StartLine::Request {
                    method: Method::Get,
                    method_len: 3,
                    target_len: 1,
                },
            ),
            HeaderKind::Response => (
                DEFAULT_RESPONSE.len(),
                DEFAULT_RESPONSE.len() - 2,
                StartLine::Response {
                    status: Status::Ok,
                    code: 200,
                },
            ),
        };
        let mut h = Header {
            kind,
            buf: None,
            size,
            count: 0,
            prefix,
            max_cap: MAX_OFFSET,
            version: Version::Http11,
            start,
            md: Metadata::default(),
        };
        h.update_payload();
        h
    }

    pub(crate) fn with_max_capacity(kind: HeaderKind, max_cap: usize) -> Header {
        let mut h = Header::new(kind);
        h.max_cap = max_cap.min(MAX_OFFSET);
        h
    }

    fn default_wire(&self) -> &'static [u8] {
        match self.kind {
            HeaderKind::Fields => DEFAULT_FIELDS,
            HeaderKind::Request => DEFAULT_REQUEST,
            HeaderKind::Response => DEFAULT_RESPONSE,
        }
    }

    //--------------------------------------------------------------
    // observers

    pub(crate) fn kind(&self) -> HeaderKind {
        self.kind
    }

    pub(crate) fn wire(&self) -> &[u8] {
        match self.buf {
            Some(ref b) => &b[..self.size],
            None => self.default_wire(),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn prefix(&self) -> usize {
        self.prefix
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buf.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    pub(crate) fn max_capacity(&self) -> usize {
        self.max_cap
    }

    pub(crate) fn entry(&self, i: usize) -> Entry {
        debug_assert!(i < self.count);
        read_entry(self.buf.as_ref().expect("entries require storage"), i)
    }

    pub(crate) fn name_bytes(&self, i: usize) -> &[u8] {
        let e = self.entry(i);
        &self.wire()[e.name_pos..e.name_pos + e.name_len]
    }

    pub(crate) fn value_bytes(&self, i: usize) -> &[u8] {
        let e = self.entry(i);
        &self.wire()[e.value_pos..e.value_pos + e.value_len]
    }

    pub(crate) fn find_name(&self, from: usize, name: &[u8]) -> Option<usize> {
        (from..self.count).find(|&i| self.name_bytes(i).eq_ignore_ascii_case(name))
    }

    pub(crate) fn find_id(&self, from: usize, id: FieldId) -> Option<usize> {
        (from..self.count).find(|&i| self.entry(i).id == id)
    }

    pub(crate) fn rfind_name(&self, before: usize, name: &[u8]) -> Option<usize> {
        (0..before.min(self.count))
            .rev()
            .find(|&i| self.name_bytes(i).eq_ignore_ascii_case(name))
    }

    pub(crate) fn rfind_id(&self, before: usize, id: FieldId) -> Option<usize> {
        (0..before.min(self.count))
            .rev()
            .find(|&i| self.entry(i).id == id)
    }

    pub(crate) fn status_code(&self) -> Option<u16> {
        match self.start {
            StartLine::Response { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the peer connection can be reused after this message.
    pub(crate) fn keep_alive(&self) -> bool {
        use super::metadata::Payload;
        match self.md.payload {
            Payload::Error | Payload::ToEof => return false,
            _ => {}
        }
        if self.md.connection.error.is_some() {
            return false;
        }
        match self.version {
            Version::Http11 => !self.md.connection.close,
            Version::Http10 => self.md.connection.keep_alive,
        }
    }

    //--------------------------------------------------------------
    // storage

    fn bytes_needed(size: usize, count: usize) -> usize {
        size + count * ENTRY_SIZE
    }

    /// Make sure owned storage exists and fits `new_size` wire bytes
    /// plus `new_count` table entries.
    fn ensure_allocated(&mut self, new_size: usize, new_count: usize) -> Result<()> {
        let need = Header::bytes_needed(new_size, new_count);
        if new_size > MAX_OFFSET || need > self.max_cap {
            return Err(Error::new(Kind::BufferOverflow));
        }
        if let Some(ref b) = self.buf {
            if b.len() >= need {
                return Ok(());
            }
        }
        let old_cap = self.capacity();
        let mut cap = old_cap.max(64);
        while cap < need {
            cap = cap.saturating_mul(2);
        }
        let cap = cap.min(self.max_cap);
        let mut nb = vec![0u8; cap].into_boxed_slice();
        match self.buf {
            Some(ref ob) => {
                nb[..self.size].copy_from_slice(&ob[..self.size]);
                for i in 0..self.count {
                    write_entry(&mut nb, i, &read_entry(ob, i));
                }
            }
            None => {
                nb[..self.size].copy_from_slice(self.default_wire());
            }
        }
        self.buf = Some(nb);
        Ok(())
    }

    pub(crate) fn reserve(&mut self, n: usize) -> Result<()> {
        if n > self.max_cap {
            return Err(Error::new(Kind::BufferOverflow));
        }
        if self.capacity() >= n {
            return Ok(());
        }
        let floor = Header::bytes_needed(self.size, self.count);
        let target_size = self.size + n.saturating_sub(floor);
        self.ensure_allocated(target_size, self.count)
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        let need = Header::bytes_needed(self.size, self.count);
        if self.capacity() <= need {
            return;
        }
        let old = self.buf.take().expect("capacity implies storage");
        let mut nb = vec![0u8; need].into_boxed_slice();
        nb[..self.size].copy_from_slice(&old[..self.size]);
        for i in 0..self.count {
            write_entry(&mut nb, i, &read_entry(&old, i));
        }
        self.buf = Some(nb);
    }

    pub(crate) fn clear(&mut self) {
        let (size, prefix, start) = match self.kind {
            HeaderKind::Fields => (DEFAULT_FIELDS.len(), 0, StartLine::Fields),
            HeaderKind::Request => (
                DEFAULT_REQUEST.len(),
                DEFAULT_REQUEST.len() - 2,
                StartLine::Request {
                    method: Method::Get,
                    method_len: 3,
                    target_len: 1,
                },
            ),
            HeaderKind::Response => (
                DEFAULT_RESPONSE.len(),
                DEFAULT_RESPONSE.len() - 2,
                StartLine::Response {
                    status: Status::Ok,
                    code: 200,
                },
            ),
        };
        self.size = size;
        self.count = 0;
        self.prefix = prefix;
        self.version = Version::Http11;
        self.start = start;
        self.md = Metadata::default();
        if let Some(ref mut b) = self.buf {
            b[..size].copy_from_slice(match self.kind {
                HeaderKind::Fields => DEFAULT_FIELDS,
                HeaderKind::Request => DEFAULT_REQUEST,
                HeaderKind::Response => DEFAULT_RESPONSE,
            });
        }
        self.update_payload();
    }

    fn entries_vec(&self) -> Vec<Entry> {
        (0..self.count).map(|i| self.entry(i)).collect()
    }

    fn write_entries(&mut self, entries: &[Entry]) {
        let buf = self.buf.as_mut().expect("entries require storage");
        for (i, e) in entries.iter().enumerate() {
            write_entry(buf, i, e);
        }
    }

    //--------------------------------------------------------------
    // metadata upkeep

    fn is_request_like(&self) -> bool {
        !matches!(self.kind, HeaderKind::Response)
    }

    fn update_payload(&mut self) {
        let is_request = self.is_request_like();
        let code = self.status_code();
        self.md.update_payload(is_request, code);
    }

    /// Rebuild the metadata record for one special field by replaying
    /// the surviving matches, then refresh the payload decision.
    fn refresh_md(&mut self, id: FieldId) {
        if !Metadata::is_special(id) {
            return;
        }
        let mut md = self.md;
        md.reset_field(id);
        for i in 0..self.count {
            if self.entry(i).id == id {
                md.apply(id, self.value_bytes(i));
            }
        }
        self.md = md;
        self.update_payload();
    }

    pub(crate) fn set_payload_override(&mut self, on: bool) {
        self.md.payload_override = on;
        if !on {
            self.update_payload();
        }
    }

    //--------------------------------------------------------------
    // field mutation

    /// Insert a field before position `index` (or append when
    /// `index == count`), writing the canonical `name ": " value CRLF`
    /// line.
    pub(crate) fn insert_at(&mut self, index: usize, name: &[u8], value: &[u8]) -> Result<()> {
        debug_assert!(index <= self.count);
        grammar::validate_token(name)?;
        grammar::validate_field_value(value)?;
        let id = FieldId::lookup(name);

        let line_len = name.len() + 2 + value.len() + 2;
        let new_size = self.size + line_len;
        self.ensure_allocated(new_size, self.count + 1)?;

        let mut entries = self.entries_vec();
        let pos = if index < self.count {
            entries[index].name_pos
        } else {
            self.size - 2
        };

        let buf = self.buf.as_mut().expect("just allocated");
        buf.copy_within(pos..self.size, pos + line_len);
        let mut at = pos;
        buf[at..at + name.len()].copy_from_slice(name);
        at += name.len();
        buf[at..at + 2].copy_from_slice(b": ");
        at += 2;
        buf[at..at + value.len()].copy_from_slice(value);
        at += value.len();
        buf[at..at + 2].copy_from_slice(b"\r\n");

        for e in entries.iter_mut() {
            if e.name_pos >= pos {
                e.name_pos += line_len;
                e.value_pos += line_len;
            }
        }
        entries.insert(
            index,
            Entry {
                name_pos: pos,
                name_len: name.len(),
                value_pos: pos + name.len() + 2,
                value_len: value.len(),
                id,
            },
        );
        self.size = new_size;
        self.count += 1;
        self.write_entries(&entries);
        self.refresh_md(id);
        Ok(())
    }

    pub(crate) fn append(&mut self, name: &[u8], value: &[u8]) -> Result<()> {
        self.insert_at(self.count, name, value)
    }

    /// Remove the field at `index`.
    pub(crate) fn erase_at(&mut self, index: usize) {
        debug_assert!(index < self.count);
        let mut entries = self.entries_vec();
        let start = entries[index].name_pos;
        let end = if index + 1 < self.count {
            entries[index + 1].name_pos
        } else {
            self.size - 2
        };
        let line_len = end - start;
        let id = entries[index].id;

        let buf = self.buf.as_mut().expect("erase requires storage");
        buf.copy_within(end..self.size, start);

        entries.remove(index);
        for e in entries.iter_mut() {
            if e.name_pos >= start {
                e.name_pos -= line_len;
                e.value_pos -= line_len;
            }
        }
        self.size -= line_len;
        self.count -= 1;
        self.write_entries(&entries);
        self.refresh_md(id);
    }

    /// Replace the value of the field at `index`, rewriting the line in
    /// canonical form; the name spelling and position are kept.
    pub(crate) fn set_value_at(&mut self, index: usize, value: &[u8]) -> Result<()> {
        debug_assert!(index < self.count);
        // validate and reserve up front so the erase/insert pair
        // cannot fail halfway and lose the field
        grammar::validate_field_value(value)?;
        let name = self.name_bytes(index).to_vec();
        self.ensure_allocated(self.size + name.len() + value.len() + 4, self.count + 1)?;
        self.erase_at(index);
        self.insert_at(index, &name, value)
    }

    /// Replace every field matching `name` with a single one, or append
    /// it if absent.
    pub(crate) fn set_name(&mut self, name: &[u8], value: &[u8]) -> Result<()> {
        match self.find_name(0, name) {
            None => self.append(name, value),
            Some(i) => {
                self.set_value_at(i, value)?;
                while let Some(j) = self.find_name(i + 1, name) {
                    self.erase_at(j);
                }
                Ok(())
            }
        }
    }

    pub(crate) fn set_id(&mut self, id: FieldId, value: &[u8]) -> Result<()> {
        let name = id.name().ok_or_else(|| Error::new(Kind::BadFieldName))?;
        match self.find_id(0, id) {
            None => self.append(name.as_bytes(), value),
            Some(i) => {
                self.set_value_at(i, value)?;
                while let Some(j) = self.find_id(i + 1, id) {
                    self.erase_at(j);
                }
                Ok(())
            }
        }
    }

    pub(crate) fn erase_name(&mut self, name: &[u8]) -> usize {
        let mut n = 0;
        while let Some(i) = self.find_name(0, name) {
            self.erase_at(i);
            n += 1;
        }
        n
    }

    pub(crate) fn erase_id(&mut self, id: FieldId) -> usize {
        let mut n = 0;
        while let Some(i) = self.find_id(0, id) {
            self.erase_at(i);
            n += 1;
        }
        n
    }

    //--------------------------------------------------------------
    // start line

    fn set_prefix(&mut self, line: &[u8]) -> Result<()> {
        let old = self.prefix;
        let new_size = self.size - old + line.len();
        self.ensure_allocated(new_size.max(self.size), self.count)?;

        // the table still holds pre-move offsets; fix them up
        // arithmetically since every field sits after the prefix
        let mut entries = self.entries_vec();
        for e in entries.iter_mut() {
            e.name_pos = e.name_pos - old + line.len();
            e.value_pos = e.value_pos - old + line.len();
        }

        let buf = self.buf.as_mut().expect("just allocated");
        buf.copy_within(old..self.size, line.len());
        buf[..line.len()].copy_from_slice(line);

        self.size = new_size;
        self.prefix = line.len();
        self.write_entries(&entries);
        Ok(())
    }

    pub(crate) fn set_request_line(
        &mut self,
        method_text: &[u8],
        target: &[u8],
        version: Version,
    ) -> Result<()> {
        debug_assert!(matches!(self.kind, HeaderKind::Request));
        grammar::validate_token(method_text).map_err(|_| Error::new(Kind::BadMethod))?;
        if target.is_empty() || !target.iter().all(|&b| grammar::is_target_char(b)) {
            return Err(Error::new(Kind::BadRequestTarget));
        }
        let mut line = Vec::with_capacity(method_text.len() + target.len() + 12);
        line.extend_from_slice(method_text);
        line.push(b' ');
        line.extend_from_slice(target);
        line.push(b' ');
        line.extend_from_slice(version.as_str().as_bytes());
        line.extend_from_slice(b"\r\n");
        self.set_prefix(&line)?;
        self.version = version;
        self.start = StartLine::Request {
            method: Method::from_bytes(method_text),
            method_len: method_text.len(),
            target_len: target.len(),
        };
        self.update_payload();
        Ok(())
    }

    pub(crate) fn set_status_line(
        &mut self,
        code: u16,
        reason: Option<&[u8]>,
        version: Version,
    ) -> Result<()> {
        debug_assert!(matches!(self.kind, HeaderKind::Response));
        if !(100..=999).contains(&code) {
            return Err(Error::new(Kind::BadStatusCode));
        }
        let reason_bytes: &[u8] = match reason {
            Some(r) => {
                for &b in r {
                    if !grammar::is_field_vchar(b) && !grammar::is_ows(b) {
                        return Err(Error::new(Kind::BadReason));
                    }
                }
                r
            }
            None => crate::status::reason_phrase(code).as_bytes(),
        };
        let mut code_buf = itoa::Buffer::new();
        let code_str = code_buf.format(code);
        let mut line = Vec::with_capacity(13 + reason_bytes.len());
        line.extend_from_slice(version.as_str().as_bytes());
        line.push(b' ');
        line.extend_from_slice(code_str.as_bytes());
        line.push(b' ');
        line.extend_from_slice(reason_bytes);
        line.extend_from_slice(b"\r\n");
        self.set_prefix(&line)?;
        self.version = version;
        self.start = StartLine::Response {
            status: Status::from_code(code),
            code,
        };
        self.update_payload();
        Ok(())
    }

    //--------------------------------------------------------------
    // framing convenience

    pub(crate) fn set_content_length(&mut self, n: u64) -> Result<()> {
        let mut buf = itoa::Buffer::new();
        self.set_id(FieldId::ContentLength, buf.format(n).as_bytes())
    }

    /// Set `Content-Length: n` and drop any terminal `chunked` coding.
    pub(crate) fn set_payload_size(&mut self, n: u64) -> Result<()> {
        self.set_content_length(n)?;
        self.set_chunked(false)
    }

    /// Add or remove the terminal `chunked` transfer coding. Other
    /// codings are preserved.
    pub(crate) fn set_chunked(&mut self, value: bool) -> Result<()> {
        if value {
            if !self.md.transfer_encoding.is_chunked {
                self.append(b"Transfer-Encoding", b"chunked")?;
            }
            return Ok(());
        }
        if !self.md.transfer_encoding.is_chunked {
            return Ok(());
        }
        let i = self
            .rfind_id(self.count, FieldId::TransferEncoding)
            .expect("is_chunked implies a Transfer-Encoding field");
        let value = self.value_bytes(i).to_vec();
        let mut elems: Vec<Vec<u8>> = grammar::ListIter::new(&value)
            .map(|e| e.to_vec())
            .collect();
        // is_chunked guarantees the final element is "chunked"
        elems.pop();
        if elems.is_empty() {
            self.erase_at(i);
            Ok(())
        } else {
            let mut joined = Vec::new();
            for (k, e) in elems.iter().enumerate() {
                if k > 0 {
                    joined.extend_from_slice(b", ");
                }
                joined.extend_from_slice(e);
            }
            self.set_value_at(i, &joined)
        }
    }

    /// Remove one token from every Connection field, dropping fields
    /// that become empty.
    fn erase_connection_token(&mut self, token: &[u8]) -> Result<()> {
        let mut i = 0;
        while let Some(j) = self.find_id(i, FieldId::Connection) {
            let value = self.value_bytes(j).to_vec();
            let kept: Vec<Vec<u8>> = grammar::ListIter::new(&value)
                .filter(|e| !e.eq_ignore_ascii_case(token))
                .map(|e| e.to_vec())
                .collect();
            let total = grammar::ListIter::new(&value).count();
            if kept.len() == total {
                i = j + 1;
                continue;
            }
            if kept.is_empty() {
                self.erase_at(j);
                i = j;
            } else {
                let mut joined = Vec::new();
                for (k, e) in kept.iter().enumerate() {
                    if k > 0 {
                        joined.extend_from_slice(b", ");
                    }
                    joined.extend_from_slice(e);
                }
                self.set_value_at(j, &joined)?;
                i = j + 1;
            }
        }
        Ok(())
    }

    /// Maintain the Connection header so the message keeps the peer
    /// connection open (or not), respecting the protocol version's
    /// default.
    pub(crate) fn set_keep_alive(&mut self, value: bool) -> Result<()> {
        if self.md.connection.error.is_some() {
            return Err(Error::new(Kind::BadConnection));
        }
        if self.md.connection.count == 0 {
            match self.version {
                Version::Http11 => {
                    if !value {
                        self.set_id(FieldId::Connection, b"close")?;
                    }
                }
                Version::Http10 => {
                    if value {
                        self.set_id(FieldId::Connection, b"keep-alive")?;
                    }
                }
            }
            return Ok(());
        }
        if value {
            if self.md.connection.close {
                self.erase_connection_token(b"close")?;
            }
        } else if self.md.connection.keep_alive {
            self.erase_connection_token(b"keep-alive")?;
        }
        match self.version {
            Version::Http11 => {
                if !value && !self.md.connection.close {
                    self.append(b"Connection", b"close")?;
                }
            }
            Version::Http10 => {
                if value && !self.md.connection.keep_alive {
                    self.append(b"Connection", b"keep-alive")?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn set_expect_100_continue(&mut self, value: bool) -> Result<()> {
        if value {
            self.set_id(FieldId::Expect, b"100-continue")
        } else {
            self.erase_id(FieldId::Expect);
            Ok(())
        }
    }

    //--------------------------------------------------------------
    // parsing

    /// Build a header from a complete, already-delimited section.
    ///
    /// `input` must span the start line (absent for bare fields)
    /// through the terminating CRLF. Obs-folds are normalized into the
    /// stored copy; `input` itself is untouched.
    pub(crate) fn parse_install(
        kind: HeaderKind,
        input: &[u8],
        limits: &HeaderLimits,
    ) -> Result<Header> {
        if input.len() > MAX_OFFSET {
            return Err(Error::new(Kind::BufferOverflow));
        }
        if input.len() > limits.max_size {
            return Err(Error::new(Kind::HeadersLimit));
        }
        let nlines = count_crlf(input);
        let cap = Header::bytes_needed(input.len(), nlines);
        let mut data = vec![0u8; cap].into_boxed_slice();
        data[..input.len()].copy_from_slice(input);
        let size = input.len();

        let (prefix, start, version) = match kind {
            HeaderKind::Fields => (0, StartLine::Fields, Version::Http11),
            HeaderKind::Request => {
                let line = grammar::parse_request_line(&data[..size])?;
                if line.len > limits.max_start_line {
                    return Err(Error::new(Kind::StartLineLimit));
                }
                let method = Method::from_bytes(&data[..line.method_len]);
                (
                    line.len,
                    StartLine::Request {
                        method,
                        method_len: line.method_len,
                        target_len: line.target.len(),
                    },
                    line.version,
                )
            }
            HeaderKind::Response => {
                let line = grammar::parse_status_line(&data[..size])?;
                if line.len > limits.max_start_line {
                    return Err(Error::new(Kind::StartLineLimit));
                }
                (
                    line.len,
                    StartLine::Response {
                        status: Status::from_code(line.code),
                        code: line.code,
                    },
                    line.version,
                )
            }
        };

        let mut md = Metadata::default();
        let mut entries: Vec<Entry> = Vec::new();
        let mut pos = prefix;
        loop {
            match grammar::parse_field_line(&mut data[..size], pos)? {
                None => {
                    pos += 2;
                    break;
                }
                Some(line) => {
                    if line.len > limits.max_field {
                        return Err(Error::new(Kind::FieldSizeLimit));
                    }
                    if entries.len() >= limits.max_fields {
                        return Err(Error::new(Kind::FieldsLimit));
                    }
                    let id = FieldId::lookup(&data[line.name.clone()]);
                    md.apply(id, &data[line.value.clone()]);
                    entries.push(Entry {
                        name_pos: line.name.start,
                        name_len: line.name.end - line.name.start,
                        value_pos: line.value.start,
                        value_len: line.value.end - line.value.start,
                        id,
                    });
                    pos += line.len;
                }
            }
        }
        if pos != size {
            return Err(Error::new(Kind::BadLineEnding));
        }

        for (i, e) in entries.iter().enumerate() {
            write_entry(&mut data, i, e);
        }
        md.update_payload(
            !matches!(kind, HeaderKind::Response),
            match start {
                StartLine::Response { code, .. } => Some(code),
                _ => None,
            },
        );
        Ok(Header {
            kind,
            buf: Some(data),
            size,
            count: entries.len(),
            prefix,
            max_cap: MAX_OFFSET,
            version,
            start,
            md,
        })
    }

    /// Parse a trailer block (`*( field-line CRLF ) CRLF`) and append
    /// its fields.
    pub(crate) fn append_trailers(&mut self, block: &[u8], limits: &HeaderLimits) -> Result<()> {
        let mut scratch = block.to_vec();
        let mut pos = 0;
        loop {
            match grammar::parse_field_line(&mut scratch, pos)? {
                None => return Ok(()),
                Some(line) => {
                    if line.len > limits.max_field {
                        return Err(Error::new(Kind::FieldSizeLimit));
                    }
                    if self.count >= limits.max_fields {
                        return Err(Error::new(Kind::FieldsLimit));
                    }
                    let name = scratch[line.name.clone()].to_vec();
                    let value = scratch[line.value.clone()].to_vec();
                    self.append(&name, &value)?;
                    pos += line.len;
                }
            }
        }
    }
}
