//! Header containers and views.
//!
//! A container owns one message's header section in canonical wire form
//! (see [`store`] for the layout). [`Fields`] is a bare field section;
//! [`Request`] and [`Response`] add a start line and deref to `Fields`
//! for everything else. Views are cheap read-only borrows handed out by
//! the containers and by the parser; any mutation invalidates them
//! (enforced by the borrow checker).

pub(crate) mod metadata;
pub(crate) mod store;

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::Result;
use crate::field::FieldId;
use crate::method::Method;
use crate::parser::HeaderLimits;
use crate::status::Status;
use crate::version::Version;

pub use self::metadata::{
    ConnectionMd, ContentLengthMd, Encoding, ExpectMd, Metadata, Payload, TransferEncodingMd,
    UpgradeMd,
};

pub(crate) use self::store::{Header, HeaderKind};

// Field names and methods are tokens, so this cannot fail for stored
// bytes.
fn token_str(b: &[u8]) -> &str {
    std::str::from_utf8(b).expect("stored tokens are ASCII")
}

/// One field of a header section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field<'a> {
    /// The well-known id, or `Unknown`.
    pub id: FieldId,
    /// The name as it appears in the buffer.
    pub name: &'a str,
    /// The value with outer whitespace trimmed.
    pub value: &'a [u8],
}

//------------------------------------------------------------------
// views

/// Read-only view of a header section.
#[derive(Clone, Copy)]
pub struct FieldsView<'a> {
    pub(crate) h: &'a Header,
}

impl<'a> FieldsView<'a> {
    /// The canonical wire form, including the trailing CRLF.
    pub fn buffer(self) -> &'a [u8] {
        self.h.wire()
    }

    /// The number of fields.
    pub fn len(self) -> usize {
        self.h.count()
    }

    pub fn is_empty(self) -> bool {
        self.h.count() == 0
    }

    /// The field at position `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of bounds.
    pub fn field(self, i: usize) -> Field<'a> {
        assert!(i < self.h.count(), "field index out of bounds");
        let e = self.h.entry(i);
        Field {
            id: e.id,
            name: token_str(self.h.name_bytes(i)),
            value: self.h.value_bytes(i),
        }
    }

    pub fn iter(self) -> Iter<'a> {
        Iter {
            v: self,
            front: 0,
            back: self.h.count(),
        }
    }

    /// The value of the first field matching `name`, case-insensitively.
    pub fn get(self, name: &str) -> Option<&'a [u8]> {
        self.find(name).map(move |i| self.h.value_bytes(i))
    }

    pub fn get_id(self, id: FieldId) -> Option<&'a [u8]> {
        self.find_id(id).map(move |i| self.h.value_bytes(i))
    }

    /// The first matching value, or `default` if absent.
    pub fn value_or(self, name: &str, default: &'a [u8]) -> &'a [u8] {
        self.get(name).unwrap_or(default)
    }

    pub fn exists(self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn exists_id(self, id: FieldId) -> bool {
        self.find_id(id).is_some()
    }

    pub fn count_of(self, name: &str) -> usize {
        self.find_all(name).count()
    }

    pub fn count_of_id(self, id: FieldId) -> usize {
        self.find_all_id(id).count()
    }

    /// The position of the first field matching `name`.
    pub fn find(self, name: &str) -> Option<usize> {
        self.h.find_name(0, name.as_bytes())
    }

    pub fn find_id(self, id: FieldId) -> Option<usize> {
        self.h.find_id(0, id)
    }

    /// The first match at or after position `from`.
    pub fn find_from(self, from: usize, name: &str) -> Option<usize> {
        self.h.find_name(from, name.as_bytes())
    }

    pub fn find_from_id(self, from: usize, id: FieldId) -> Option<usize> {
        self.h.find_id(from, id)
    }

    /// The last match strictly before position `before`.
    pub fn find_last(self, before: usize, name: &str) -> Option<usize> {
        self.h.rfind_name(before, name.as_bytes())
    }

    pub fn find_last_id(self, before: usize, id: FieldId) -> Option<usize> {
        self.h.rfind_id(before, id)
    }

    /// All fields matching `name`, in insertion order.
    pub fn find_all<'n>(self, name: &'n str) -> FindAll<'a, 'n> {
        FindAll {
            v: self,
            next: 0,
            sel: Selector::Name(name.as_bytes()),
        }
    }

    pub fn find_all_id(self, id: FieldId) -> FindAll<'a, 'static> {
        FindAll {
            v: self,
            next: 0,
            sel: Selector::Id(id),
        }
    }

    /// The derived framing metadata.
    pub fn metadata(self) -> &'a Metadata {
        &self.h.md
    }

    /// Whether the connection stays open after this message.
    pub fn keep_alive(self) -> bool {
        self.h.keep_alive()
    }
}

impl<'a> IntoIterator for FieldsView<'a> {
    type Item = Field<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl fmt::Debug for FieldsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|fd| (fd.name, String::from_utf8_lossy(fd.value))))
            .finish()
    }
}

/// Read-only view of a request.
#[derive(Clone, Copy)]
pub struct RequestView<'a> {
    v: FieldsView<'a>,
}

impl<'a> RequestView<'a> {
    pub(crate) fn new(h: &'a Header) -> RequestView<'a> {
        RequestView {
            v: FieldsView { h },
        }
    }

    pub fn method(self) -> Method {
        match self.v.h.start {
            store::StartLine::Request { method, .. } => method,
            _ => unreachable!("request view over non-request header"),
        }
    }

    /// The method string as received.
    pub fn method_text(self) -> &'a str {
        match self.v.h.start {
            store::StartLine::Request { method_len, .. } => {
                token_str(&self.v.h.wire()[..method_len])
            }
            _ => unreachable!("request view over non-request header"),
        }
    }

    pub fn target(self) -> &'a str {
        match self.v.h.start {
            store::StartLine::Request {
                method_len,
                target_len,
                ..
            } => {
                let start = method_len + 1;
                std::str::from_utf8(&self.v.h.wire()[start..start + target_len])
                    .expect("targets are visible ASCII")
            }
            _ => unreachable!("request view over non-request header"),
        }
    }

    pub fn version(self) -> Version {
        self.v.h.version
    }
}

impl<'a> Deref for RequestView<'a> {
    type Target = FieldsView<'a>;

    fn deref(&self) -> &FieldsView<'a> {
        &self.v
    }
}

impl fmt::Debug for RequestView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestView")
            .field("method", &self.method_text())
            .field("target", &self.target())
            .field("version", &self.version())
            .field("fields", &self.v)
            .finish()
    }
}

/// Read-only view of a response.
#[derive(Clone, Copy)]
pub struct ResponseView<'a> {
    v: FieldsView<'a>,
}

impl<'a> ResponseView<'a> {
    pub(crate) fn new(h: &'a Header) -> ResponseView<'a> {
        ResponseView {
            v: FieldsView { h },
        }
    }

    pub fn status(self) -> Status {
        match self.v.h.start {
            store::StartLine::Response { status, .. } => status,
            _ => unreachable!("response view over non-response header"),
        }
    }

    pub fn status_code(self) -> u16 {
        match self.v.h.start {
            store::StartLine::Response { code, .. } => code,
            _ => unreachable!("response view over non-response header"),
        }
    }

    /// The reason phrase as received (possibly empty).
    pub fn reason(self) -> &'a [u8] {
        let prefix = self.v.h.prefix();
        let wire = self.v.h.wire();
        // "HTTP/1.x NNN" is 12 bytes; a reason needs the SP after it
        if prefix >= 15 {
            &wire[13..prefix - 2]
        } else {
            b""
        }
    }

    pub fn version(self) -> Version {
        self.v.h.version
    }
}

impl<'a> Deref for ResponseView<'a> {
    type Target = FieldsView<'a>;

    fn deref(&self) -> &FieldsView<'a> {
        &self.v
    }
}

impl fmt::Debug for ResponseView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseView")
            .field("status", &self.status_code())
            .field("version", &self.version())
            .field("fields", &self.v)
            .finish()
    }
}

/// Borrow a message's header for reading or serialization.
pub trait AsFieldsView {
    fn as_fields_view(&self) -> FieldsView<'_>;
}

//------------------------------------------------------------------
// iterators

/// Iterator over the fields of a header section, in insertion order.
#[derive(Clone)]
pub struct Iter<'a> {
    v: FieldsView<'a>,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Field<'a>> {
        if self.front == self.back {
            return None;
        }
        let f = self.v.field(self.front);
        self.front += 1;
        Some(f)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.v.field(self.back))
    }
}

impl ExactSizeIterator for Iter<'_> {}

enum Selector<'n> {
    Id(FieldId),
    Name(&'n [u8]),
}

/// Lazy sequence of the fields sharing one name or id.
pub struct FindAll<'a, 'n> {
    v: FieldsView<'a>,
    next: usize,
    sel: Selector<'n>,
}

impl<'a> Iterator for FindAll<'a, '_> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Field<'a>> {
        let found = match self.sel {
            Selector::Id(id) => self.v.h.find_id(self.next, id),
            Selector::Name(name) => self.v.h.find_name(self.next, name),
        }?;
        self.next = found + 1;
        Some(self.v.field(found))
    }
}

//------------------------------------------------------------------
// owning containers

macro_rules! forward_view_reads {
    () => {
        /// The canonical wire form, including the trailing CRLF.
        pub fn buffer(&self) -> &[u8] {
            self.as_fields_view().buffer()
        }

        /// The number of fields.
        pub fn len(&self) -> usize {
            self.as_fields_view().len()
        }

        pub fn is_empty(&self) -> bool {
            self.as_fields_view().is_empty()
        }

        /// The field at position `i`; panics if out of bounds.
        pub fn field(&self, i: usize) -> Field<'_> {
            self.as_fields_view().field(i)
        }

        pub fn iter(&self) -> Iter<'_> {
            self.as_fields_view().iter()
        }

        pub fn get(&self, name: &str) -> Option<&[u8]> {
            self.as_fields_view().get(name)
        }

        pub fn get_id(&self, id: FieldId) -> Option<&[u8]> {
            self.as_fields_view().get_id(id)
        }

        pub fn value_or<'s>(&'s self, name: &str, default: &'s [u8]) -> &'s [u8] {
            self.as_fields_view().value_or(name, default)
        }

        pub fn exists(&self, name: &str) -> bool {
            self.as_fields_view().exists(name)
        }

        pub fn exists_id(&self, id: FieldId) -> bool {
            self.as_fields_view().exists_id(id)
        }

        pub fn count_of(&self, name: &str) -> usize {
            self.as_fields_view().count_of(name)
        }

        pub fn count_of_id(&self, id: FieldId) -> usize {
            self.as_fields_view().count_of_id(id)
        }

        pub fn find(&self, name: &str) -> Option<usize> {
            self.as_fields_view().find(name)
        }

        pub fn find_id(&self, id: FieldId) -> Option<usize> {
            self.as_fields_view().find_id(id)
        }

        pub fn find_from(&self, from: usize, name: &str) -> Option<usize> {
            self.as_fields_view().find_from(from, name)
        }

        pub fn find_from_id(&self, from: usize, id: FieldId) -> Option<usize> {
            self.as_fields_view().find_from_id(from, id)
        }

        pub fn find_last(&self, before: usize, name: &str) -> Option<usize> {
            self.as_fields_view().find_last(before, name)
        }

        pub fn find_last_id(&self, before: usize, id: FieldId) -> Option<usize> {
            self.as_fields_view().find_last_id(before, id)
        }

        pub fn find_all<'n>(&self, name: &'n str) -> FindAll<'_, 'n> {
            self.as_fields_view().find_all(name)
        }

        pub fn find_all_id(&self, id: FieldId) -> FindAll<'_, 'static> {
            self.as_fields_view().find_all_id(id)
        }

        /// The derived framing metadata.
        pub fn metadata(&self) -> &Metadata {
            self.as_fields_view().metadata()
        }

        /// Whether the connection stays open after this message.
        pub fn keep_alive(&self) -> bool {
            self.as_fields_view().keep_alive()
        }
    };
}

/// A bare header field section.
#[derive(Clone)]
pub struct Fields {
    pub(crate) h: Header,
}

impl Fields {
    /// An empty section; allocates on first mutation.
    pub fn new() -> Fields {
        Fields {
            h: Header::new(HeaderKind::Fields),
        }
    }

    /// An empty section whose storage may not exceed `n` bytes.
    pub fn with_max_capacity(n: usize) -> Fields {
        Fields {
            h: Header::with_max_capacity(HeaderKind::Fields, n),
        }
    }

    /// Parse a complete field section terminated by CRLF.
    pub fn parse(input: &[u8]) -> Result<Fields> {
        Ok(Fields {
            h: Header::parse_install(HeaderKind::Fields, input, &HeaderLimits::default())?,
        })
    }

    forward_view_reads!();

    pub fn as_view(&self) -> FieldsView<'_> {
        FieldsView { h: &self.h }
    }

    pub fn capacity(&self) -> usize {
        self.h.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.h.max_capacity()
    }

    /// Append one field.
    pub fn append(&mut self, name: &str, value: impl AsRef<[u8]>) -> Result<()> {
        self.h.append(name.as_bytes(), value.as_ref())
    }

    /// Insert one field before position `index`.
    pub fn insert(&mut self, index: usize, name: &str, value: impl AsRef<[u8]>) -> Result<()> {
        assert!(index <= self.h.count(), "field index out of bounds");
        self.h.insert_at(index, name.as_bytes(), value.as_ref())
    }

    /// Replace all fields matching `name` with a single one, appending
    /// if absent.
    pub fn set(&mut self, name: &str, value: impl AsRef<[u8]>) -> Result<()> {
        self.h.set_name(name.as_bytes(), value.as_ref())
    }

    pub fn set_id(&mut self, id: FieldId, value: impl AsRef<[u8]>) -> Result<()> {
        self.h.set_id(id, value.as_ref())
    }

    /// Replace the value of the field at `index`.
    pub fn set_at(&mut self, index: usize, value: impl AsRef<[u8]>) -> Result<()> {
        assert!(index < self.h.count(), "field index out of bounds");
        self.h.set_value_at(index, value.as_ref())
    }

    /// Remove all fields matching `name`; returns how many.
    pub fn erase(&mut self, name: &str) -> usize {
        self.h.erase_name(name.as_bytes())
    }

    pub fn erase_id(&mut self, id: FieldId) -> usize {
        self.h.erase_id(id)
    }

    /// Remove the field at `index`.
    pub fn erase_at(&mut self, index: usize) {
        assert!(index < self.h.count(), "field index out of bounds");
        self.h.erase_at(index)
    }

    /// Discard all content, retaining capacity.
    pub fn clear(&mut self) {
        self.h.clear()
    }

    /// Grow storage to at least `n` bytes.
    pub fn reserve(&mut self, n: usize) -> Result<()> {
        self.h.reserve(n)
    }

    pub fn shrink_to_fit(&mut self) {
        self.h.shrink_to_fit()
    }

    /// Set `Content-Length` and remove any terminal `chunked` coding.
    pub fn set_payload_size(&mut self, n: u64) -> Result<()> {
        self.h.set_payload_size(n)
    }

    /// Set `Content-Length: n`, replacing previous values.
    pub fn set_content_length(&mut self, n: u64) -> Result<()> {
        self.h.set_content_length(n)
    }

    /// Add or remove the terminal `chunked` transfer coding.
    pub fn set_chunked(&mut self, value: bool) -> Result<()> {
        self.h.set_chunked(value)
    }

    /// Maintain the `Connection` header for the wanted keep-alive
    /// behavior under the message's protocol version.
    pub fn set_keep_alive(&mut self, value: bool) -> Result<()> {
        self.h.set_keep_alive(value)
    }

    /// Add or remove `Expect: 100-continue`.
    pub fn set_expect_100_continue(&mut self, value: bool) -> Result<()> {
        self.h.set_expect_100_continue(value)
    }

    /// Pin (or release) the payload decision, overriding the framing
    /// fields.
    pub fn set_payload_override(&mut self, on: bool) {
        self.h.set_payload_override(on)
    }
}

impl Default for Fields {
    fn default() -> Fields {
        Fields::new()
    }
}

impl AsFieldsView for Fields {
    fn as_fields_view(&self) -> FieldsView<'_> {
        FieldsView { h: &self.h }
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}

/// An HTTP request header.
#[derive(Clone)]
pub struct Request {
    f: Fields,
}

impl Request {
    /// `GET / HTTP/1.1` with no fields.
    pub fn new() -> Request {
        Request {
            f: Fields {
                h: Header::new(HeaderKind::Request),
            },
        }
    }

    pub fn with_max_capacity(n: usize) -> Request {
        Request {
            f: Fields {
                h: Header::with_max_capacity(HeaderKind::Request, n),
            },
        }
    }

    /// Parse a complete request header section.
    pub fn parse(input: &[u8]) -> Result<Request> {
        Ok(Request {
            f: Fields {
                h: Header::parse_install(HeaderKind::Request, input, &HeaderLimits::default())?,
            },
        })
    }

    pub fn as_view(&self) -> RequestView<'_> {
        RequestView::new(&self.f.h)
    }

    pub fn method(&self) -> Method {
        self.as_view().method()
    }

    pub fn method_text(&self) -> &str {
        match self.f.h.start {
            store::StartLine::Request { method_len, .. } => {
                token_str(&self.f.h.wire()[..method_len])
            }
            _ => unreachable!(),
        }
    }

    pub fn target(&self) -> &str {
        match self.f.h.start {
            store::StartLine::Request {
                method_len,
                target_len,
                ..
            } => {
                let start = method_len + 1;
                std::str::from_utf8(&self.f.h.wire()[start..start + target_len])
                    .expect("targets are visible ASCII")
            }
            _ => unreachable!(),
        }
    }

    pub fn version(&self) -> Version {
        self.f.h.version
    }

    /// Replace the whole request line.
    pub fn set_start_line(&mut self, method: &str, target: &str, version: Version) -> Result<()> {
        self.f
            .h
            .set_request_line(method.as_bytes(), target.as_bytes(), version)
    }

    pub fn set_method(&mut self, method: &str) -> Result<()> {
        let target = self.target().to_owned();
        let version = self.version();
        self.set_start_line(method, &target, version)
    }

    pub fn set_target(&mut self, target: &str) -> Result<()> {
        let method = self.method_text().to_owned();
        let version = self.version();
        self.set_start_line(&method, target, version)
    }

    pub fn set_version(&mut self, version: Version) -> Result<()> {
        let method = self.method_text().to_owned();
        let target = self.target().to_owned();
        self.set_start_line(&method, &target, version)
    }
}

impl Default for Request {
    fn default() -> Request {
        Request::new()
    }
}

impl Deref for Request {
    type Target = Fields;

    fn deref(&self) -> &Fields {
        &self.f
    }
}

impl DerefMut for Request {
    fn deref_mut(&mut self) -> &mut Fields {
        &mut self.f
    }
}

impl AsFieldsView for Request {
    fn as_fields_view(&self) -> FieldsView<'_> {
        FieldsView { h: &self.f.h }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}

/// An HTTP response header.
#[derive(Clone)]
pub struct Response {
    f: Fields,
}

impl Response {
    /// `HTTP/1.1 200 OK` with no fields.
    pub fn new() -> Response {
        Response {
            f: Fields {
                h: Header::new(HeaderKind::Response),
            },
        }
    }

    pub fn with_max_capacity(n: usize) -> Response {
        Response {
            f: Fields {
                h: Header::with_max_capacity(HeaderKind::Response, n),
            },
        }
    }

    /// Parse a complete response header section.
    pub fn parse(input: &[u8]) -> Result<Response> {
        Ok(Response {
            f: Fields {
                h: Header::parse_install(HeaderKind::Response, input, &HeaderLimits::default())?,
            },
        })
    }

    pub fn as_view(&self) -> ResponseView<'_> {
        ResponseView::new(&self.f.h)
    }

    pub fn status(&self) -> Status {
        self.as_view().status()
    }

    pub fn status_code(&self) -> u16 {
        self.as_view().status_code()
    }

    pub fn reason(&self) -> &[u8] {
        let prefix = self.f.h.prefix();
        let wire = self.f.h.wire();
        if prefix >= 15 {
            &wire[13..prefix - 2]
        } else {
            b""
        }
    }

    pub fn version(&self) -> Version {
        self.f.h.version
    }

    /// Replace the whole status line. `None` uses the standard reason
    /// phrase for `code`.
    pub fn set_start_line(
        &mut self,
        code: u16,
        reason: Option<&str>,
        version: Version,
    ) -> Result<()> {
        self.f
            .h
            .set_status_line(code, reason.map(str::as_bytes), version)
    }

    /// Set the status code with its standard reason phrase.
    pub fn set_status(&mut self, code: u16) -> Result<()> {
        let version = self.version();
        self.set_start_line(code, None, version)
    }

    pub fn set_version(&mut self, version: Version) -> Result<()> {
        let code = self.status_code();
        let reason = self.reason().to_vec();
        self.f.h.set_status_line(code, Some(&reason[..]), version)
    }
}

impl Default for Response {
    fn default() -> Response {
        Response::new()
    }
}

impl Deref for Response {
    type Target = Fields;

    fn deref(&self) -> &Fields {
        &self.f
    }
}

impl DerefMut for Response {
    fn deref_mut(&mut self) -> &mut Fields {
        &mut self.f
    }
}

impl AsFieldsView for Response {
    fn as_fields_view(&self) -> FieldsView<'_> {
        FieldsView { h: &self.f.h }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}

impl AsFieldsView for FieldsView<'_> {
    fn as_fields_view(&self) -> FieldsView<'_> {
        *self
    }
}

impl AsFieldsView for RequestView<'_> {
    fn as_fields_view(&self) -> FieldsView<'_> {
        self.v
    }
}

impl AsFieldsView for ResponseView<'_> {
    fn as_fields_view(&self) -> FieldsView<'_> {
        self.v
    }
}
