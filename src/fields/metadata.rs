//! Framing metadata derived from the special fields.
//!
//! The header store keeps these records consistent with its field list
//! on every mutation, so framing decisions never re-parse the header.
//! Each record carries its own error slot; errors become observable
//! when the parser reaches the end of the header section.

use crate::error::Kind;
use crate::field::FieldId;
use crate::grammar;

/// How the message body is delimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    /// This message has no payload.
    None,
    /// The payload is unknown due to errors in the framing fields.
    Error,
    /// The payload size is known.
    Size(u64),
    /// The payload uses the chunked transfer coding.
    Chunked,
    /// The payload continues until the end of the stream.
    ToEof,
}

/// The effective encoding of the body octets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// The body is not encoded.
    Identity,
    /// The body has deflate (zlib) applied.
    Deflate,
    /// The body has gzip applied.
    Gzip,
}

/// Metadata for the Connection field.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectionMd {
    /// Parse error, if any Connection value was malformed.
    pub error: Option<Kind>,
    /// The total number of Connection fields.
    pub count: usize,
    /// A `close` token is present.
    pub close: bool,
    /// A `keep-alive` token is present.
    pub keep_alive: bool,
    /// An `upgrade` token is present.
    pub upgrade: bool,
}

/// Metadata for the Content-Length field.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentLengthMd {
    /// Parse error, if any.
    pub error: Option<Kind>,
    /// The total number of Content-Length fields.
    pub count: usize,
    /// The value; only meaningful when `count > 0` and `error` is none.
    pub value: u64,
}

/// Metadata for the Expect field.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpectMd {
    /// Parse error, if any.
    pub error: Option<Kind>,
    /// The total number of Expect fields.
    pub count: usize,
    /// The value is `100-continue`.
    pub is_100_continue: bool,
}

/// Metadata for the Transfer-Encoding field.
#[derive(Clone, Copy, Debug)]
pub struct TransferEncodingMd {
    /// Parse error, if any.
    pub error: Option<Kind>,
    /// The total number of Transfer-Encoding fields.
    pub count: usize,
    /// The total number of codings across all fields.
    pub codings: usize,
    /// The last coding is `chunked`.
    pub is_chunked: bool,
    /// The effective body encoding from the non-chunked codings.
    pub encoding: Encoding,
}

impl Default for TransferEncodingMd {
    fn default() -> TransferEncodingMd {
        TransferEncodingMd {
            error: None,
            count: 0,
            codings: 0,
            is_chunked: false,
            encoding: Encoding::Identity,
        }
    }
}

/// Metadata for the Upgrade field.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpgradeMd {
    /// Parse error, if any.
    pub error: Option<Kind>,
    /// The total number of Upgrade fields.
    pub count: usize,
    /// A `websocket` protocol appears at least once.
    pub websocket: bool,
}

/// Derived metadata about a message's framing fields.
#[derive(Clone, Copy, Debug)]
pub struct Metadata {
    /// How the body is delimited. Kept consistent with the records
    /// below unless `payload_override` is set.
    pub payload: Payload,
    /// The caller has pinned `payload` manually.
    pub payload_override: bool,
    /// The Connection record.
    pub connection: ConnectionMd,
    /// The Content-Length record.
    pub content_length: ContentLengthMd,
    /// The Expect record.
    pub expect: ExpectMd,
    /// The Transfer-Encoding record.
    pub transfer_encoding: TransferEncodingMd,
    /// The Upgrade record.
    pub upgrade: UpgradeMd,
}

impl Default for Metadata {
    fn default() -> Metadata {
        Metadata {
            payload: Payload::None,
            payload_override: false,
            connection: ConnectionMd::default(),
            content_length: ContentLengthMd::default(),
            expect: ExpectMd::default(),
            transfer_encoding: TransferEncodingMd::default(),
            upgrade: UpgradeMd::default(),
        }
    }
}

impl Metadata {
    /// True if this id contributes to framing metadata.
    pub(crate) fn is_special(id: FieldId) -> bool {
        matches!(
            id,
            FieldId::Connection
                | FieldId::ContentLength
                | FieldId::Expect
                | FieldId::TransferEncoding
                | FieldId::Upgrade
        )
    }

    /// Clear the record for one special field, before replaying the
    /// remaining matching fields.
    pub(crate) fn reset_field(&mut self, id: FieldId) {
        match id {
            FieldId::Connection => self.connection = ConnectionMd::default(),
            FieldId::ContentLength => self.content_length = ContentLengthMd::default(),
            FieldId::Expect => self.expect = ExpectMd::default(),
            FieldId::TransferEncoding => self.transfer_encoding = TransferEncodingMd::default(),
            FieldId::Upgrade => self.upgrade = UpgradeMd::default(),
            _ => {}
        }
    }

    /// Fold one field's value into its record, in field order.
    pub(crate) fn apply(&mut self, id: FieldId, value: &[u8]) {
        match id {
            FieldId::Connection => self.apply_connection(value),
            FieldId::ContentLength => self.apply_content_length(value),
            FieldId::Expect => self.apply_expect(value),
            FieldId::TransferEncoding => self.apply_transfer_encoding(value),
            FieldId::Upgrade => self.apply_upgrade(value),
            _ => {}
        }
    }

    fn apply_connection(&mut self, value: &[u8]) {
        let md = &mut self.connection;
        md.count += 1;
        if md.error.is_some() {
            return;
        }
        let mut any = false;
        for token in grammar::ListIter::new(value) {
            if grammar::validate_token(token).is_err() {
                md.error = Some(Kind::BadConnection);
                return;
            }
            any = true;
            if token.eq_ignore_ascii_case(b"close") {
                md.close = true;
            } else if token.eq_ignore_ascii_case(b"keep-alive") {
                md.keep_alive = true;
            } else if token.eq_ignore_ascii_case(b"upgrade") {
                md.upgrade = true;
            }
        }
        if !any {
            md.error = Some(Kind::BadConnection);
        }
    }

    fn apply_content_length(&mut self, value: &[u8]) {
        let md = &mut self.content_length;
        md.count += 1;
        if md.error.is_some() {
            return;
        }
        let parsed = match grammar::parse_dec_u64(value) {
            Ok(v) => v,
            Err(_) => {
                md.error = Some(Kind::BadContentLength);
                return;
            }
        };
        if md.count > 1 && parsed != md.value {
            md.error = Some(Kind::MultipleContentLength);
            return;
        }
        md.value = parsed;
    }

    fn apply_expect(&mut self, value: &[u8]) {
        let md = &mut self.expect;
        md.count += 1;
        if md.error.is_some() {
            return;
        }
        if md.count > 1 {
            md.error = Some(Kind::BadExpect);
            md.is_100_continue = false;
            return;
        }
        if value.eq_ignore_ascii_case(b"100-continue") {
            md.is_100_continue = true;
        } else {
            md.error = Some(Kind::BadExpect);
        }
    }

    fn apply_transfer_encoding(&mut self, value: &[u8]) {
        let md = &mut self.transfer_encoding;
        md.count += 1;
        if md.error.is_some() {
            return;
        }
        let mut any = false;
        for elem in grammar::ListIter::new(value) {
            let coding = match grammar::parse_coding(elem) {
                Ok(c) => c,
                Err(_) => {
                    md.error = Some(Kind::BadTransferEncoding);
                    return;
                }
            };
            any = true;
            if md.is_chunked {
                // chunked must be the final coding
                md.error = Some(Kind::BadTransferEncoding);
                return;
            }
            md.codings += 1;
            if coding.name.eq_ignore_ascii_case(b"chunked") {
                md.is_chunked = true;
            } else if coding.name.eq_ignore_ascii_case(b"deflate") {
                md.encoding = Encoding::Deflate;
            } else if coding.name.eq_ignore_ascii_case(b"gzip")
                || coding.name.eq_ignore_ascii_case(b"x-gzip")
            {
                md.encoding = Encoding::Gzip;
            } else if coding.name.eq_ignore_ascii_case(b"identity") {
                // no effect on the effective encoding
            } else {
                md.error = Some(Kind::BadTransferEncoding);
                return;
            }
        }
        if !any {
            md.error = Some(Kind::BadTransferEncoding);
        }
    }

    fn apply_upgrade(&mut self, value: &[u8]) {
        let md = &mut self.upgrade;
        md.count += 1;
        if md.error.is_some() {
            return;
        }
        let mut any = false;
        for elem in grammar::ListIter::new(value) {
            // protocol-name [ "/" protocol-version ]
            let mut parts = elem.splitn(2, |&b| b == b'/');
            let name = parts.next().unwrap_or(b"");
            if grammar::validate_token(name).is_err() {
                md.error = Some(Kind::BadUpgrade);
                return;
            }
            if let Some(version) = parts.next() {
                if grammar::validate_token(version).is_err() {
                    md.error = Some(Kind::BadUpgrade);
                    return;
                }
            }
            any = true;
            if name.eq_ignore_ascii_case(b"websocket") {
                md.websocket = true;
            }
        }
        if !any {
            md.error = Some(Kind::BadUpgrade);
        }
    }

    /// Recompute `payload` after a framing field changed.
    ///
    /// `status_code` is the start-line code for responses, `None`
    /// otherwise; `is_request` drives the default when no framing
    /// field is present.
    pub(crate) fn update_payload(&mut self, is_request: bool, status_code: Option<u16>) {
        if self.payload_override {
            return;
        }
        self.payload = if self.content_length.error.is_some()
            || self.transfer_encoding.error.is_some()
        {
            Payload::Error
        } else if matches!(status_code, Some(code) if code / 100 == 1 || code == 204 || code == 304)
        {
            Payload::None
        } else if self.transfer_encoding.is_chunked {
            Payload::Chunked
        } else if self.content_length.count > 0 {
            Payload::Size(self.content_length.value)
        } else if is_request {
            Payload::None
        } else {
            Payload::ToEof
        }
    }

    /// The first parse error among all records, if any.
    pub(crate) fn field_error(&self) -> Option<Kind> {
        self.content_length
            .error
            .or(self.transfer_encoding.error)
            .or(self.connection.error)
            .or(self.expect.error)
            .or(self.upgrade.error)
    }
}
