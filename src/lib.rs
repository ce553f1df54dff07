#![cfg_attr(test, deny(rust_2018_idioms))]

//! # h1-codec
//!
//! An incremental, sans-I/O HTTP/1.x wire-protocol engine.
//!
//! h1-codec is a pair of tightly coupled state machines: a [`parser`]
//! that turns raw octets into structured messages, and a
//! [`Serializer`] that turns structured messages into wire octets. It
//! never touches a socket: bytes go in through `prepare`/`commit` and
//! come out as ranges from `prepare`/`consume`, so it composes with
//! any transport, sync or async.
//!
//! The shared data model is the header container ([`Fields`],
//! [`Request`], [`Response`]): one message's header section kept in
//! canonical wire form, with a field index, derived framing
//! [`Metadata`], and zero-copy views.
//!
//! ## Parsing
//!
//! ```
//! use h1_codec::parser::{Config, RequestParser};
//!
//! let mut parser = RequestParser::new(Config::default());
//! parser.start();
//!
//! let input = b"POST /p HTTP/1.1\r\nContent-Length: 4\r\n\r\nABCD";
//! let mut buf = parser.prepare();
//! let n = buf.write(input);
//! parser.commit(n);
//! parser.parse().unwrap();
//!
//! let req = parser.get().unwrap();
//! assert_eq!(req.target(), "/p");
//! assert_eq!(parser.body(), b"ABCD");
//! assert!(parser.is_complete());
//! ```
//!
//! ## Serializing
//!
//! ```
//! use bytes::Bytes;
//! use h1_codec::serializer::{Config, Serializer};
//! use h1_codec::Response;
//!
//! let mut res = Response::new();
//! res.set_payload_size(5).unwrap();
//!
//! let mut sr = Serializer::new(Config::default());
//! sr.start_buffers(&res, vec![Bytes::from_static(b"hello")]).unwrap();
//! let mut wire = Vec::new();
//! while !sr.is_done() {
//!     let out = sr.prepare().unwrap();
//!     for s in out.slices() {
//!         wire.extend_from_slice(s);
//!     }
//!     let n = out.total();
//!     sr.consume(n);
//! }
//! assert_eq!(wire, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
//! ```
//!
//! ## Scope
//!
//! Framing only: no network I/O, no TLS, no HTTP/2 or HTTP/3, and no
//! semantics above message delimitation (no routing, caching or
//! content negotiation). Optional transparent deflate/gzip coding is
//! available on both sides.

pub use bytes;

mod body;
mod buffer;
mod coding;
mod error;
mod field;
mod fields;
mod grammar;
mod method;
pub mod parser;
pub mod serializer;
mod status;
mod version;
mod workspace;

pub use crate::body::{BodyFilter, BytesSource, Processed, Sink, Source, SourceRead};
pub use crate::coding::{DeflateFilter, InflateFilter};
pub use crate::error::{Error, Kind, Result};
pub use crate::field::FieldId;
pub use crate::fields::{
    AsFieldsView, ConnectionMd, ContentLengthMd, Encoding, ExpectMd, Field, Fields, FieldsView,
    FindAll, Iter, Metadata, Payload, Request, RequestView, Response, ResponseView,
    TransferEncodingMd, UpgradeMd,
};
pub use crate::method::Method;
pub use crate::parser::{RequestParser, ResponseParser};
pub use crate::serializer::Serializer;
pub use crate::status::{reason_phrase, Status};
pub use crate::version::Version;
