//! Error and Result module.

use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

/// Result type often returned from methods that can fail with an
/// `Error`.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur while parsing or serializing an
/// HTTP/1 message.
///
/// Some kinds are signals rather than failures: `NeedData` means more
/// input resumes progress, `InPlaceOverflow` means the in-place body
/// buffer must be drained, and `ExpectContinue` pauses serialization
/// until `resume` is called.
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
    location: &'static Location<'static>,
}

/// The different kinds of errors and signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    //
    // Partial success
    //
    /// Additional input data is required.
    NeedData,
    /// The message is complete.
    EndOfMessage,
    /// The end of the stream was reached.
    EndOfStream,
    /// The in-place body buffer is full and must be consumed.
    InPlaceOverflow,
    /// Serialization paused for an `Expect: 100-continue` header.
    ExpectContinue,

    //
    // Syntax errors (unrecoverable)
    //
    /// Invalid Connection field value.
    BadConnection,
    /// Invalid Content-Length field value or values.
    BadContentLength,
    /// Invalid Expect header.
    BadExpect,
    /// Syntax error in a field name.
    BadFieldName,
    /// A field value supplied by the caller embeds CR or LF.
    BadFieldSmuggle,
    /// Syntax error in a field value.
    BadFieldValue,
    /// Expected LF after CR.
    BadLineEnding,
    /// Syntax error in a comma-separated list.
    BadList,
    /// Syntax error in the request method.
    BadMethod,
    /// Syntax error in a number.
    BadNumber,
    /// Something is wrong with the payload octets.
    BadPayload,
    /// Syntax error in the HTTP-Version.
    BadVersion,
    /// Syntax error in the reason phrase.
    BadReason,
    /// Syntax error in the request target.
    BadRequestTarget,
    /// Syntax error in the status code.
    BadStatusCode,
    /// Syntax error in the status line.
    BadStatusLine,
    /// Invalid Transfer-Encoding field value or combination.
    BadTransferEncoding,
    /// Syntax error or illegal Upgrade field.
    BadUpgrade,

    //
    // Limit errors
    //
    /// The decoded body exceeded the configured limit.
    BodyTooLarge,
    /// The combined start line and fields exceeded the configured size.
    HeadersLimit,
    /// The start line exceeded the configured size.
    StartLineLimit,
    /// A single field exceeded the configured size.
    FieldSizeLimit,
    /// The number of fields exceeded the configured count.
    FieldsLimit,
    /// The stream ended before the message could be completed.
    Incomplete,

    //
    // Semantic errors
    //
    /// A number overflowed its representation.
    NumericOverflow,
    /// Multiple Content-Length fields with differing values.
    MultipleContentLength,

    //
    // Other
    //
    /// A buffer's maximum size would be exceeded.
    BufferOverflow,
}

impl Kind {
    fn message(self) -> &'static str {
        match self {
            Kind::NeedData => "need data",
            Kind::EndOfMessage => "end of message",
            Kind::EndOfStream => "end of stream",
            Kind::InPlaceOverflow => "in place overflow",
            Kind::ExpectContinue => "expect continue",
            Kind::BadConnection => "bad Connection",
            Kind::BadContentLength => "bad Content-Length",
            Kind::BadExpect => "bad Expect",
            Kind::BadFieldName => "bad field name",
            Kind::BadFieldSmuggle => "bad field smuggle",
            Kind::BadFieldValue => "bad field value",
            Kind::BadLineEnding => "bad line ending",
            Kind::BadList => "bad list",
            Kind::BadMethod => "bad method",
            Kind::BadNumber => "bad number",
            Kind::BadPayload => "bad payload",
            Kind::BadVersion => "bad version",
            Kind::BadReason => "bad reason-phrase",
            Kind::BadRequestTarget => "bad request-target",
            Kind::BadStatusCode => "bad status-code",
            Kind::BadStatusLine => "bad status-line",
            Kind::BadTransferEncoding => "bad Transfer-Encoding",
            Kind::BadUpgrade => "bad Upgrade",
            Kind::BodyTooLarge => "body too large",
            Kind::HeadersLimit => "headers limit",
            Kind::StartLineLimit => "start line limit",
            Kind::FieldSizeLimit => "field size limit",
            Kind::FieldsLimit => "fields limit",
            Kind::Incomplete => "incomplete",
            Kind::NumericOverflow => "numeric overflow",
            Kind::MultipleContentLength => "multiple Content-Length",
            Kind::BufferOverflow => "buffer overflow",
        }
    }
}

impl Error {
    #[track_caller]
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(ErrorImpl {
                kind,
                cause: None,
                location: Location::caller(),
            }),
        }
    }

    pub(crate) fn with<C: Into<Cause>>(mut self, cause: C) -> Error {
        self.inner.cause = Some(cause.into());
        self
    }

    /// The kind of this error.
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Returns true if more input would let the operation make progress.
    ///
    /// This is the condition grouping the recoverable "short read"
    /// signals, as opposed to terminal parse failures.
    pub fn is_need_more_input(&self) -> bool {
        matches!(self.inner.kind, Kind::NeedData)
    }

    /// Returns true if this is the `NeedData` signal.
    pub fn is_need_data(&self) -> bool {
        matches!(self.inner.kind, Kind::NeedData)
    }

    /// Returns true if this is the `ExpectContinue` pause signal.
    pub fn is_expect_continue(&self) -> bool {
        matches!(self.inner.kind, Kind::ExpectContinue)
    }

    /// Returns true if this is the `InPlaceOverflow` signal.
    pub fn is_in_place_overflow(&self) -> bool {
        matches!(self.inner.kind, Kind::InPlaceOverflow)
    }

    /// Returns true if the parsed body contained invalid octets.
    pub fn is_invalid_payload(&self) -> bool {
        matches!(self.inner.kind, Kind::BadPayload)
    }

    /// Returns true for any of the configured-limit errors.
    pub fn is_limit(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::BodyTooLarge
                | Kind::HeadersLimit
                | Kind::StartLineLimit
                | Kind::FieldSizeLimit
                | Kind::FieldsLimit
        )
    }

    /// The source location where this error was created.
    pub fn location(&self) -> &'static Location<'static> {
        self.inner.location
    }

    /// Consumes the error, returning its cause, if any.
    pub fn into_cause(self) -> Option<Cause> {
        self.inner.cause
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut b = f.debug_tuple("Error");
        b.field(&self.inner.kind);
        b.field(&format_args!(
            "{}:{}",
            self.inner.location.file(),
            self.inner.location.line()
        ));
        if let Some(ref cause) = self.inner.cause {
            b.field(cause);
        }
        b.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.kind.message())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Kind};

    #[test]
    fn need_more_input_condition() {
        assert!(Error::new(Kind::NeedData).is_need_more_input());
        assert!(!Error::new(Kind::BadMethod).is_need_more_input());
        assert!(!Error::new(Kind::EndOfStream).is_need_more_input());
    }

    #[test]
    fn kind_round_trip() {
        let err = Error::new(Kind::MultipleContentLength);
        assert_eq!(err.kind(), Kind::MultipleContentLength);
        assert_eq!(err.to_string(), "multiple Content-Length");
    }

    #[test]
    fn location_is_captured() {
        let err = Error::new(Kind::BadList);
        assert!(err.location().file().ends_with("error.rs"));
    }

    #[test]
    fn error_size_is_one_word() {
        assert_eq!(
            std::mem::size_of::<super::Error>(),
            std::mem::size_of::<usize>()
        );
    }
}
