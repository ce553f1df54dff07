//! Well-known header field names.
//!
//! Every field stored in a message carries a `FieldId` so that callers
//! (and the framing logic) can test for interesting fields without byte
//! comparisons. Unknown names are stored as-is with the `Unknown` id.

/// Identifier for a well-known field name.
///
/// Name matching is always ASCII case-insensitive; the canonical
/// mixed-case spelling is only used when the library emits a field
/// itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldId {
    /// Not one of the well-known names.
    Unknown,

    Accept,
    AcceptCharset,
    AcceptEncoding,
    AcceptLanguage,
    AcceptPatch,
    AcceptPost,
    AcceptRanges,
    AccessControlAllowCredentials,
    AccessControlAllowHeaders,
    AccessControlAllowMethods,
    AccessControlAllowOrigin,
    AccessControlExposeHeaders,
    AccessControlMaxAge,
    AccessControlRequestHeaders,
    AccessControlRequestMethod,
    Age,
    Allow,
    AltSvc,
    Authorization,
    CacheControl,
    Connection,
    ContentDisposition,
    ContentEncoding,
    ContentLanguage,
    ContentLength,
    ContentLocation,
    ContentMd5,
    ContentRange,
    ContentSecurityPolicy,
    ContentSecurityPolicyReportOnly,
    ContentType,
    Cookie,
    Date,
    Dnt,
    Etag,
    Expect,
    Expires,
    Forwarded,
    From,
    Host,
    IfMatch,
    IfModifiedSince,
    IfNoneMatch,
    IfRange,
    IfUnmodifiedSince,
    KeepAlive,
    LastModified,
    Link,
    Location,
    MaxForwards,
    Origin,
    Pragma,
    ProxyAuthenticate,
    ProxyAuthorization,
    ProxyConnection,
    PublicKeyPins,
    Range,
    Referer,
    ReferrerPolicy,
    Refresh,
    RetryAfter,
    SecWebSocketAccept,
    SecWebSocketExtensions,
    SecWebSocketKey,
    SecWebSocketProtocol,
    SecWebSocketVersion,
    Server,
    SetCookie,
    StrictTransportSecurity,
    Te,
    Trailer,
    TransferEncoding,
    Upgrade,
    UpgradeInsecureRequests,
    UserAgent,
    Vary,
    Via,
    Warning,
    WwwAuthenticate,
    XContentTypeOptions,
    XDnsPrefetchControl,
    XForwardedFor,
    XForwardedHost,
    XForwardedProto,
    XFrameOptions,
    XRequestedWith,
    XRequestId,
    XXssProtection,
}

// Canonical spellings, indexed by discriminant. Index zero (Unknown) is a
// placeholder and never emitted.
static NAMES: &[&str] = &[
    "",
    "Accept",
    "Accept-Charset",
    "Accept-Encoding",
    "Accept-Language",
    "Accept-Patch",
    "Accept-Post",
    "Accept-Ranges",
    "Access-Control-Allow-Credentials",
    "Access-Control-Allow-Headers",
    "Access-Control-Allow-Methods",
    "Access-Control-Allow-Origin",
    "Access-Control-Expose-Headers",
    "Access-Control-Max-Age",
    "Access-Control-Request-Headers",
    "Access-Control-Request-Method",
    "Age",
    "Allow",
    "Alt-Svc",
    "Authorization",
    "Cache-Control",
    "Connection",
    "Content-Disposition",
    "Content-Encoding",
    "Content-Language",
    "Content-Length",
    "Content-Location",
    "Content-MD5",
    "Content-Range",
    "Content-Security-Policy",
    "Content-Security-Policy-Report-Only",
    "Content-Type",
    "Cookie",
    "Date",
    "DNT",
    "ETag",
    "Expect",
    "Expires",
    "Forwarded",
    "From",
    "Host",
    "If-Match",
    "If-Modified-Since",
    "If-None-Match",
    "If-Range",
    "If-Unmodified-Since",
    "Keep-Alive",
    "Last-Modified",
    "Link",
    "Location",
    "Max-Forwards",
    "Origin",
    "Pragma",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "Proxy-Connection",
    "Public-Key-Pins",
    "Range",
    "Referer",
    "Referrer-Policy",
    "Refresh",
    "Retry-After",
    "Sec-WebSocket-Accept",
    "Sec-WebSocket-Extensions",
    "Sec-WebSocket-Key",
    "Sec-WebSocket-Protocol",
    "Sec-WebSocket-Version",
    "Server",
    "Set-Cookie",
    "Strict-Transport-Security",
    "TE",
    "Trailer",
    "Transfer-Encoding",
    "Upgrade",
    "Upgrade-Insecure-Requests",
    "User-Agent",
    "Vary",
    "Via",
    "Warning",
    "WWW-Authenticate",
    "X-Content-Type-Options",
    "X-DNS-Prefetch-Control",
    "X-Forwarded-For",
    "X-Forwarded-Host",
    "X-Forwarded-Proto",
    "X-Frame-Options",
    "X-Requested-With",
    "X-Request-Id",
    "X-XSS-Protection",
];

impl FieldId {
    /// Look up the id for a field name, case-insensitively.
    pub fn lookup(name: &[u8]) -> FieldId {
        let n = name.len();
        // Names shorter than "TE" or longer than the longest entry can
        // never match.
        if n < 2 || n > 35 {
            return FieldId::Unknown;
        }
        for (i, s) in NAMES.iter().enumerate().skip(1) {
            if s.len() == n && name.eq_ignore_ascii_case(s.as_bytes()) {
                return FieldId::from_u32(i as u32);
            }
        }
        FieldId::Unknown
    }

    /// The canonical spelling, or `None` for `Unknown`.
    pub fn name(self) -> Option<&'static str> {
        match self {
            FieldId::Unknown => None,
            id => Some(NAMES[id as u32 as usize]),
        }
    }

    pub(crate) fn to_u32(self) -> u32 {
        self as u32
    }

    pub(crate) fn from_u32(v: u32) -> FieldId {
        // The discriminants are dense and start at zero, so a table
        // indexed by discriminant reverses the cast.
        static ALL: &[FieldId] = &[
            FieldId::Unknown,
            FieldId::Accept,
            FieldId::AcceptCharset,
            FieldId::AcceptEncoding,
            FieldId::AcceptLanguage,
            FieldId::AcceptPatch,
            FieldId::AcceptPost,
            FieldId::AcceptRanges,
            FieldId::AccessControlAllowCredentials,
            FieldId::AccessControlAllowHeaders,
            FieldId::AccessControlAllowMethods,
            FieldId::AccessControlAllowOrigin,
            FieldId::AccessControlExposeHeaders,
            FieldId::AccessControlMaxAge,
            FieldId::AccessControlRequestHeaders,
            FieldId::AccessControlRequestMethod,
            FieldId::Age,
            FieldId::Allow,
            FieldId::AltSvc,
            FieldId::Authorization,
            FieldId::CacheControl,
            FieldId::Connection,
            FieldId::ContentDisposition,
            FieldId::ContentEncoding,
            FieldId::ContentLanguage,
            FieldId::ContentLength,
            FieldId::ContentLocation,
            FieldId::ContentMd5,
            FieldId::ContentRange,
            FieldId::ContentSecurityPolicy,
            FieldId::ContentSecurityPolicyReportOnly,
            FieldId::ContentType,
            FieldId::Cookie,
            FieldId::Date,
            FieldId::Dnt,
            FieldId::Etag,
            FieldId::Expect,
            FieldId::Expires,
            FieldId::Forwarded,
            FieldId::From,
            FieldId::Host,
            FieldId::IfMatch,
            FieldId::IfModifiedSince,
            FieldId::IfNoneMatch,
            FieldId::IfRange,
            FieldId::IfUnmodifiedSince,
            FieldId::KeepAlive,
            FieldId::LastModified,
            FieldId::Link,
            FieldId::Location,
            FieldId::MaxForwards,
            FieldId::Origin,
            FieldId::Pragma,
            FieldId::ProxyAuthenticate,
            FieldId::ProxyAuthorization,
            FieldId::ProxyConnection,
            FieldId::PublicKeyPins,
            FieldId::Range,
            FieldId::Referer,
            FieldId::ReferrerPolicy,
            FieldId::Refresh,
            FieldId::RetryAfter,
            FieldId::SecWebSocketAccept,
            FieldId::SecWebSocketExtensions,
            FieldId::SecWebSocketKey,
            FieldId::SecWebSocketProtocol,
            FieldId::SecWebSocketVersion,
            FieldId::Server,
            FieldId::SetCookie,
            FieldId::StrictTransportSecurity,
            FieldId::Te,
            FieldId::Trailer,
            FieldId::TransferEncoding,
            FieldId::Upgrade,
            FieldId::UpgradeInsecureRequests,
            FieldId::UserAgent,
            FieldId::Vary,
            FieldId::Via,
            FieldId::Warning,
            FieldId::WwwAuthenticate,
            FieldId::XContentTypeOptions,
            FieldId::XDnsPrefetchControl,
            FieldId::XForwardedFor,
            FieldId::XForwardedHost,
            FieldId::XForwardedProto,
            FieldId::XFrameOptions,
            FieldId::XRequestedWith,
            FieldId::XRequestId,
            FieldId::XXssProtection,
        ];
        ALL.get(v as usize).copied().unwrap_or(FieldId::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldId, NAMES};

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(FieldId::lookup(b"content-length"), FieldId::ContentLength);
        assert_eq!(FieldId::lookup(b"Content-Length"), FieldId::ContentLength);
        assert_eq!(FieldId::lookup(b"CONTENT-LENGTH"), FieldId::ContentLength);
        assert_eq!(FieldId::lookup(b"tE"), FieldId::Te);
    }

    #[test]
    fn unknown_names() {
        assert_eq!(FieldId::lookup(b"X-Made-Up"), FieldId::Unknown);
        assert_eq!(FieldId::lookup(b""), FieldId::Unknown);
        assert_eq!(FieldId::Unknown.name(), None);
    }

    #[test]
    fn discriminant_round_trip() {
        for i in 0..NAMES.len() as u32 {
            let id = FieldId::from_u32(i);
            assert_eq!(id.to_u32(), i);
            if let Some(name) = id.name() {
                assert_eq!(FieldId::lookup(name.as_bytes()), id);
            }
        }
        assert_eq!(FieldId::from_u32(9999), FieldId::Unknown);
    }

    #[test]
    fn canonical_spelling() {
        assert_eq!(FieldId::TransferEncoding.name(), Some("Transfer-Encoding"));
        assert_eq!(FieldId::Etag.name(), Some("ETag"));
        assert_eq!(FieldId::WwwAuthenticate.name(), Some("WWW-Authenticate"));
    }
}
