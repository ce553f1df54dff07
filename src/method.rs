//! The HTTP request method.

use std::fmt;
use std::str::FromStr;

/// The request method (verb).
///
/// Covers the RFC 7231 methods plus the WebDAV, CalDAV, UPnP and
/// Subversion extensions. A request whose method string matches none of
/// these parses as `Unknown`; the original string is preserved by the
/// message that carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// The method string is not one of the recognized verbs.
    ///
    /// Callers interested in the verb should use an interface which
    /// returns the original string, such as `RequestView::method_text`.
    Unknown,

    /// DELETE
    Delete,
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// CONNECT
    Connect,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,

    // WebDAV
    /// COPY
    Copy,
    /// LOCK
    Lock,
    /// MKCOL
    Mkcol,
    /// MOVE
    Move,
    /// PROPFIND
    Propfind,
    /// PROPPATCH
    Proppatch,
    /// SEARCH
    Search,
    /// UNLOCK
    Unlock,
    /// BIND
    Bind,
    /// REBIND
    Rebind,
    /// UNBIND
    Unbind,
    /// ACL
    Acl,

    // Subversion
    /// REPORT
    Report,
    /// MKACTIVITY
    Mkactivity,
    /// CHECKOUT
    Checkout,
    /// MERGE
    Merge,

    // UPnP
    /// M-SEARCH
    MSearch,
    /// NOTIFY
    Notify,
    /// SUBSCRIBE
    Subscribe,
    /// UNSUBSCRIBE
    Unsubscribe,

    // RFC 5789
    /// PATCH
    Patch,
    /// PURGE
    Purge,

    // CalDAV
    /// MKCALENDAR
    Mkcalendar,

    // RFC 2068, section 19.6.1.2
    /// LINK
    Link,
    /// UNLINK
    Unlink,
}

impl Method {
    /// Look up the verb for a method string.
    ///
    /// Matching is exact; method names are case-sensitive on the wire.
    pub fn from_bytes(s: &[u8]) -> Method {
        match s {
            b"DELETE" => Method::Delete,
            b"GET" => Method::Get,
            b"HEAD" => Method::Head,
            b"POST" => Method::Post,
            b"PUT" => Method::Put,
            b"CONNECT" => Method::Connect,
            b"OPTIONS" => Method::Options,
            b"TRACE" => Method::Trace,
            b"COPY" => Method::Copy,
            b"LOCK" => Method::Lock,
            b"MKCOL" => Method::Mkcol,
            b"MOVE" => Method::Move,
            b"PROPFIND" => Method::Propfind,
            b"PROPPATCH" => Method::Proppatch,
            b"SEARCH" => Method::Search,
            b"UNLOCK" => Method::Unlock,
            b"BIND" => Method::Bind,
            b"REBIND" => Method::Rebind,
            b"UNBIND" => Method::Unbind,
            b"ACL" => Method::Acl,
            b"REPORT" => Method::Report,
            b"MKACTIVITY" => Method::Mkactivity,
            b"CHECKOUT" => Method::Checkout,
            b"MERGE" => Method::Merge,
            b"M-SEARCH" => Method::MSearch,
            b"NOTIFY" => Method::Notify,
            b"SUBSCRIBE" => Method::Subscribe,
            b"UNSUBSCRIBE" => Method::Unsubscribe,
            b"PATCH" => Method::Patch,
            b"PURGE" => Method::Purge,
            b"MKCALENDAR" => Method::Mkcalendar,
            b"LINK" => Method::Link,
            b"UNLINK" => Method::Unlink,
            _ => Method::Unknown,
        }
    }

    /// The canonical text for a recognized verb.
    ///
    /// Returns `None` for `Unknown`; the wire string lives in the message
    /// that parsed it.
    pub fn as_str(&self) -> Option<&'static str> {
        Some(match *self {
            Method::Unknown => return None,
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Copy => "COPY",
            Method::Lock => "LOCK",
            Method::Mkcol => "MKCOL",
            Method::Move => "MOVE",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Search => "SEARCH",
            Method::Unlock => "UNLOCK",
            Method::Bind => "BIND",
            Method::Rebind => "REBIND",
            Method::Unbind => "UNBIND",
            Method::Acl => "ACL",
            Method::Report => "REPORT",
            Method::Mkactivity => "MKACTIVITY",
            Method::Checkout => "CHECKOUT",
            Method::Merge => "MERGE",
            Method::MSearch => "M-SEARCH",
            Method::Notify => "NOTIFY",
            Method::Subscribe => "SUBSCRIBE",
            Method::Unsubscribe => "UNSUBSCRIBE",
            Method::Patch => "PATCH",
            Method::Purge => "PURGE",
            Method::Mkcalendar => "MKCALENDAR",
            Method::Link => "LINK",
            Method::Unlink => "UNLINK",
        })
    }

    /// Whether a method is considered "safe", meaning the request is
    /// essentially read-only.
    pub fn is_safe(&self) -> bool {
        matches!(
            *self,
            Method::Get | Method::Head | Method::Options | Method::Trace
        )
    }

    /// Whether a method is considered idempotent.
    pub fn is_idempotent(&self) -> bool {
        self.is_safe() || matches!(*self, Method::Put | Method::Delete)
    }
}

impl Default for Method {
    fn default() -> Method {
        Method::Get
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Method, ()> {
        match Method::from_bytes(s.as_bytes()) {
            Method::Unknown => Err(()),
            m => Ok(m),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("<unknown>"))
    }
}

#[cfg(test)]
mod tests {
    use super::Method;

    #[test]
    fn round_trip_known() {
        let verbs = [
            "DELETE",
            "GET",
            "HEAD",
            "POST",
            "PUT",
            "CONNECT",
            "OPTIONS",
            "TRACE",
            "COPY",
            "LOCK",
            "MKCOL",
            "MOVE",
            "PROPFIND",
            "PROPPATCH",
            "SEARCH",
            "UNLOCK",
            "BIND",
            "REBIND",
            "UNBIND",
            "ACL",
            "REPORT",
            "MKACTIVITY",
            "CHECKOUT",
            "MERGE",
            "M-SEARCH",
            "NOTIFY",
            "SUBSCRIBE",
            "UNSUBSCRIBE",
            "PATCH",
            "PURGE",
            "MKCALENDAR",
            "LINK",
            "UNLINK",
        ];
        for verb in &verbs {
            let m = Method::from_bytes(verb.as_bytes());
            assert_ne!(m, Method::Unknown, "{}", verb);
            assert_eq!(m.as_str(), Some(*verb));
        }
    }

    #[test]
    fn unknown_is_not_case_folded() {
        assert_eq!(Method::from_bytes(b"get"), Method::Unknown);
        assert_eq!(Method::from_bytes(b"FOO"), Method::Unknown);
        assert_eq!(Method::Unknown.as_str(), None);
    }

    #[test]
    fn safety() {
        assert!(Method::Get.is_safe());
        assert!(!Method::Post.is_safe());
        assert!(Method::Put.is_idempotent());
        assert!(!Method::Patch.is_idempotent());
    }
}
