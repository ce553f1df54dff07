//! HTTP-Version for HTTP/1.x messages.

use std::fmt;

/// The version of a parsed or constructed HTTP/1 message.
///
/// Only the two HTTP/1 minor versions are representable; anything else
/// on the wire is a `BadVersion` parse error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Version {
    /// `HTTP/1.0`
    Http10,
    /// `HTTP/1.1`
    Http11,
}

impl Version {
    /// The start-line text for this version.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl Default for Version {
    fn default() -> Version {
        Version::Http11
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
