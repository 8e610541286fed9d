use std::collections::HashMap;

/// Header carrying the decimal byte count of the payload that follows the
/// header block. Absence means the request carries no payload.
pub const CONTENT_LENGTH: &str = "content-length";

/// Header carrying the sender's hex SHA-1 digest of the decoded payload.
/// Absence means an install is refused.
pub const FILEHASH: &str = "X-filehash";

/// Request verbs the receiver accepts.
///
/// All four trigger identical handling; whether an install happens is
/// decided by the headers, not the verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
}

impl Method {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            _ => None,
        }
    }
}

/// A parsed update request.
///
/// Built once per connection from the header block and immutable from then
/// on. `path` is the absolute target path on the device's filesystem;
/// `version` is the numeric part of the protocol token (e.g. "1.1").
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub version: String,
    /// Header names exactly as the peer sent them
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Looks up a header by its exact name as received.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    /// Looks up a header tolerating the peer's choice of casing, so both
    /// `content-length` and `Content-Length` resolve.
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared payload length in bytes. `None` when the header is absent
    /// or not a decimal number; either way the request carries no payload.
    pub fn content_length(&self) -> Option<usize> {
        self.header_ignore_case(CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
    }

    /// The sender's declared digest of the decoded payload.
    pub fn filehash(&self) -> Option<&str> {
        self.header_ignore_case(FILEHASH)
    }
}
