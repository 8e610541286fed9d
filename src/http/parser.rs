use std::collections::HashMap;

use crate::http::request::{Method, Request};

#[derive(Debug)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
}

/// Parses the raw header block, as returned by `read_until(b"\r\n\r\n")`,
/// into a [`Request`].
///
/// The request line is strict: a bad verb, path or protocol token aborts
/// the connection. Header lines are lenient: anything that does not look
/// like `Token: value` (trailing blank lines, stray garbage) is skipped.
pub fn parse_request(header: &[u8]) -> Result<Request, ParseError> {
    let text = std::str::from_utf8(header).map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = text.split("\r\n");

    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let (method, path, version) = parse_request_line(request_line)?;

    let mut headers = HashMap::new();

    for line in lines {
        let Some((name, value)) = split_header_line(line) else {
            continue;
        };
        headers.insert(name.to_string(), value.to_string());
    }

    Ok(Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
    })
}

/// `VERB SP PATH SP "HTTP/" VERSION`, tokenized on whitespace.
fn parse_request_line(line: &str) -> Result<(Method, &str, &str), ParseError> {
    let mut parts = line.split_whitespace();

    let verb = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let protocol = parts.next().ok_or(ParseError::InvalidRequest)?;

    let method = Method::from_str(verb).ok_or(ParseError::InvalidMethod)?;

    let version = protocol
        .strip_prefix("HTTP/")
        .ok_or(ParseError::InvalidRequest)?;

    if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(ParseError::InvalidRequest);
    }

    Ok((method, path, version))
}

/// `Token: value` where the token is ASCII letters and hyphens and the
/// separator is a literal colon-space. Returns `None` for anything else.
fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(": ")?;

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return None;
    }

    Some((name, value.trim()))
}
