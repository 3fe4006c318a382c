//! Compressor input: request pseudo-headers and the raw HTTP/1-style header
//! blob that accompanies them.

use std::borrow::Cow;

use crate::compressor::IndexPolicy;
use crate::table::HeaderField;

/// Names that only make sense on a single HTTP/1 hop.
const CONNECTION_SPECIFIC: &[&[u8]] = &[
    b"connection",
    b"host",
    b"keep-alive",
    b"proxy-connection",
    b"te",
    b"transfer-encoding",
    b"upgrade",
];

/// Cookie crumbs shorter than this are never added to a table.
const COOKIE_INDEX_THRESHOLD: usize = 20;

/// Dropped from outbound blobs.
pub(crate) fn is_connection_specific(name: &[u8]) -> bool {
    CONNECTION_SPECIFIC.contains(&name)
}

/// Lower-cased `field`, or `None` when its name is connection-specific.
pub(crate) fn normalize(field: &HeaderField) -> Option<Cow<'_, HeaderField>> {
    let field = if field.name.iter().any(u8::is_ascii_uppercase) {
        let name = field.name.to_ascii_lowercase();
        Cow::Owned(HeaderField::new(name, field.value.clone()))
    } else {
        Cow::Borrowed(field)
    };
    (!is_connection_specific(&field.name)).then_some(field)
}

/// Rejected in decoded blocks.
pub(crate) fn is_disallowed_inbound(name: &[u8]) -> bool {
    is_connection_specific(name) || name == b"accept-encoding"
}

/// Where a request is directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTarget<'a> {
    /// Regular request: `:path`, `:authority` and `:scheme`.
    Origin {
        path: &'a [u8],
        authority: &'a [u8],
        scheme: &'a [u8],
    },
    /// CONNECT-style request: `:authority` only.
    Connect { authority: &'a [u8] },
}

/// Request pseudo-headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHead<'a> {
    pub method: &'a [u8],
    pub target: RequestTarget<'a>,
}

impl<'a> RequestHead<'a> {
    pub fn new(method: &'a [u8], path: &'a [u8], authority: &'a [u8], scheme: &'a [u8]) -> Self {
        Self {
            method,
            target: RequestTarget::Origin {
                path,
                authority,
                scheme,
            },
        }
    }

    pub fn connect(authority: &'a [u8]) -> Self {
        Self {
            method: b"CONNECT",
            target: RequestTarget::Connect { authority },
        }
    }

    /// Pseudo-header fields in wire order.
    pub(crate) fn fields(&self) -> Vec<HeaderField> {
        let mut fields = vec![HeaderField::new(b":method", self.method)];
        match self.target {
            RequestTarget::Origin {
                path,
                authority,
                scheme,
            } => {
                fields.push(HeaderField::new(b":path", path));
                fields.push(HeaderField::new(b":authority", authority));
                fields.push(HeaderField::new(b":scheme", scheme));
            }
            RequestTarget::Connect { authority } => {
                fields.push(HeaderField::new(b":authority", authority));
            }
        }
        fields
    }
}

/// A tokenized header blob.
#[derive(Debug, Default)]
pub(crate) struct ParsedHeaders {
    pub(crate) fields: Vec<(HeaderField, IndexPolicy)>,
    pub(crate) content_length: Option<u64>,
}

/// Split a CRLF-joined blob into lower-cased name/value pairs, dropping
/// connection-specific names and crumbling cookies.
pub(crate) fn tokenize(raw: &[u8]) -> ParsedHeaders {
    let mut parsed = ParsedHeaders::default();

    for line in raw.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let name = line[..colon].trim_ascii().to_ascii_lowercase();
        if name.is_empty() || is_connection_specific(&name) {
            continue;
        }
        let value = trim_http_whitespace(&line[colon + 1..]);

        match name.as_slice() {
            b"cookie" => {
                for crumb in SplitSeq::new(value, b"; ").filter(|crumb| !crumb.is_empty()) {
                    let policy = if crumb.len() < COOKIE_INDEX_THRESHOLD {
                        IndexPolicy::NeverIndex
                    } else {
                        IndexPolicy::Incremental
                    };
                    let field = HeaderField::new(name.clone(), crumb);
                    parsed.fields.push((field, policy));
                }
            }
            b"expect" => {
                let remaining = strip_100_continue(value);
                if !remaining.is_empty() {
                    let field = HeaderField::new(name, remaining);
                    parsed.fields.push((field, IndexPolicy::Incremental));
                }
            }
            _ => {
                if name == b"content-length" {
                    parsed.content_length = std::str::from_utf8(value)
                        .ok()
                        .and_then(|v| v.parse().ok());
                }
                let field = HeaderField::new(name, value);
                parsed.fields.push((field, IndexPolicy::Incremental));
            }
        }
    }

    parsed
}

fn trim_http_whitespace(value: &[u8]) -> &[u8] {
    let start = value
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(value.len());
    let end = value
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map_or(start, |i| i + 1);
    &value[start..end]
}

/// Remove the `100-continue` expectation from a comma-separated list.
fn strip_100_continue(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for token in value.split(|&b| b == b',') {
        let token = trim_http_whitespace(token);
        if token.is_empty() || token.eq_ignore_ascii_case(b"100-continue") {
            continue;
        }
        if !out.is_empty() {
            out.extend_from_slice(b", ");
        }
        out.extend_from_slice(token);
    }
    out
}

/// Split on a multi-byte separator.
struct SplitSeq<'a> {
    rest: Option<&'a [u8]>,
    sep: &'static [u8],
}

impl<'a> SplitSeq<'a> {
    fn new(haystack: &'a [u8], sep: &'static [u8]) -> Self {
        Self {
            rest: Some(haystack),
            sep,
        }
    }
}

impl<'a> Iterator for SplitSeq<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest?;
        match rest.windows(self.sep.len()).position(|w| w == self.sep) {
            Some(at) => {
                self.rest = Some(&rest[at + self.sep.len()..]);
                Some(&rest[..at])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}
