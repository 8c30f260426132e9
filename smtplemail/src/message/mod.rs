//! Module dedicated to messages.
//!
//! This module contains the [`Message`] parsed from the raw bytes
//! read on standard input, as well as everything needed to rewrite
//! it before submission: envelope identity resolution, `From` header
//! normalization and recipients extraction.
//!
//! The header block is split by [`mailparse::parse_headers`], then
//! checked field by field. The body is never decoded: it is given
//! back byte-for-byte when the message is rewritten.

pub mod address;
mod error;
mod transform;

use std::str;

use mailparse::{addrparse, parse_headers, MailAddr, MailHeader};
use tracing::{debug, trace};

#[doc(inline)]
pub use self::{
    address::Mailbox,
    error::{Error, Result},
    transform::{transform, FromOverrides, Transformed},
};
pub(crate) use self::transform::transform_message;

pub const FROM: &str = "From";
pub const TO: &str = "To";
pub const CC: &str = "Cc";
pub const BCC: &str = "Bcc";

const CRLF: &[u8] = b"\r\n";

/// The message header structure.
///
/// The value is kept raw: it starts after the colon and the leading
/// whitespace, and may span several folded lines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header<'a> {
    name: &'a str,
    value: &'a [u8],
}

impl<'a> Header<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Return `true` if the header name matches the given one,
    /// ignoring ASCII case.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Return the unfolded value, lossily decoded as UTF-8.
    pub fn value(&self) -> String {
        let value: Vec<u8> = self
            .value
            .iter()
            .copied()
            .filter(|b| *b != b'\r' && *b != b'\n')
            .collect();
        String::from_utf8_lossy(&value).into_owned()
    }

    /// Return the raw value, continuation lines joined by CRLF.
    pub fn raw_value(&self) -> Vec<u8> {
        self.value
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .collect::<Vec<_>>()
            .join(CRLF)
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        write_header(buf, self.name, &self.raw_value());
    }
}

/// The message structure.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message<'a> {
    headers: Vec<Header<'a>>,
    body: &'a [u8],
}

impl<'a> Message<'a> {
    /// Parse the given raw message.
    ///
    /// Lines can end either with CRLF or with a bare LF. The header
    /// block stops at the first empty line, everything after it is
    /// the body. A message without empty line only has headers.
    ///
    /// On top of [`mailparse::parse_headers`], every field must have
    /// a colon separator and a printable US-ASCII name, and the block
    /// cannot start with a continuation line.
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::ParseEmptyMessageError);
        }

        // later continuation lines are folded into their header
        if raw[0] == b' ' || raw[0] == b'\t' {
            return Err(Error::ParseHeaderContinuationError(1));
        }

        let (parsed, body_offset) = parse_headers(raw).map_err(Error::ParseHeadersError)?;

        let headers = parsed
            .iter()
            .map(|header| validate_header(raw, header))
            .collect::<Result<Vec<_>>>()?;

        debug!(headers = headers.len(), "parsed message header block");

        Ok(Self {
            headers,
            body: &raw[body_offset..],
        })
    }

    pub fn headers(&self) -> &[Header<'a>] {
        &self.headers
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Iterate over the headers matching the given name, in order.
    pub fn headers_named<'b>(&'b self, name: &'b str) -> impl Iterator<Item = &'b Header<'a>> {
        self.headers.iter().filter(move |header| header.is(name))
    }

    pub fn first_header(&self, name: &str) -> Option<&Header<'a>> {
        self.headers.iter().find(|header| header.is(name))
    }

    /// Extract recipients from the `To`, `Cc` and `Bcc` headers.
    ///
    /// Addresses are collected from all `To` headers first, then
    /// from `Cc` and finally from `Bcc`. Group members are flattened
    /// in place. Duplicates are kept.
    pub fn recipients(&self) -> Result<Vec<String>> {
        let mut rcpts = Vec::new();

        for name in [TO, CC, BCC] {
            for header in self.headers_named(name) {
                let value = header.value();

                if value.trim().is_empty() {
                    continue;
                }

                let addrs = addrparse(&value)
                    .map_err(|err| Error::ParseRecipientsError(err, header.name().to_owned()))?;

                for addr in addrs.iter() {
                    match addr {
                        MailAddr::Single(info) => rcpts.push(info.addr.clone()),
                        MailAddr::Group(group) => {
                            rcpts.extend(group.addrs.iter().map(|info| info.addr.clone()))
                        }
                    }
                }
            }
        }

        debug!(?rcpts, "extracted recipients from headers");
        Ok(rcpts)
    }

    /// Serialize the message with the given `From` header.
    ///
    /// The first `From` header is replaced in place, the next ones
    /// are dropped. When the message has no `From` header, one is
    /// appended after all the others. Other headers are written back
    /// in their original order, followed by an empty line and the
    /// untouched body.
    pub fn to_vec_with_from(&self, from: &Mailbox) -> Vec<u8> {
        let from = from.to_string();
        let mut buf = Vec::with_capacity(self.body.len() + 1024);
        let mut from_written = false;

        for header in &self.headers {
            if !header.is(FROM) {
                header.write_to(&mut buf);
            } else if !from_written {
                write_header(&mut buf, FROM, from.as_bytes());
                from_written = true;
            } else {
                trace!("dropping duplicate From header");
            }
        }

        if !from_written {
            write_header(&mut buf, FROM, from.as_bytes());
        }

        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(self.body);
        buf
    }
}

/// Locate the given part of the header block in the raw message.
///
/// Slices given by [`MailHeader`] always point into the parsed
/// input, which gives back their position and the lifetime of the
/// raw message.
fn locate<'a>(raw: &'a [u8], part: &[u8]) -> (usize, &'a [u8]) {
    let start = part.as_ptr() as usize - raw.as_ptr() as usize;
    (start, &raw[start..start + part.len()])
}

fn validate_header<'a>(raw: &'a [u8], header: &MailHeader) -> Result<Header<'a>> {
    let (start, name) = locate(raw, header.get_key_raw());
    let (_, value) = locate(raw, header.get_value_raw());
    let line_num = raw[..start].iter().filter(|b| **b == b'\n').count() + 1;

    // a line without colon is taken whole as the field name
    if raw.get(start + name.len()) != Some(&b':') {
        return Err(Error::ParseHeaderMissingColonError(line_num));
    }

    let invalid_name = || {
        let name = String::from_utf8_lossy(name).into_owned();
        Error::ParseHeaderNameError(line_num, name)
    };

    // field names are printable US-ASCII, colon excluded
    if name.is_empty() || !name.iter().all(|b| (33..=126).contains(b)) {
        return Err(invalid_name());
    }

    let name = str::from_utf8(name).map_err(|_| invalid_name())?;

    let value_start = value
        .iter()
        .position(|b| *b != b' ' && *b != b'\t')
        .unwrap_or(value.len());

    Ok(Header {
        name,
        value: &value[value_start..],
    })
}

fn write_header(buf: &mut Vec<u8>, name: &str, value: &[u8]) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value);
    buf.extend_from_slice(CRLF);
}
