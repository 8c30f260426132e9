//! Module dedicated to mailboxes.
//!
//! A mailbox is the `Name <local@domain>` form found in address
//! headers. It is used both as the envelope identity (the bare
//! address goes to the `MAIL FROM` command) and as the value of the
//! rewritten `From` header.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use mailparse::{addrparse, MailAddr};

use super::{Error, Result};

/// Characters that cannot appear unquoted in a display name.
const SPECIALS: [char; 12] = ['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '"'];

/// Maximum length in bytes of the text carried by one encoded word,
/// so that the word fits in 75 characters once base64 encoded.
const ENCODED_WORD_MAX_LEN: usize = 45;

/// The mailbox structure.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Mailbox {
    /// The optional display name.
    pub name: Option<String>,

    /// The bare email address.
    pub addr: String,
}

impl Mailbox {
    /// Parse a mailbox using RFC 5322 address syntax.
    ///
    /// Both the bare `local@domain` and the `Name <local@domain>`
    /// forms are accepted. Lists, groups and addresses without a
    /// local part or a domain are rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let addrs = addrparse(value).map_err(|err| Error::ParseAddressError(err, value.into()))?;
        let mut addrs = addrs.iter();

        let info = match (addrs.next(), addrs.next()) {
            (Some(MailAddr::Single(info)), None) => info.clone(),
            _ => return Err(Error::ParseSingleMailboxError(value.into())),
        };

        if !is_valid_addr(&info.addr) {
            return Err(Error::InvalidAddressError(value.into()));
        }

        let name = info
            .display_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());

        Ok(Self {
            name,
            addr: info.addr,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) if !name.is_ascii() || name.contains(char::is_control) => {
                write!(f, "{} <{}>", encode_words(name).join(" "), self.addr)
            }
            Some(name) if name.contains(SPECIALS) => {
                let name = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{name}\" <{}>", self.addr)
            }
            Some(name) => write!(f, "{name} <{}>", self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}

/// Encode the given display name as RFC 2047 encoded words.
///
/// The name is split on character boundaries, each chunk becoming
/// one `=?utf-8?b?…?=` word.
fn encode_words(name: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    for (i, c) in name.char_indices() {
        if i + c.len_utf8() - start > ENCODED_WORD_MAX_LEN {
            chunks.push(&name[start..i]);
            start = i;
        }
    }

    chunks.push(&name[start..]);
    chunks
        .into_iter()
        .map(|chunk| format!("=?utf-8?b?{}?=", STANDARD.encode(chunk)))
        .collect()
}

fn is_valid_addr(addr: &str) -> bool {
    if addr.contains(['<', '>']) || addr.chars().any(char::is_control) {
        return false;
    }

    match addr.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains(char::is_whitespace)
        }
        None => false,
    }
}
