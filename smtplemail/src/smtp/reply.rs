//! Module dedicated to SMTP replies.

use std::fmt;

use super::Cause;

/// The SMTP reply structure.
///
/// A reply is made of one or more lines sharing the same code, all
/// lines but the last one using a dash after the code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    /// Return `true` for 2xx codes.
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Return `true` for 3xx codes.
    pub fn is_positive_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    pub fn text(&self) -> String {
        self.lines.join(" ")
    }

    /// Return `true` if the reply to `EHLO` advertises the given
    /// extension.
    ///
    /// The first line holds the server greeting, each following line
    /// starts with an extension keyword, optionally followed by
    /// parameters (`AUTH PLAIN LOGIN`, or the legacy `AUTH=PLAIN`).
    pub fn has_extension(&self, ext: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split([' ', '='])
                .next()
                .is_some_and(|keyword| keyword.eq_ignore_ascii_case(ext))
        })
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text())
    }
}

/// Parse one line of a reply.
///
/// Return the code, whether the line is the last of the reply and
/// the text following the code.
pub(crate) fn parse_line(line: &str) -> Result<(u16, bool, &str), Cause> {
    let bytes = line.as_bytes();
    let invalid = || Cause::ParseReplyError(line.to_owned());

    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    let code = line[..3].parse::<u16>().map_err(|_| invalid())?;

    match bytes.get(3) {
        None => Ok((code, true, "")),
        Some(b' ') => Ok((code, true, &line[4..])),
        Some(b'-') => Ok((code, false, &line[4..])),
        Some(_) => Err(invalid()),
    }
}
