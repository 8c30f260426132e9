use tracing::debug;

use super::{Error, Mailbox, Message, Result, FROM};

/// The sender overrides given on the command line.
///
/// They match the `-f` and `-F` flags of sendmail.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FromOverrides {
    /// The envelope sender address (`-f`).
    pub address: Option<String>,

    /// The sender full name (`-F`).
    pub full_name: Option<String>,
}

impl FromOverrides {
    pub fn new(address: Option<impl ToString>, full_name: Option<impl ToString>) -> Self {
        Self {
            address: address.map(|addr| addr.to_string()),
            full_name: full_name.map(|name| name.to_string()),
        }
    }

    fn address(&self) -> Option<&str> {
        non_empty(self.address.as_deref())
    }

    fn full_name(&self) -> Option<&str> {
        non_empty(self.full_name.as_deref())
    }
}

/// The rewritten message, ready for submission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transformed {
    /// The rewritten raw message.
    pub message: Vec<u8>,

    /// The resolved sender, also written in the `From` header.
    pub from: Mailbox,
}

impl Transformed {
    /// The bare address to use in the `MAIL FROM` command.
    pub fn envelope_from(&self) -> &str {
        self.from.addr()
    }
}

impl Message<'_> {
    /// Resolve the sender of the message.
    ///
    /// The base mailbox is the configured send-from address, or the
    /// first `From` header when there is none. The address override
    /// then replaces the address and the full name override replaces
    /// the display name.
    pub fn resolve_from(
        &self,
        configured_from: Option<&str>,
        overrides: &FromOverrides,
    ) -> Result<Mailbox> {
        let header_from = self.first_header(FROM).map(|header| header.value());

        let mut mailbox = match non_empty(configured_from) {
            Some(from) => {
                debug!(from, "using configured send-from address");
                Mailbox::parse(from)?
            }
            None => match non_empty(header_from.as_deref()) {
                Some(from) => {
                    debug!(from, "using From header address");
                    Mailbox::parse(from)?
                }
                None => Mailbox::default(),
            },
        };

        if let Some(addr) = overrides.address() {
            debug!(addr, "overriding sender address");
            mailbox.addr = Mailbox::parse(addr)?.addr;
        }

        if let Some(name) = overrides.full_name() {
            debug!(name, "overriding sender full name");
            mailbox.name = Some(name.to_owned());
        }

        if mailbox.addr.is_empty() {
            return Err(Error::MissingSenderError);
        }

        Ok(mailbox)
    }
}

/// Rewrite the given raw message for submission.
///
/// The sender is resolved from the configured send-from address and
/// the command line overrides (see [`Message::resolve_from`]), then
/// written as the one and only `From` header of the message.
pub fn transform(
    raw: &[u8],
    configured_from: Option<&str>,
    overrides: &FromOverrides,
) -> Result<Transformed> {
    let msg = Message::parse(raw)?;
    transform_message(&msg, configured_from, overrides)
}

pub(crate) fn transform_message(
    msg: &Message<'_>,
    configured_from: Option<&str>,
    overrides: &FromOverrides,
) -> Result<Transformed> {
    let from = msg.resolve_from(configured_from, overrides)?;
    debug!(%from, "resolved message sender");

    Ok(Transformed {
        message: msg.to_vec_with_from(&from),
        from,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
