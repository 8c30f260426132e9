//! Module dedicated to message submission.
//!
//! This module glues the message transformation and the transport
//! together: recipients are resolved, the message is rewritten, then
//! handed to a [`SendMessage`] implementation.

use std::{
    io::{self, Read},
    result,
};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    message::{transform_message, FromOverrides, Message},
    Config,
};

/// The `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot send message without recipient")]
    MissingRecipientError,
    #[error("cannot send message to invalid recipient {0:?}")]
    InvalidRecipientError(String),
    #[error("cannot read message from standard input")]
    ReadMessageError(#[source] io::Error),
}

/// The SMTP envelope.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Envelope {
    /// The bare sender address.
    pub from: String,

    /// The bare recipient addresses.
    pub to: Vec<String>,
}

pub trait SendMessage {
    /// Send the given raw message using the given envelope.
    fn send_message(&self, envelope: &Envelope, msg: &[u8]) -> crate::Result<()>;
}

/// What was asked on the command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Submission {
    /// The recipients given as arguments.
    pub recipients: Vec<String>,

    /// Read recipients from the `To`, `Cc` and `Bcc` headers instead
    /// of the arguments (`-t`).
    pub extract_recipients: bool,

    /// The sender overrides (`-f` and `-F`).
    pub overrides: FromOverrides,
}

impl Submission {
    fn resolve_recipients(&self, msg: &Message<'_>) -> crate::Result<Vec<String>> {
        let rcpts = if self.extract_recipients {
            if !self.recipients.is_empty() {
                debug!(args = ?self.recipients, "ignoring recipient arguments in favor of headers");
            }
            msg.recipients()?
        } else {
            self.recipients
                .iter()
                .map(|rcpt| rcpt.trim())
                .filter(|rcpt| !rcpt.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        };

        if rcpts.is_empty() {
            return Err(Error::MissingRecipientError.into());
        }

        // recipients end up on SMTP command lines
        if let Some(rcpt) = rcpts.iter().find(|rcpt| rcpt.contains(char::is_control)) {
            return Err(Error::InvalidRecipientError(rcpt.clone()).into());
        }

        Ok(rcpts)
    }
}

/// Read the whole message from the given reader.
pub fn read_message(mut reader: impl Read) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(Error::ReadMessageError)?;
    debug!(len = raw.len(), "read raw message");
    Ok(raw)
}

/// Submit the given raw message.
///
/// Every check is done before the sender is called, so that
/// invalid submissions never reach the network. Return the envelope
/// the message was sent with.
pub fn submit(
    config: &Config,
    submission: &Submission,
    raw: &[u8],
    sender: &impl SendMessage,
) -> crate::Result<Envelope> {
    let msg = Message::parse(raw)?;
    let to = submission.resolve_recipients(&msg)?;

    let transformed = transform_message(&msg, config.send_from.as_deref(), &submission.overrides)?;

    let envelope = Envelope {
        from: transformed.envelope_from().to_owned(),
        to,
    };

    sender.send_message(&envelope, &transformed.message)?;
    info!(from = %envelope.from, to = ?envelope.to, "message sent successfully");

    Ok(envelope)
}
