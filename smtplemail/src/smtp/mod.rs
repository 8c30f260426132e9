//! Module dedicated to the SMTP transport.
//!
//! This module contains everything needed to deliver a message to an
//! SMTP relay in a single attempt. The delivery goes through a fixed
//! sequence of [`Stage`]s, and the first failing stage aborts it.

mod client;
pub mod config;
mod error;
mod reply;
mod stream;
mod tls;

use tracing::{debug, warn};

#[doc(inline)]
pub use self::{
    client::{write_dot_stuffed, SmtpClient},
    config::{SmtpConfig, SmtpSecurity},
    error::{Cause, Error, Result, Stage},
    reply::Reply,
};
use crate::send::{Envelope, SendMessage};

/// Deliver the given message to the given recipients.
///
/// The message is expected to be already rewritten: it is sent as
/// it is, only dot-stuffed.
pub fn deliver(config: &SmtpConfig, from: &str, rcpts: &[String], msg: &[u8]) -> Result<()> {
    debug!(host = %config.host, port = config.port, security = %config.security, "delivering message");

    let mut client = SmtpClient::connect(config).map_err(at(Stage::Connect))?;
    client.greet().map_err(at(Stage::Handshake))?;
    let mut ehlo = client
        .ehlo(&config.helo_name)
        .map_err(at(Stage::Handshake))?;

    if config.is_start_tls_enabled() && ehlo.has_extension("STARTTLS") {
        client = client
            .start_tls(config)
            .map_err(at(Stage::SecureUpgrade))?;
        ehlo = client
            .ehlo(&config.helo_name)
            .map_err(at(Stage::SecureUpgrade))?;
    }

    if config.is_encryption_enabled() && !client.is_encrypted() {
        warn!(host = %config.host, "server does not advertise STARTTLS, continuing in clear text");
    }

    if config.has_credentials() {
        client
            .authenticate(config, &ehlo)
            .map_err(at(Stage::Authenticate))?;
    } else {
        debug!("no smtp login configured, skipping authentication");
    }

    client.mail_from(from).map_err(at(Stage::EnvelopeFrom))?;

    for rcpt in rcpts {
        client.rcpt_to(rcpt).map_err(at(Stage::EnvelopeTo))?;
    }

    client.data(msg).map_err(at(Stage::Data))?;
    client.quit();

    Ok(())
}

fn at(stage: Stage) -> impl FnOnce(Cause) -> Error {
    move |cause| Error::DeliverError(stage, cause)
}

/// The SMTP message sender.
#[derive(Clone, Debug)]
pub struct SmtpSender {
    config: SmtpConfig,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

impl SendMessage for SmtpSender {
    fn send_message(&self, envelope: &Envelope, msg: &[u8]) -> crate::Result<()> {
        debug!(host = %self.config.host, "sending message via smtp");
        deliver(&self.config, &envelope.from, &envelope.to, msg)?;
        Ok(())
    }
}
