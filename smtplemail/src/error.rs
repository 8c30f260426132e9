use std::result;

use thiserror::Error;

use crate::{config, message, send, smtp};

/// The global `Result` alias of the library.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the library.
///
/// Each variant wraps the error of the module that raised it, which
/// gives the three families of fatal conditions: input errors
/// ([`message::Error`]), configuration errors ([`config::Error`] and
/// the missing sender or recipient cases) and transport errors
/// ([`smtp::Error`]).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ConfigError(#[from] config::Error),
    #[error(transparent)]
    MessageError(#[from] message::Error),
    #[error(transparent)]
    SendError(#[from] send::Error),
    #[error(transparent)]
    SmtpError(#[from] smtp::Error),
}

impl Error {
    /// Return `true` if the error was raised before any network
    /// activity because of the configuration.
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::ConfigError(_) => true,
            Self::MessageError(err) => err.is_missing_sender(),
            Self::SendError(send::Error::MissingRecipientError) => true,
            _ => false,
        }
    }

    /// Return `true` if the error comes from the transport.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::SmtpError(_))
    }

    /// Map the error to the exit status code conventionally used by
    /// sendmail implementations (see `sysexits.h`).
    pub fn exit_code(&self) -> u8 {
        if self.is_config_error() {
            78 // EX_CONFIG
        } else if self.is_transport_error() {
            75 // EX_TEMPFAIL
        } else {
            65 // EX_DATAERR
        }
    }
}
