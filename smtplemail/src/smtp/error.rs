use std::{fmt, io, result};

use thiserror::Error;

use super::Reply;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The stage of the delivery.
///
/// Stages are run in this order, the first failing one aborts the
/// whole delivery.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Connect,
    Handshake,
    SecureUpgrade,
    Authenticate,
    EnvelopeFrom,
    EnvelopeTo,
    Data,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Handshake => write!(f, "handshake"),
            Self::SecureUpgrade => write!(f, "secure upgrade"),
            Self::Authenticate => write!(f, "authenticate"),
            Self::EnvelopeFrom => write!(f, "envelope from"),
            Self::EnvelopeTo => write!(f, "envelope to"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse smtp security {0:?}: expected SSL, TLS or None")]
    ParseSecurityError(String),
    #[error("cannot deliver message at stage {0}")]
    DeliverError(Stage, #[source] Cause),
}

impl Error {
    /// Return the stage that failed, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::DeliverError(stage, _) => Some(*stage),
            _ => None,
        }
    }

    /// Return the server reply that made the stage fail, if any.
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::DeliverError(_, Cause::UnexpectedReplyError(reply)) => Some(reply),
            _ => None,
        }
    }
}

/// The underlying cause of a failed stage.
#[derive(Debug, Error)]
pub enum Cause {
    #[error("cannot resolve address of smtp server {0}")]
    ResolveAddressError(String),
    #[error("cannot use {0:?} as tls server name")]
    InvalidServerNameError(String),
    #[error("server replied {0}")]
    UnexpectedReplyError(Reply),
    #[error("cannot parse server reply {0:?}")]
    ParseReplyError(String),
    #[error("cannot send command containing a line break")]
    CommandLineBreakError,
    #[error("connection closed by server")]
    ConnectionClosedError,
    #[error("server sent data before the tls handshake")]
    StartTlsInjectionError,
    #[error("connection is already encrypted")]
    AlreadyEncryptedError,
    #[error("server does not advertise AUTH extension")]
    AuthNotAdvertisedError,
    #[error("cannot send credentials over unencrypted connection to {0}")]
    AuthUnencryptedError(String),

    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error(transparent)]
    TlsError(#[from] rustls::Error),
}
