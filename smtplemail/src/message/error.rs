use std::result;

use mailparse::MailParseError;
use thiserror::Error;

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse empty message")]
    ParseEmptyMessageError,
    #[error("cannot parse message header block")]
    ParseHeadersError(#[source] MailParseError),
    #[error("cannot parse header at line {0}: missing colon separator")]
    ParseHeaderMissingColonError(usize),
    #[error("cannot parse header at line {0}: invalid field name {1:?}")]
    ParseHeaderNameError(usize, String),
    #[error("cannot parse header at line {0}: continuation line without header")]
    ParseHeaderContinuationError(usize),
    #[error("cannot parse address {1:?}")]
    ParseAddressError(#[source] MailParseError, String),
    #[error("cannot parse address {0:?}: expected exactly one mailbox")]
    ParseSingleMailboxError(String),
    #[error("cannot parse address {0:?}: expected local@domain")]
    InvalidAddressError(String),
    #[error("cannot parse recipients from header {1}")]
    ParseRecipientsError(#[source] MailParseError, String),
    #[error("cannot find sender: no address given by -f, send_from or From header")]
    MissingSenderError,
}

impl Error {
    pub fn is_missing_sender(&self) -> bool {
        matches!(self, Self::MissingSenderError)
    }
}
