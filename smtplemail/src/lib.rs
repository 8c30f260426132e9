//! Sendmail-compatible library to relay messages to a remote SMTP
//! server.
//!
//! The main purpose of this library is to back the `smtplemail`
//! command, a drop-in replacement for `/usr/bin/sendmail` on hosts
//! that do not run a local MTA: the raw message read from standard
//! input is rewritten then submitted, in a single attempt, to the
//! configured SMTP relay.
//!
//! The submission is split in two halves:
//!
//! - [`message`] parses the raw message, resolves the envelope
//!   sender and rewrites the `From` header while keeping the rest of
//!   the message untouched.
//!
//! - [`smtp`] connects to the relay (plain, implicit TLS or
//!   STARTTLS), authenticates then runs the `MAIL`, `RCPT` and `DATA`
//!   commands.
//!
//! Both halves are glued together by [`send::submit`], which takes
//! its settings from an immutable [`Config`].

pub mod config;
mod error;
pub mod log;
pub mod message;
pub mod send;
pub mod smtp;

#[doc(inline)]
pub use self::{
    config::Config,
    error::{Error, Result},
    message::{Mailbox, Message},
    send::{submit, SendMessage, Submission},
    smtp::{SmtpConfig, SmtpSecurity, SmtpSender},
};
