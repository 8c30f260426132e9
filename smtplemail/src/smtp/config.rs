//! Module dedicated to the SMTP transport configuration.
//!
//! This module contains the configuration needed to reach the SMTP
//! relay: address, credentials and transport security.

use std::{fmt, str::FromStr, time::Duration};

use super::Error;

pub const DEFAULT_PORT: u16 = 25;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HELO_NAME: &str = "localhost";

/// The SMTP transport configuration.
#[derive(Clone, Eq, PartialEq)]
pub struct SmtpConfig {
    /// The SMTP server host name.
    pub host: String,

    /// The SMTP server host port.
    pub port: u16,

    /// The SMTP transport security mode.
    pub security: SmtpSecurity,

    /// The SMTP server login.
    ///
    /// Authentication is skipped when the login is empty.
    pub login: String,

    /// The SMTP server password.
    pub password: String,

    /// The timeout applied to connect, read and write operations.
    pub timeout: Duration,

    /// Verify the server certificate against the webpki roots and
    /// the host name.
    pub verify_certificates: bool,

    /// The domain sent along the `EHLO` command.
    pub helo_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            security: SmtpSecurity::default(),
            login: String::new(),
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
            verify_certificates: true,
            helo_name: DEFAULT_HELO_NAME.to_owned(),
        }
    }
}

impl SmtpConfig {
    /// Return `true` if SSL or TLS is enabled.
    pub fn is_encryption_enabled(&self) -> bool {
        !self.is_encryption_disabled()
    }

    /// Return `true` if the connection is encrypted from the first
    /// byte.
    pub fn is_implicit_tls_enabled(&self) -> bool {
        matches!(self.security, SmtpSecurity::Ssl)
    }

    /// Return `true` if STARTTLS should be used when advertised.
    pub fn is_start_tls_enabled(&self) -> bool {
        matches!(self.security, SmtpSecurity::Tls)
    }

    /// Return `true` if encryption is disabled.
    pub fn is_encryption_disabled(&self) -> bool {
        matches!(self.security, SmtpSecurity::None)
    }

    /// Return `true` if a login is configured.
    pub fn has_credentials(&self) -> bool {
        !self.login.is_empty()
    }

    /// Return `true` if the host is a loopback name, to which
    /// credentials can be sent in clear text.
    pub fn is_localhost(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1")
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("verify_certificates", &self.verify_certificates)
            .field("helo_name", &self.helo_name)
            .finish()
    }
}

/// The SMTP transport security mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SmtpSecurity {
    /// Implicit TLS: the connection is encrypted from the first byte.
    Ssl,

    /// Opportunistic STARTTLS: the connection starts in clear text
    /// and is upgraded only if the server advertises the extension.
    Tls,

    /// No encryption at all.
    #[default]
    None,
}

impl fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssl => write!(f, "SSL"),
            Self::Tls => write!(f, "TLS"),
            Self::None => write!(f, "None"),
        }
    }
}

impl FromStr for SmtpSecurity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssl" => Ok(Self::Ssl),
            "tls" | "starttls" => Ok(Self::Tls),
            "" | "none" => Ok(Self::None),
            _ => Err(Error::ParseSecurityError(s.to_owned())),
        }
    }
}
