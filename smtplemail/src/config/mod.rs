//! Module dedicated to configuration.
//!
//! The configuration is made of layers, from the lowest precedence
//! to the highest: the YAML file, the environment then the command
//! line flags. Layers are merged together then validated into an
//! immutable [`Config`].

mod error;
mod layer;

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use tracing::{debug, level_filters::LevelFilter};

#[doc(inline)]
pub use self::{
    error::{Error, Result},
    layer::ConfigLayer,
};
use crate::smtp::{SmtpConfig, SmtpSecurity};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/smtplemail/smtplemail.conf";
pub const DEFAULT_LOG_FILE: &str = "/var/log/smtplemail/smtplemail.log";
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::ERROR;

/// The configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The SMTP transport configuration.
    pub smtp: SmtpConfig,

    /// The sender address used instead of the `From` header.
    pub send_from: Option<String>,

    /// The file logs are appended to.
    pub log_file: PathBuf,

    /// The maximum level of logs.
    pub log_level: LevelFilter,
}

impl Config {
    /// Load the configuration from the given file, the environment
    /// and the given flags.
    pub fn load(path: impl AsRef<Path>, flags: ConfigLayer) -> Result<Self> {
        let file = ConfigLayer::from_file(path)?.unwrap_or_default();
        let env = ConfigLayer::from_env();
        Self::compose(file.merge(env).merge(flags))
    }

    /// Validate the given layer and fill missing values with
    /// defaults.
    pub fn compose(layer: ConfigLayer) -> Result<Self> {
        let mut smtp = SmtpConfig::default();

        smtp.host = match non_empty(layer.smtp_host) {
            Some(host) => host,
            None => return Err(Error::MissingHostError),
        };

        if let Some(port) = non_empty(layer.smtp_port) {
            smtp.port = parse_port(&port)?;
        }

        if let Some(security) = layer.smtp_security {
            smtp.security = SmtpSecurity::from_str(&security)?;
        }

        if let Some(login) = layer.smtp_user {
            smtp.login = login;
        }

        if let Some(password) = layer.smtp_password {
            smtp.password = password;
        }

        if let Some(timeout) = non_empty(layer.smtp_timeout) {
            smtp.timeout = parse_timeout(&timeout)?;
        }

        if let Some(verify) = non_empty(layer.smtp_verify_certificates) {
            smtp.verify_certificates = parse_bool(&verify, "smtp_verify_certificates")?;
        }

        if let Some(helo_name) = non_empty(layer.smtp_helo_name) {
            smtp.helo_name = helo_name;
        }

        let log_level = match non_empty(layer.log_level) {
            Some(level) => {
                LevelFilter::from_str(&level).map_err(|_| Error::ParseLogLevelError(level))?
            }
            None => DEFAULT_LOG_LEVEL,
        };

        let log_file = non_empty(layer.log_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        let config = Self {
            smtp,
            send_from: non_empty(layer.send_from),
            log_file,
            log_level,
        };

        debug!(?config, "composed configuration");
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_port(port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::ParsePortError(port.to_owned())),
        Ok(port) => Ok(port),
    }
}

fn parse_timeout(timeout: &str) -> Result<Duration> {
    match timeout.parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::ParseTimeoutError(timeout.to_owned())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}

fn parse_bool(value: &str, key: &'static str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::ParseBoolError(value.to_owned(), key)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tracing::level_filters::LevelFilter;

    use super::{Config, ConfigLayer, Error, DEFAULT_LOG_FILE};
    use crate::smtp::{Error as SmtpError, SmtpSecurity};

    fn with_host(host: &str) -> ConfigLayer {
        ConfigLayer {
            smtp_host: Some(host.into()),
            ..Default::default()
        }
    }

    #[test]
    fn compose_defaults() {
        let config = Config::compose(with_host("mail.example.com")).unwrap();

        assert_eq!(config.smtp.host, "mail.example.com");
        assert_eq!(config.smtp.port, 25);
        assert_eq!(config.smtp.security, SmtpSecurity::None);
        assert_eq!(config.smtp.timeout, Duration::from_secs(30));
        assert!(config.smtp.verify_certificates);
        assert_eq!(config.smtp.helo_name, "localhost");
        assert_eq!(config.send_from, None);
        assert_eq!(config.log_file.to_str(), Some(DEFAULT_LOG_FILE));
        assert_eq!(config.log_level, LevelFilter::ERROR);
    }

    #[test]
    fn compose_values() {
        let config = Config::compose(ConfigLayer {
            smtp_port: Some("465".into()),
            smtp_security: Some("ssl".into()),
            smtp_user: Some("alice".into()),
            smtp_timeout: Some("5".into()),
            smtp_verify_certificates: Some("no".into()),
            send_from: Some(" ".into()),
            log_level: Some("info".into()),
            ..with_host("mail.example.com")
        })
        .unwrap();

        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.security, SmtpSecurity::Ssl);
        assert_eq!(config.smtp.login, "alice");
        assert_eq!(config.smtp.timeout, Duration::from_secs(5));
        assert!(!config.smtp.verify_certificates);
        assert_eq!(config.send_from, None);
        assert_eq!(config.log_level, LevelFilter::INFO);
    }

    #[test]
    fn reject_invalid_values() {
        assert!(matches!(
            Config::compose(ConfigLayer::default()),
            Err(Error::MissingHostError)
        ));

        for port in ["0", "65536", "smtp"] {
            let layer = ConfigLayer {
                smtp_port: Some(port.into()),
                ..with_host("localhost")
            };
            assert!(matches!(
                Config::compose(layer),
                Err(Error::ParsePortError(_))
            ));
        }

        let layer = ConfigLayer {
            smtp_security: Some("plain".into()),
            ..with_host("localhost")
        };
        assert!(matches!(
            Config::compose(layer),
            Err(Error::SmtpError(SmtpError::ParseSecurityError(_)))
        ));

        let layer = ConfigLayer {
            log_level: Some("loud".into()),
            ..with_host("localhost")
        };
        assert!(matches!(
            Config::compose(layer),
            Err(Error::ParseLogLevelError(_))
        ));
    }
}
