use std::{
    env,
    ffi::OsString,
    fmt, fs, io,
    marker::PhantomData,
    path::Path,
    result,
};

use serde::{de, Deserialize, Deserializer};
use tracing::debug;

use super::{Error, Result};

/// One source of configuration.
///
/// Every value is optional and kept as a string: values are only
/// validated once all the layers are merged together, see
/// [`super::Config::compose`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_user: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_password: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_host: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_port: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_security: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub send_from: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub log_file: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub log_level: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_timeout: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_verify_certificates: Option<String>,
    #[serde(deserialize_with = "some_scalar")]
    pub smtp_helo_name: Option<String>,
}

impl ConfigLayer {
    /// Read the layer from the given YAML file.
    ///
    /// Return `None` if the file does not exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "configuration file not found, skipping it");
                return Ok(None);
            }
            Err(err) => return Err(Error::ReadFileError(err, path.to_owned())),
        };

        if content.trim().is_empty() {
            debug!(path = %path.display(), "configuration file is empty");
            return Ok(Some(Self::default()));
        }

        let layer = serde_yaml::from_str(&content)
            .map_err(|err| Error::ParseFileError(err, path.to_owned()))?;
        debug!(path = %path.display(), "read configuration file");

        Ok(Some(layer))
    }

    /// Read the layer from the environment of the current process.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars_os().filter_map(|(key, val)| utf8_var(key, val)))
    }

    /// Read the layer from the given environment variables.
    ///
    /// Empty variables are considered unset.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();

        for (key, val) in vars {
            if val.is_empty() {
                continue;
            }

            let field = match key.as_str() {
                "SMTP_USER" => &mut layer.smtp_user,
                "SMTP_PASSWORD" => &mut layer.smtp_password,
                "SMTP_HOST" => &mut layer.smtp_host,
                "SMTP_PORT" => &mut layer.smtp_port,
                "SMTP_SECURITY" => &mut layer.smtp_security,
                "SEND_FROM" => &mut layer.send_from,
                "LOG_FILE" => &mut layer.log_file,
                "LOG_LEVEL" => &mut layer.log_level,
                "SMTP_TIMEOUT" => &mut layer.smtp_timeout,
                "SMTP_VERIFY_CERTIFICATES" => &mut layer.smtp_verify_certificates,
                "SMTP_HELO_NAME" => &mut layer.smtp_helo_name,
                _ => continue,
            };

            *field = Some(val);
        }

        layer
    }

    /// Merge the given layer on top of this one.
    ///
    /// Values set in the given layer take precedence.
    pub fn merge(self, other: Self) -> Self {
        Self {
            smtp_user: other.smtp_user.or(self.smtp_user),
            smtp_password: other.smtp_password.or(self.smtp_password),
            smtp_host: other.smtp_host.or(self.smtp_host),
            smtp_port: other.smtp_port.or(self.smtp_port),
            smtp_security: other.smtp_security.or(self.smtp_security),
            send_from: other.send_from.or(self.send_from),
            log_file: other.log_file.or(self.log_file),
            log_level: other.log_level.or(self.log_level),
            smtp_timeout: other.smtp_timeout.or(self.smtp_timeout),
            smtp_verify_certificates: other
                .smtp_verify_certificates
                .or(self.smtp_verify_certificates),
            smtp_helo_name: other.smtp_helo_name.or(self.smtp_helo_name),
        }
    }
}

fn utf8_var(key: OsString, val: OsString) -> Option<(String, String)> {
    Some((key.into_string().ok()?, val.into_string().ok()?))
}

/// Deserialize an optional scalar as a string.
///
/// YAML files may hold numbers or booleans where a string is
/// expected, like `smtp_port: 587`.
fn some_scalar<'de, D>(deserializer: D) -> result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SomeScalar(PhantomData<fn() -> Option<String>>);

    impl<'de> de::Visitor<'de> for SomeScalar {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("some or none")
        }

        fn visit_none<E>(self) -> result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> result::Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct Scalar(PhantomData<fn() -> String>);

            impl<'de> de::Visitor<'de> for Scalar {
                type Value = String;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("string, number or boolean")
                }

                fn visit_bool<E>(self, v: bool) -> result::Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(v.to_string())
                }

                fn visit_i64<E>(self, v: i64) -> result::Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(v.to_string())
                }

                fn visit_u64<E>(self, v: u64) -> result::Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(v.to_string())
                }

                fn visit_f64<E>(self, v: f64) -> result::Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(v.to_string())
                }

                fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(v.to_owned())
                }
            }

            deserializer
                .deserialize_any(Scalar(PhantomData))
                .map(Option::Some)
        }
    }

    deserializer.deserialize_option(SomeScalar(PhantomData))
}
