use std::{error::Error as StdError, io, path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser};
use smtplemail::{
    config::{ConfigLayer, DEFAULT_CONFIG_PATH},
    log,
    message::FromOverrides,
    send::{read_message, submit, Submission},
    Config, Error, SmtpSender,
};
use tracing::{debug, error};

/// Send a message read on standard input to an SMTP relay.
///
/// Accepts the usual sendmail flags, so that it can stand for
/// `/usr/sbin/sendmail`.
#[derive(Debug, Parser)]
#[command(name = "smtplemail", version)]
struct Cli {
    /// Read the configuration from this file.
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Set the envelope sender address.
    #[arg(short = 'f', value_name = "ADDRESS")]
    from: Option<String>,

    /// Set the sender full name.
    #[arg(short = 'F', value_name = "NAME")]
    full_name: Option<String>,

    /// Read recipients from the To, Cc and Bcc headers.
    #[arg(short = 't')]
    extract_recipients: bool,

    /// Log the submission at info level.
    #[arg(short, long)]
    verbose: bool,

    /// Do not treat a line with a single dot as the end of input.
    #[arg(short = 'i')]
    ignore_dots: bool,

    /// Delivery status notification conditions.
    #[arg(short = 'N', value_name = "DSN")]
    dsn: Option<String>,

    /// Sendmail option, like -oi or -oem.
    #[arg(short = 'o', value_name = "OPTION", action = ArgAction::Append)]
    options: Vec<String>,

    #[arg(long, alias = "smtp_user", value_name = "LOGIN")]
    smtp_user: Option<String>,

    #[arg(long, alias = "smtp_password", value_name = "PASSWORD")]
    smtp_password: Option<String>,

    #[arg(long, alias = "smtp_host", value_name = "HOST")]
    smtp_host: Option<String>,

    #[arg(long, alias = "smtp_port", value_name = "PORT")]
    smtp_port: Option<String>,

    /// One of SSL, TLS or None.
    #[arg(long, alias = "smtp_security", value_name = "SECURITY")]
    smtp_security: Option<String>,

    #[arg(long, alias = "send_from", value_name = "ADDRESS")]
    send_from: Option<String>,

    #[arg(long, alias = "log_file", value_name = "PATH")]
    log_file: Option<String>,

    #[arg(long, alias = "log_level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// The recipient addresses.
    #[arg(value_name = "RECIPIENT")]
    recipients: Vec<String>,
}

impl Cli {
    fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            smtp_user: self.smtp_user.clone(),
            smtp_password: self.smtp_password.clone(),
            smtp_host: self.smtp_host.clone(),
            smtp_port: self.smtp_port.clone(),
            smtp_security: self.smtp_security.clone(),
            send_from: self.send_from.clone(),
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
            ..Default::default()
        }
    }

    fn submission(&self) -> Submission {
        Submission {
            recipients: self.recipients.clone(),
            extract_recipients: self.extract_recipients,
            overrides: FromOverrides::new(self.from.as_deref(), self.full_name.as_deref()),
        }
    }

    fn log_ignored_flags(&self) {
        if self.ignore_dots {
            debug!("ignoring -i flag, message is read until end of input");
        }

        if let Some(dsn) = &self.dsn {
            debug!(%dsn, "ignoring -N flag, delivery status notifications are not requested");
        }

        for option in &self.options {
            debug!(%option, "ignoring -o flag");
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config, cli.config_layer()) {
        Ok(config) => config,
        Err(err) => return fail(err.into()),
    };

    log::init(&config, cli.verbose);
    cli.log_ignored_flags();

    let sender = SmtpSender::new(config.smtp.clone());
    let result = read_message(io::stdin().lock())
        .map_err(Error::from)
        .and_then(|raw| submit(&config, &cli.submission(), &raw, &sender));

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => fail(err),
    }
}

fn fail(err: Error) -> ExitCode {
    let chain = error_chain(&err);
    error!("{chain}");
    eprintln!("smtplemail: {chain}");
    ExitCode::from(err.exit_code())
}

fn error_chain(err: &dyn StdError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();

    while let Some(err) = source {
        chain.push_str(": ");
        chain.push_str(&err.to_string());
        source = err.source();
    }

    chain
}
