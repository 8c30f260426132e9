//! Module dedicated to the SMTP client.
//!
//! The client owns the connection to the relay and exposes one
//! method per SMTP command. Each method sends the command, reads the
//! reply and fails with [`Cause::UnexpectedReplyError`] when the
//! reply is not the expected one.

use std::io::{self, BufRead, BufReader, BufWriter, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use super::{reply::parse_line, stream::SmtpStream, tls, Cause, Reply, SmtpConfig};

const CRLF: &[u8] = b"\r\n";

type Result<T> = std::result::Result<T, Cause>;

/// The SMTP client.
#[derive(Debug)]
pub struct SmtpClient {
    stream: BufReader<SmtpStream>,
}

impl SmtpClient {
    /// Connect to the relay.
    ///
    /// When implicit TLS is enabled, the TLS handshake is completed
    /// before returning, so that the greeting is read encrypted.
    pub fn connect(config: &SmtpConfig) -> Result<Self> {
        let tcp = SmtpStream::connect(&config.host, config.port, config.timeout)?;

        let stream = if config.is_implicit_tls_enabled() {
            SmtpStream::Tls(Box::new(tls::handshake(config, tcp)?))
        } else {
            SmtpStream::Plain(tcp)
        };

        Ok(Self {
            stream: BufReader::new(stream),
        })
    }

    /// Read the greeting sent by the server once connected.
    pub fn greet(&mut self) -> Result<Reply> {
        let greeting = self.read_reply()?;
        expect(greeting, Reply::is_positive_completion)
    }

    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Read one reply, made of one or more lines.
    pub fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();

            if self.stream.read_until(b'\n', &mut buf)? == 0 {
                return Err(Cause::ConnectionClosedError);
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);
            debug!("S: {line}");

            let (code, last, text) = parse_line(line)?;
            lines.push(text.to_owned());

            if last {
                return Ok(Reply { code, lines });
            }
        }
    }

    /// Send the given command line then read the reply.
    ///
    /// The line is terminated by CRLF, so it cannot contain any line
    /// break itself.
    pub fn command(&mut self, line: &str) -> Result<Reply> {
        if line.contains(['\r', '\n']) {
            return Err(Cause::CommandLineBreakError);
        }

        if line.starts_with("AUTH ") {
            debug!("C: AUTH <redacted>");
        } else {
            debug!("C: {line}");
        }

        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes())?;
        stream.write_all(CRLF)?;
        stream.flush()?;

        self.read_reply()
    }

    /// Greet the server.
    ///
    /// Servers refusing `EHLO` are greeted again with `HELO`, in which
    /// case the returned reply advertises no extension.
    pub fn ehlo(&mut self, domain: &str) -> Result<Reply> {
        let reply = self.command(&format!("EHLO {domain}"))?;

        if reply.is_positive_completion() {
            return Ok(reply);
        }

        debug!(%reply, "ehlo refused, falling back to helo");
        let reply = self.command(&format!("HELO {domain}"))?;
        expect(reply, Reply::is_positive_completion)
    }

    /// Upgrade the connection to TLS.
    pub fn start_tls(mut self, config: &SmtpConfig) -> Result<Self> {
        if self.is_encrypted() {
            return Err(Cause::AlreadyEncryptedError);
        }

        let reply = self.command("STARTTLS")?;
        expect(reply, Reply::is_positive_completion)?;

        // anything received after the reply and before the handshake
        // was not sent by the TLS peer
        if !self.stream.buffer().is_empty() {
            return Err(Cause::StartTlsInjectionError);
        }

        match self.stream.into_inner() {
            SmtpStream::Plain(tcp) => {
                let tls = tls::handshake(config, tcp)?;
                Ok(Self {
                    stream: BufReader::new(SmtpStream::Tls(Box::new(tls))),
                })
            }
            SmtpStream::Tls(_) => Err(Cause::AlreadyEncryptedError),
        }
    }

    /// Authenticate using the `PLAIN` mechanism.
    ///
    /// The given reply is the one of the last `EHLO`, used to check
    /// that the server supports authentication.
    pub fn authenticate(&mut self, config: &SmtpConfig, ehlo: &Reply) -> Result<()> {
        if !ehlo.has_extension("AUTH") {
            return Err(Cause::AuthNotAdvertisedError);
        }

        if !self.is_encrypted() && !config.is_localhost() {
            return Err(Cause::AuthUnencryptedError(config.host.clone()));
        }

        let credentials = format!("\0{}\0{}", config.login, config.password);
        let reply = self.command(&format!("AUTH PLAIN {}", STANDARD.encode(credentials)))?;
        expect(reply, Reply::is_positive_completion)?;

        Ok(())
    }

    pub fn mail_from(&mut self, from: &str) -> Result<()> {
        let reply = self.command(&format!("MAIL FROM:<{from}>"))?;
        expect(reply, Reply::is_positive_completion)?;
        Ok(())
    }

    pub fn rcpt_to(&mut self, to: &str) -> Result<()> {
        let reply = self.command(&format!("RCPT TO:<{to}>"))?;
        expect(reply, Reply::is_positive_completion)?;
        Ok(())
    }

    /// Send the message content.
    pub fn data(&mut self, msg: &[u8]) -> Result<()> {
        let reply = self.command("DATA")?;
        expect(reply, Reply::is_positive_intermediate)?;

        debug!(len = msg.len(), "C: <message content>");
        let mut writer = BufWriter::new(self.stream.get_mut());
        write_dot_stuffed(&mut writer, msg)?;
        writer.flush()?;
        drop(writer);

        let reply = self.read_reply()?;
        expect(reply, Reply::is_positive_completion)?;

        Ok(())
    }

    /// Say goodbye to the server then close the connection.
    ///
    /// The message is already accepted at this point, so failures are
    /// only logged.
    pub fn quit(mut self) {
        if let Err(err) = self.command("QUIT") {
            debug!(%err, "cannot quit smtp session properly");
        }

        self.stream.get_mut().close();
    }
}

/// Turn the given reply into an error if it does not match the
/// given predicate.
fn expect(reply: Reply, predicate: impl Fn(&Reply) -> bool) -> Result<Reply> {
    if predicate(&reply) {
        Ok(reply)
    } else {
        Err(Cause::UnexpectedReplyError(reply))
    }
}

/// Write the message content as expected by the `DATA` command.
///
/// Lines are terminated with CRLF, lines starting with a dot get an
/// extra dot, and the content is terminated by a line containing a
/// single dot.
pub fn write_dot_stuffed(writer: &mut impl Write, msg: &[u8]) -> io::Result<()> {
    for line in msg.split_inclusive(|b| *b == b'\n') {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if line.starts_with(b".") {
            writer.write_all(b".")?;
        }

        writer.write_all(line)?;
        writer.write_all(CRLF)?;
    }

    writer.write_all(b".")?;
    writer.write_all(CRLF)
}
