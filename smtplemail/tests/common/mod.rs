#![allow(dead_code)]

use std::{
    io::{self, BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use rustls::{
    crypto::ring,
    pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer},
    ServerConfig, ServerConnection, StreamOwned,
};
use smtplemail::{SmtpConfig, SmtpSecurity};

/// Self-signed certificate for `localhost` and `127.0.0.1`.
const CERT: &[u8] = include_bytes!("../fixtures/cert.pem");
const KEY: &[u8] = include_bytes!("../fixtures/key.pem");

/// How the scripted server behaves.
#[derive(Clone, Debug, Default)]
pub struct Script {
    /// Greeting sent once connected, instead of the default 220.
    pub greeting: Option<&'static str>,

    /// Extensions advertised in the EHLO reply.
    pub extensions: Vec<&'static str>,

    /// Refuse EHLO, so that the client falls back to HELO.
    pub refuse_ehlo: bool,

    /// Encrypt the connection before the greeting.
    pub implicit_tls: bool,

    /// Upgrade the connection after accepting STARTTLS. When unset,
    /// the connection is closed right after the STARTTLS reply.
    pub starttls: bool,

    /// Send this extra line in the same packet as the STARTTLS reply.
    pub inject_after_starttls: Option<&'static str>,

    /// Reject MAIL FROM.
    pub reject_mail: bool,

    /// Reject RCPT TO for this address.
    pub reject_rcpt: Option<&'static str>,

    /// Reject the message once its content is received.
    pub reject_data: bool,
}

/// What the scripted server received.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub commands: Vec<String>,
    pub data: Vec<u8>,

    /// Index of the first command received encrypted.
    pub encrypted_since: Option<usize>,
}

impl Session {
    pub fn has_command(&self, prefix: &str) -> bool {
        self.commands.iter().any(|cmd| cmd.starts_with(prefix))
    }
}

/// The server side of the connection, either in clear text or
/// encrypted.
enum MockStream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl MockStream {
    fn accept_tls(tcp: TcpStream) -> Self {
        let conn = ServerConnection::new(server_config()).unwrap();
        Self::Tls(Box::new(StreamOwned::new(conn, tcp)))
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(tcp) => tcp.read(buf),
            Self::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(tcp) => tcp.write(buf),
            Self::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(tcp) => tcp.flush(),
            Self::Tls(tls) => tls.flush(),
        }
    }
}

fn server_config() -> Arc<ServerConfig> {
    let certs = CertificateDer::pem_slice_iter(CERT)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = PrivateKeyDer::from_pem_slice(KEY).unwrap();

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();

    Arc::new(config)
}

/// Bind a listener on a random local port.
pub fn listen() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Build the configuration of a client talking to a scripted server.
///
/// The certificate of the scripted server is self-signed, so its
/// verification is disabled.
pub fn smtp_config(port: u16, security: SmtpSecurity) -> SmtpConfig {
    SmtpConfig {
        host: "127.0.0.1".into(),
        port,
        security,
        timeout: Duration::from_secs(5),
        verify_certificates: false,
        ..Default::default()
    }
}

/// Spawn a server accepting one connection and playing the given
/// script.
pub fn spawn_server(script: Script) -> (u16, JoinHandle<Session>) {
    let (listener, port) = listen();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        play(stream, &script)
    });

    (port, handle)
}

/// Spawn a server accepting one connection and returning the first
/// byte sent by the client, without greeting it.
pub fn spawn_silent_server() -> (u16, JoinHandle<Option<u8>>) {
    let (listener, port) = listen();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut byte = [0; 1];
        match stream.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    });

    (port, handle)
}

fn play(tcp: TcpStream, script: &Script) -> Session {
    let mut session = Session::default();

    let stream = if script.implicit_tls {
        session.encrypted_since = Some(0);
        MockStream::accept_tls(tcp)
    } else {
        MockStream::Plain(tcp)
    };

    let mut reader = BufReader::new(stream);

    let greeting = script.greeting.unwrap_or("220 mock ESMTP ready");
    if write_line(&mut reader, greeting).is_err() {
        return session;
    }

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => (),
        }

        let line = line.trim_end().to_owned();
        session.commands.push(line.clone());
        let verb = line
            .split([' ', ':'])
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        let reply = match verb.as_str() {
            "EHLO" if script.refuse_ehlo => "502 command not implemented\r\n".to_owned(),
            "EHLO" => {
                let mut reply = String::from("250-mock greets you\r\n");
                for ext in &script.extensions {
                    reply.push_str(&format!("250-{ext}\r\n"));
                }
                reply.push_str("250 SIZE 10240000\r\n");
                reply
            }
            "HELO" => "250 mock\r\n".to_owned(),
            "STARTTLS" if script.starttls => {
                if write_line(&mut reader, "220 ready to start TLS").is_err() {
                    break;
                }

                reader = match reader.into_inner() {
                    MockStream::Plain(tcp) => BufReader::new(MockStream::accept_tls(tcp)),
                    MockStream::Tls(_) => panic!("connection already encrypted"),
                };
                session.encrypted_since = Some(session.commands.len());
                continue;
            }
            "STARTTLS" => {
                let mut reply = String::from("220 ready to start TLS\r\n");
                if let Some(injected) = script.inject_after_starttls {
                    reply.push_str(injected);
                    reply.push_str("\r\n");
                }
                let _ = reader.get_mut().write_all(reply.as_bytes());
                break;
            }
            "AUTH" => "235 authentication succeeded\r\n".to_owned(),
            "MAIL" if script.reject_mail => "550 sender rejected\r\n".to_owned(),
            "MAIL" => "250 sender ok\r\n".to_owned(),
            "RCPT" => match script.reject_rcpt {
                Some(addr) if line.contains(&format!("<{addr}>")) => {
                    "550 no such user here\r\n".to_owned()
                }
                _ => "250 recipient ok\r\n".to_owned(),
            },
            "DATA" => {
                if write_line(&mut reader, "354 end data with <CR><LF>.<CR><LF>").is_err() {
                    break;
                }
                loop {
                    let mut data_line = Vec::new();
                    match reader.read_until(b'\n', &mut data_line) {
                        Ok(0) | Err(_) => return session,
                        Ok(_) => (),
                    }
                    if data_line == b".\r\n" {
                        break;
                    }
                    session.data.extend_from_slice(&data_line);
                }
                if script.reject_data {
                    "554 message rejected as spam\r\n".to_owned()
                } else {
                    "250 queued\r\n".to_owned()
                }
            }
            "QUIT" => {
                let _ = write_line(&mut reader, "221 bye");
                break;
            }
            _ => "500 unknown command\r\n".to_owned(),
        };

        let stream = reader.get_mut();
        if stream.write_all(reply.as_bytes()).and_then(|()| stream.flush()).is_err() {
            break;
        }
    }

    session
}

fn write_line(reader: &mut BufReader<MockStream>, line: &str) -> io::Result<()> {
    let stream = reader.get_mut();
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\r\n")?;
    stream.flush()
}
