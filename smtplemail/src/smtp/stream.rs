use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use tracing::debug;

use super::{tls::TlsStream, Cause};

/// The SMTP stream, either in clear text or encrypted.
#[derive(Debug)]
pub enum SmtpStream {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl SmtpStream {
    /// Open a TCP connection to the given host and port.
    ///
    /// Every resolved address is tried in turn, each attempt bounded
    /// by the given timeout, which also applies to reads and writes
    /// on the opened stream.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, Cause> {
        let addrs = (host, port).to_socket_addrs()?;
        let mut last_err = None;

        for addr in addrs {
            debug!(%addr, "connecting to smtp server");

            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(tcp) => {
                    tcp.set_read_timeout(Some(timeout))?;
                    tcp.set_write_timeout(Some(timeout))?;
                    return Ok(tcp);
                }
                Err(err) => {
                    debug!(%addr, %err, "cannot connect to address");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(err.into()),
            None => Err(Cause::ResolveAddressError(format!("{host}:{port}"))),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Close the stream, notifying the peer when encrypted.
    pub fn close(&mut self) {
        let tcp = match self {
            Self::Plain(tcp) => tcp,
            Self::Tls(tls) => {
                tls.conn.send_close_notify();
                let _ = tls.flush();
                &mut tls.sock
            }
        };

        if let Err(err) = tcp.shutdown(Shutdown::Both) {
            debug!(%err, "cannot shut down smtp stream");
        }
    }
}

impl Read for SmtpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(tcp) => tcp.read(buf),
            Self::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for SmtpStream {
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
