//! SMTP client adapter and authored initial seed.
//!
//! `suppaftp`/`hickory-resolver`-grade crates exist for FTP and DNS, but the
//! pack carries no maintained synchronous SMTP client, so this module is a
//! minimal line-oriented client over `std::net::TcpStream` — the same
//! "write a request line, read one response line" shape as the original's
//! `smtplib.SMTP.docmd`, just without a protocol library wrapping it.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddrV4, TcpStream};

use fazz_core::argument::UnpackedValue;
use fazz_core::call::Call;
use fazz_core::client::{Client, ClientCallError};
use fazz_core::seed::Seed;
use fazz_core::Argument;
use tracing::debug;

/// A connected SMTP session: one TCP socket plus a buffered reader for
/// line-at-a-time responses.
pub struct SmtpClient {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl SmtpClient {
    pub fn connect(addr: SocketAddrV4) -> anyhow::Result<Self> {
        debug!(%addr, "connecting SMTP client");
        let stream = TcpStream::connect(addr)?;
        let reader = BufReader::new(stream.try_clone()?);
        let mut client = Self { stream, reader };
        client.read_line()?; // greeting banner
        Ok(client)
    }

    fn read_line(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(line)
    }

    /// Sends `command` (already terminated with CRLF by the caller or
    /// implied here) and reads one response line — the `docmd` primitive
    /// the original corpus's `smtplib.SMTP.docmd` is grounded on.
    fn docmd(&mut self, command: &str) -> anyhow::Result<String> {
        self.stream.write_all(command.as_bytes())?;
        self.stream.write_all(b"\r\n")?;
        self.stream.flush()?;
        self.read_line()
    }
}

fn expect_string(args: &[UnpackedValue], index: usize) -> anyhow::Result<&str> {
    match args.get(index) {
        Some(UnpackedValue::String(s)) => Ok(s.as_str()),
        other => anyhow::bail!("expected string argument at position {index}, got {other:?}"),
    }
}

impl Client for SmtpClient {
    fn invoke(&mut self, name: &str, args: Vec<UnpackedValue>) -> Option<Result<(), ClientCallError>> {
        let result = (|| -> anyhow::Result<()> {
            match name {
                "noop" => {
                    self.docmd("NOOP")?;
                }
                "help" => {
                    self.docmd("HELP")?;
                }
                "helo" => {
                    self.docmd("HELO fazz")?;
                }
                "ehlo" => {
                    self.docmd("EHLO fazz")?;
                }
                "expn" => {
                    let recipient = expect_string(&args, 0)?;
                    self.docmd(&format!("EXPN {recipient}"))?;
                }
                "rset" => {
                    self.docmd("RSET")?;
                }
                "mail" => {
                    let from = expect_string(&args, 0)?;
                    self.docmd(&format!("MAIL FROM:<{from}>"))?;
                }
                "rcpt" => {
                    let to = expect_string(&args, 0)?;
                    self.docmd(&format!("RCPT TO:<{to}>"))?;
                }
                "data" => {
                    let body = expect_string(&args, 0)?;
                    self.docmd("DATA")?;
                    self.docmd(&format!("{body}\r\n."))?;
                }
                "docmd" => {
                    let raw = expect_string(&args, 0)?;
                    self.docmd(raw)?;
                }
                "quit" => {
                    self.docmd("QUIT")?;
                }
                _ => return Ok(()),
            }
            Ok(())
        })();
        if matches!(
            name,
            "noop" | "help" | "helo" | "ehlo" | "expn" | "rset" | "mail" | "rcpt" | "data" | "docmd" | "quit"
        ) {
            Some(result.map_err(ClientCallError::from))
        } else {
            None
        }
    }
}

/// The authored initial SMTP seed, following the original's session shape:
/// probe informational commands, then a full `MAIL`/`RCPT`/`DATA`
/// transaction, then the raw `docmd` escape hatch, then quit.
pub fn initial_seed() -> Seed {
    Seed::new(vec![
        Call::new("noop", vec![]),
        Call::new("help", vec![]),
        Call::new("helo", vec![]),
        Call::new("ehlo", vec![]),
        Call::new("expn", vec![Argument::string("ubuntu")]),
        Call::new("rset", vec![]),
        Call::new("mail", vec![Argument::string("ubuntu@ubuntu")]),
        Call::new("rcpt", vec![Argument::string("ubuntu@ubuntu")]),
        Call::new("data", vec![Argument::string("hello")]),
        Call::new("docmd", vec![Argument::string("BDAT")]),
        Call::terminal("quit", vec![]),
    ])
}
