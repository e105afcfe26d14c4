//! FTP client adapter and authored initial seed.
//!
//! Call names mirror the client library's own method names, following the
//! original corpus's `ftplib`/`suppaftp`-shaped API
//! (`login`/`pwd`/`mkd`/`cwd`/`stor`/`retr`/`rename`/`size`/`dele`/`rmd`/
//! `quit`), not a wire-level FTP command vocabulary.

use std::net::SocketAddrV4;

use fazz_core::argument::UnpackedValue;
use fazz_core::call::Call;
use fazz_core::client::{Client, ClientCallError};
use fazz_core::seed::Seed;
use fazz_core::Argument;
use suppaftp::FtpStream;
use tracing::debug;

/// A connected FTP session. Constructed fresh per testcase by the worker
/// entry point (spec §6: "a factory `new(protocol, addr) -> client`").
pub struct FtpClient {
    stream: FtpStream,
}

impl FtpClient {
    pub fn connect(addr: SocketAddrV4) -> anyhow::Result<Self> {
        debug!(%addr, "connecting FTP client");
        let stream = FtpStream::connect(addr)?;
        Ok(Self { stream })
    }
}

fn expect_string(args: &[UnpackedValue], index: usize) -> anyhow::Result<&str> {
    match args.get(index) {
        Some(UnpackedValue::String(s)) => Ok(s.as_str()),
        other => anyhow::bail!("expected string argument at position {index}, got {other:?}"),
    }
}

impl Client for FtpClient {
    fn invoke(&mut self, name: &str, args: Vec<UnpackedValue>) -> Option<Result<(), ClientCallError>> {
        let result = (|| -> anyhow::Result<()> {
            match name {
                "login" => {
                    let user = expect_string(&args, 0)?;
                    let pass = expect_string(&args, 1)?;
                    self.stream.login(user, pass)?;
                }
                "pwd" => {
                    self.stream.pwd()?;
                }
                "mkd" => {
                    let dir = expect_string(&args, 0)?;
                    self.stream.mkdir(dir)?;
                }
                "cwd" => {
                    let dir = expect_string(&args, 0)?;
                    self.stream.cwd(dir)?;
                }
                "stor" => {
                    let remote_name = expect_string(&args, 0)?;
                    let UnpackedValue::File(mut file) = args.into_iter().nth(1).ok_or_else(|| anyhow::anyhow!("missing file argument"))? else {
                        anyhow::bail!("expected file argument at position 1");
                    };
                    self.stream.put_file(remote_name, &mut file)?;
                }
                "retr" => {
                    let remote_name = expect_string(&args, 0)?;
                    self.stream.retr_as_buffer(remote_name)?;
                }
                "rename" => {
                    let from = expect_string(&args, 0)?;
                    let to = expect_string(&args, 1)?;
                    self.stream.rename(from, to)?;
                }
                "size" => {
                    let remote_name = expect_string(&args, 0)?;
                    self.stream.size(remote_name)?;
                }
                "list" => {
                    self.stream.list(None)?;
                }
                "nlst" => {
                    self.stream.nlst(None)?;
                }
                "dele" => {
                    let remote_name = expect_string(&args, 0)?;
                    self.stream.rm(remote_name)?;
                }
                "rmd" => {
                    let dir = expect_string(&args, 0)?;
                    self.stream.rmdir(dir)?;
                }
                "noop" => {
                    self.stream.noop()?;
                }
                "quit" => {
                    self.stream.quit()?;
                }
                _ => return Ok(()),
            }
            Ok(())
        })();
        if matches!(name, "login" | "pwd" | "mkd" | "cwd" | "stor" | "retr" | "rename" | "size" | "list" | "nlst" | "dele" | "rmd" | "noop" | "quit") {
            Some(result.map_err(ClientCallError::from))
        } else {
            None
        }
    }
}

/// The authored initial FTP seed: login, create+enter a directory, store
/// two files, rename, list/retrieve/size, clean up, and terminate — mirrors
/// the original's `ftpseed.py` session shape.
pub fn initial_seed(dummy_file: impl Into<std::path::PathBuf>) -> Seed {
    let dummy_file = dummy_file.into();
    Seed::new(vec![
        Call::new("login", vec![Argument::string("webadmin"), Argument::string("ubuntu")]),
        Call::new("pwd", vec![]),
        Call::new("mkd", vec![Argument::string("test")]),
        Call::new("cwd", vec![Argument::string("test")]),
        Call::new(
            "stor",
            vec![Argument::string("temp1.txt"), Argument::file_path(dummy_file.clone())],
        ),
        Call::new(
            "stor",
            vec![Argument::string("temp2.txt"), Argument::file_path(dummy_file)],
        ),
        Call::new("rename", vec![Argument::string("temp2.txt"), Argument::string("test.txt")]),
        Call::new("retr", vec![Argument::string("test.txt")]),
        Call::new("size", vec![Argument::string("test.txt")]),
        Call::new("list", vec![]),
        Call::new("nlst", vec![]),
        Call::new("dele", vec![Argument::string("temp1.txt")]),
        Call::new("dele", vec![Argument::string("test.txt")]),
        Call::new("cwd", vec![Argument::string("..")]),
        Call::new("rmd", vec![Argument::string("test")]),
        Call::terminal("quit", vec![]),
    ])
}

/// Writes the dummy upload fixture the initial seed references, mirroring
/// the original's `dummy_file.write_text("Hello")`. Returns the path the
/// caller should hand to [`initial_seed`].
pub fn write_dummy_file(dir: &std::path::Path) -> std::io::Result<std::path::PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("temp.txt");
    std::fs::write(&path, b"Hello")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_seed_is_well_formed() {
        let seed = initial_seed("/tmp/fazz-dummy.txt");
        assert!(seed.len() >= 2);
        assert_eq!(seed.terminal_index(), Some(seed.len() - 1));
        assert_eq!(seed.get(seed.len() - 1).unwrap().name, "quit");
    }
}
