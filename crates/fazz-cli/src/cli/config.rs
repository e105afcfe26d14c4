//! `server-config.ini` loading (spec §6): an INI file, section `[Target]`
//! with keys `cmd`, `path`, `root`, `host`, `port`, optional `clean`.
//!
//! `coverage_cmd` is carried alongside the spec's named keys in the same
//! `[Target]` section: spec §6 requires an opaque, externally-supplied
//! coverage tool invocation but leaves where it comes from implementation
//! defined (it is named as an external collaborator, not part of the core
//! data model). It is required, not defaulted — there is no sensible
//! built-in command for an arbitrary target's coverage backend.

use std::path::{Path, PathBuf};

use anyhow::Context;
use fazz_core::target::ServerConfig;

/// `ServerConfig` plus the coverage tool command, both sourced from the
/// same `[Target]` section.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub coverage_cmd: String,
}

pub fn load(path: &Path) -> anyhow::Result<LoadedConfig> {
    let ini = ini::Ini::load_from_file(path)
        .with_context(|| format!("reading server config at {}", path.display()))?;
    let section = ini
        .section(Some("Target"))
        .with_context(|| format!("server config {} has no [Target] section", path.display()))?;

    let cmd = section
        .get("cmd")
        .context("[Target] is missing `cmd`")?
        .split_whitespace()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    anyhow::ensure!(!cmd.is_empty(), "[Target] `cmd` must not be empty");

    let server_path = PathBuf::from(section.get("path").context("[Target] is missing `path`")?);
    let root = PathBuf::from(section.get("root").context("[Target] is missing `root`")?);
    let host = section.get("host").context("[Target] is missing `host`")?.to_owned();
    let port: u16 = section
        .get("port")
        .context("[Target] is missing `port`")?
        .parse()
        .context("[Target] `port` is not a valid port number")?;
    let clean = section.get("clean").map(str::to_owned);
    let coverage_cmd = section
        .get("coverage_cmd")
        .context("[Target] is missing `coverage_cmd`")?
        .to_owned();

    Ok(LoadedConfig {
        server: ServerConfig {
            cmd,
            path: server_path,
            root,
            host,
            port,
            clean,
        },
        coverage_cmd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_well_formed_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[Target]\ncmd = /usr/bin/lightftpd -c ftp.conf\npath = /srv/ftp\nroot = /srv/ftp\nhost = 127.0.0.1\nport = 2121\nclean = rm -rf /srv/ftp/data\ncoverage_cmd = gcovr --root . --fail-under-line 0\n"
        )
        .unwrap();
        let config = load(file.path()).unwrap();
        assert_eq!(config.server.cmd, vec!["/usr/bin/lightftpd", "-c", "ftp.conf"]);
        assert_eq!(config.server.port, 2121);
        assert_eq!(config.server.clean.as_deref(), Some("rm -rf /srv/ftp/data"));
        assert_eq!(config.coverage_cmd, "gcovr --root . --fail-under-line 0");
    }

    #[test]
    fn missing_section_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[Other]\nkey = value\n").unwrap();
        assert!(load(file.path()).is_err());
    }
}
