//! Per-protocol `Client` adapters and authored initial seeds (spec §1, §6,
//! §9): "the concrete protocol client libraries used to send traffic" and
//! "the initial per-protocol seed definitions" the core treats as external
//! collaborators.

pub mod dicom;
pub mod dns;
pub mod ftp;
pub mod smtp;

use std::net::SocketAddrV4;
use std::path::Path;
use std::str::FromStr;

use fazz_core::client::Client;
use fazz_core::seed::Seed;

/// The `protocol` CLI argument (spec §6): `fazz <protocol> [...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ftp,
    Smtp,
    Dns,
    Dicom,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown protocol `{0}`, expected one of: ftp, smtp, dns, dicom")]
pub struct UnknownProtocol(String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ftp" => Ok(Protocol::Ftp),
            "smtp" => Ok(Protocol::Smtp),
            "dns" => Ok(Protocol::Dns),
            "dicom" => Ok(Protocol::Dicom),
            other => Err(UnknownProtocol(other.to_owned())),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Protocol::Ftp => "ftp",
            Protocol::Smtp => "smtp",
            Protocol::Dns => "dns",
            Protocol::Dicom => "dicom",
        };
        f.write_str(name)
    }
}

/// The factory the worker entry point calls (spec §6: "a factory
/// `new(protocol, addr) -> client`"), resolved once the worker knows which
/// protocol it was invoked for.
pub fn connect(protocol: Protocol, addr: SocketAddrV4) -> anyhow::Result<Box<dyn Client>> {
    Ok(match protocol {
        Protocol::Ftp => Box::new(ftp::FtpClient::connect(addr)?),
        Protocol::Smtp => Box::new(smtp::SmtpClient::connect(addr)?),
        Protocol::Dns => Box::new(dns::DnsClient::connect(addr)?),
        Protocol::Dicom => Box::new(dicom::DicomClient::connect(addr)?),
    })
}

/// The authored initial seed for a protocol (spec §1, §6). FTP's seed needs
/// a scratch directory to write its dummy upload fixture into; the other
/// protocols ignore `scratch_dir`.
pub fn initial_seed(protocol: Protocol, scratch_dir: &Path) -> anyhow::Result<Seed> {
    Ok(match protocol {
        Protocol::Ftp => {
            let dummy_file = ftp::write_dummy_file(scratch_dir)?;
            ftp::initial_seed(dummy_file)
        }
        Protocol::Smtp => smtp::initial_seed(),
        Protocol::Dns => dns::initial_seed(),
        Protocol::Dicom => dicom::initial_seed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_from_str_accepts_the_four_supported_names() {
        for (text, expected) in [
            ("ftp", Protocol::Ftp),
            ("SMTP", Protocol::Smtp),
            ("dns", Protocol::Dns),
            ("Dicom", Protocol::Dicom),
        ] {
            assert_eq!(text.parse::<Protocol>().unwrap(), expected);
        }
        assert!("gopher".parse::<Protocol>().is_err());
    }

    #[test]
    fn initial_seed_dispatches_per_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let ftp_seed = initial_seed(Protocol::Ftp, dir.path()).unwrap();
        assert!(ftp_seed.len() > 1);
        let dns_seed = initial_seed(Protocol::Dns, dir.path()).unwrap();
        assert_eq!(dns_seed.len(), 1);
    }
}
