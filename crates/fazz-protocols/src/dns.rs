//! DNS client adapter and authored initial seed, over `hickory-resolver`.
//!
//! The original corpus drives `dns.resolver.Resolver.resolve(name, rdtype,
//! rdclass)`; `hickory_resolver::Resolver` is pointed at the target as its
//! sole configured nameserver so every query exercises the server under
//! test rather than the host's system resolver.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use fazz_core::argument::UnpackedValue;
use fazz_core::call::Call;
use fazz_core::client::{Client, ClientCallError};
use fazz_core::seed::Seed;
use fazz_core::Argument;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::Resolver;
use tracing::debug;

pub struct DnsClient {
    resolver: Resolver,
}

impl DnsClient {
    pub fn connect(addr: SocketAddrV4) -> anyhow::Result<Self> {
        debug!(%addr, "pointing DNS resolver at target");
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(SocketAddr::V4(addr), Protocol::Udp));
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(2);
        opts.attempts = 1;
        let resolver = Resolver::new(config, opts)?;
        Ok(Self { resolver })
    }
}

fn expect_string(args: &[UnpackedValue], index: usize) -> anyhow::Result<&str> {
    match args.get(index) {
        Some(UnpackedValue::String(s)) => Ok(s.as_str()),
        other => anyhow::bail!("expected string argument at position {index}, got {other:?}"),
    }
}

fn expect_enum(args: &[UnpackedValue], index: usize) -> anyhow::Result<&str> {
    match args.get(index) {
        Some(UnpackedValue::Enum(member)) => Ok(member.as_str()),
        other => anyhow::bail!("expected enum argument at position {index}, got {other:?}"),
    }
}

impl Client for DnsClient {
    fn invoke(&mut self, name: &str, args: Vec<UnpackedValue>) -> Option<Result<(), ClientCallError>> {
        let result = (|| -> anyhow::Result<()> {
            match name {
                "resolve" => {
                    let query_name = expect_string(&args, 0)?;
                    let record_type = expect_enum(&args, 1)?;
                    let _class = args.get(2); // class is always IN; carried for fidelity, unused
                    match record_type {
                        "A" => {
                            self.resolver.ipv4_lookup(query_name)?;
                        }
                        "AAAA" => {
                            self.resolver.ipv6_lookup(query_name)?;
                        }
                        "MX" => {
                            self.resolver.mx_lookup(query_name)?;
                        }
                        "TXT" => {
                            self.resolver.txt_lookup(query_name)?;
                        }
                        "NS" => {
                            self.resolver.ns_lookup(query_name)?;
                        }
                        _ => {
                            self.resolver.lookup_ip(query_name)?;
                        }
                    };
                }
                "reverse" => {
                    let addr: Ipv4Addr = expect_string(&args, 0)?.parse()?;
                    self.resolver.reverse_lookup(IpAddr::V4(addr))?;
                }
                _ => return Ok(()),
            }
            Ok(())
        })();
        if matches!(name, "resolve" | "reverse") {
            Some(result.map_err(ClientCallError::from))
        } else {
            None
        }
    }
}

/// The original DNS corpus is a single `resolve` call for an `A` record in
/// class `IN`; there is no terminal/session-ending operation in the DNS
/// protocol's request/response model, so no call is marked `is_last`.
pub fn initial_seed() -> Seed {
    Seed::new(vec![Call::new(
        "resolve",
        vec![
            Argument::string("test.com"),
            Argument::enumeration(["A", "AAAA", "MX", "TXT", "NS", "CNAME", "SOA", "PTR"], "A"),
            Argument::enumeration(["IN"], "IN").pinned(),
        ],
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_seed_has_single_call_and_no_terminal() {
        let seed = initial_seed();
        assert_eq!(seed.len(), 1);
        assert_eq!(seed.terminal_index(), None);
    }
}
