//! Host string parsing and name resolution
//!
//! Supported formats:
//! - "localhost" - "localhost:80" - "localhost 80"
//! - "127.0.0.1" - "127.0.0.1:80" - "127.0.0.1 80"
//! - "0.0.0.0"   - "0.0.0.0:80"   - "0.0.0.0 80"
//! - ":80" (wildcard address)
//!
//! Only IPv4 results are produced; IPv6 literals are rejected and IPv6
//! resolution results are dropped.

use std::net::{SocketAddr, ToSocketAddrs};

use super::{Error, InetHost, Result};

/// Parsed host components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHost {
    /// The address part (dotted IPv4 address or hostname)
    pub host: Option<String>,
    /// The port part
    pub port: PortSpec,
}

impl ParsedHost {
    /// The numeric port, 0 when none was given
    ///
    /// Service names are not looked up here; they are an error.
    pub fn port_number(&self) -> Result<u16> {
        match &self.port {
            PortSpec::None => Ok(0),
            PortSpec::Single(port) => Ok(*port),
            PortSpec::Service(name) => Err(Error::InvalidAddress(format!(
                "Port {:?} is not numeric",
                name
            ))),
        }
    }
}

/// Port specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    /// No port specified
    None,
    /// Numeric port
    Single(u16),
    /// Service name that needs resolution (e.g., "http")
    Service(String),
}

/// Parser for `host[:port]` and `host port` strings
pub struct HostParser;

impl HostParser {
    /// Parse a host string into address and port components
    ///
    /// # Examples
    /// ```
    /// use inet_socket::net::resolver::{HostParser, PortSpec};
    ///
    /// let parsed = HostParser::parse("localhost:8080", None).unwrap();
    /// assert_eq!(parsed.host.as_deref(), Some("localhost"));
    /// assert_eq!(parsed.port, PortSpec::Single(8080));
    /// ```
    pub fn parse(addr: &str, default_port: Option<&str>) -> Result<ParsedHost> {
        let (host, port) = Self::split(addr)?;

        let port = match port.or(default_port) {
            Some(port_str) => Self::parse_port(port_str),
            None => PortSpec::None,
        };

        Ok(ParsedHost {
            host: host.map(String::from),
            port,
        })
    }

    fn split(addr: &str) -> Result<(Option<&str>, Option<&str>)> {
        let addr = addr.trim();

        if addr.is_empty() {
            return Err(Error::InvalidAddress("Empty address".to_string()));
        }

        if addr.starts_with('[') {
            return Err(Error::UnsupportedFamily(format!(
                "IPv6 address {:?} cannot be used as an IPv4 host",
                addr
            )));
        }

        if let Some(space_pos) = addr.find(' ') {
            let host = &addr[..space_pos];
            let port = addr[space_pos + 1..].trim();
            return Ok((non_empty(host), non_empty(port)));
        }

        if let Some(colon_pos) = addr.find(':') {
            if addr[colon_pos + 1..].contains(':') {
                return Err(Error::UnsupportedFamily(format!(
                    "IPv6 address {:?} cannot be used as an IPv4 host",
                    addr
                )));
            }

            let host = &addr[..colon_pos];
            let port = &addr[colon_pos + 1..];
            return Ok((non_empty(host), non_empty(port)));
        }

        Ok((Some(addr), None))
    }

    fn parse_port(port_str: &str) -> PortSpec {
        match port_str.parse::<u16>() {
            Ok(port) => PortSpec::Single(port),
            Err(_) => PortSpec::Service(port_str.to_string()),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Iterator over resolved IPv4 hosts
pub struct ResolveIter {
    hosts: std::vec::IntoIter<InetHost>,
}

impl ResolveIter {
    /// Resolve a host string to IPv4 hosts
    ///
    /// # Examples
    /// ```
    /// use inet_socket::net::resolver::ResolveIter;
    ///
    /// let hosts: Vec<_> = ResolveIter::resolve("127.0.0.1:8080", None)
    ///     .unwrap()
    ///     .collect();
    /// assert_eq!(hosts[0].port(), 8080);
    /// ```
    pub fn resolve(addr: &str, default_port: Option<&str>) -> Result<Self> {
        let parsed = HostParser::parse(addr, default_port)?;
        let host = parsed.host.as_deref().unwrap_or("0.0.0.0");

        let lookup = match &parsed.port {
            PortSpec::None => format!("{}:0", host),
            PortSpec::Single(port) => format!("{}:{}", host, port),
            PortSpec::Service(name) => format!("{}:{}", host, name),
        };

        let hosts: Vec<InetHost> = lookup
            .to_socket_addrs()
            .map_err(|e| Error::ResolutionFailed(e.to_string()))?
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(InetHost::from(v4)),
                SocketAddr::V6(_) => None,
            })
            .collect();

        if hosts.is_empty() {
            return Err(Error::ResolutionFailed(format!(
                "No IPv4 addresses found for {}",
                lookup
            )));
        }

        tracing::trace!(%lookup, count = hosts.len(), "resolved host");

        Ok(ResolveIter {
            hosts: hosts.into_iter(),
        })
    }

    /// Resolve and return only the first host
    pub fn resolve_first(addr: &str, default_port: Option<&str>) -> Result<InetHost> {
        Self::resolve(addr, default_port)?
            .next()
            .ok_or_else(|| Error::ResolutionFailed("No addresses resolved".to_string()))
    }
}

impl Iterator for ResolveIter {
    type Item = InetHost;

    fn next(&mut self) -> Option<Self::Item> {
        self.hosts.next()
    }
}

impl InetHost {
    /// Resolve a host name or address string to all of its IPv4 hosts
    pub fn resolve(addr: &str, default_port: Option<&str>) -> Result<Vec<InetHost>> {
        Ok(ResolveIter::resolve(addr, default_port)?.collect())
    }

    /// Resolve a host name or address string to its first IPv4 host
    pub fn resolve_first(addr: &str, default_port: Option<&str>) -> Result<InetHost> {
        ResolveIter::resolve_first(addr, default_port)
    }
}
