//! IPv4 address and host values
//!
//! This module provides the two value types every socket operation is
//! expressed in: [`InetAddress`], a 32-bit IPv4 address kept in network byte
//! order, and [`InetHost`], an address/port pair laid out like the OS's
//! `sockaddr_in`. Both convert freely to and from the std, `libc` and
//! `socket2` representations.

use std::fmt;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::ptr;
use std::str::FromStr;

use socket2::SockAddr;

use super::resolver::HostParser;
use super::{Error, Result};

const AF_INET: libc::sa_family_t = libc::AF_INET as libc::sa_family_t;

/// An IPv4 address stored as a `u32` in network byte order.
///
/// The in-memory layout matches `in_addr.s_addr`, so the raw value can be
/// handed to the OS without swapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InetAddress {
    raw: u32,
}

impl InetAddress {
    /// The wildcard address (0.0.0.0)
    pub const ANY: InetAddress = InetAddress::from_octets(0, 0, 0, 0);

    /// The loopback address (127.0.0.1)
    pub const LOOPBACK: InetAddress = InetAddress::from_octets(127, 0, 0, 1);

    /// The limited broadcast address (255.255.255.255)
    pub const BROADCAST: InetAddress = InetAddress::from_octets(255, 255, 255, 255);

    /// Build an address from its four octets, most significant first
    pub const fn from_octets(o1: u8, o2: u8, o3: u8, o4: u8) -> Self {
        InetAddress {
            raw: u32::from_ne_bytes([o1, o2, o3, o4]),
        }
    }

    /// Wrap a raw value that is already in network byte order
    pub const fn from_raw(raw: u32) -> Self {
        InetAddress { raw }
    }

    /// The raw value in network byte order
    pub const fn raw(&self) -> u32 {
        self.raw
    }

    /// The four octets, most significant first
    pub const fn octets(&self) -> [u8; 4] {
        self.raw.to_ne_bytes()
    }

    /// Check if this is the wildcard address
    pub fn is_any(&self) -> bool {
        self.raw == 0
    }

    /// Convert to the OS native `in_addr`
    pub fn to_in_addr(&self) -> libc::in_addr {
        libc::in_addr { s_addr: self.raw }
    }

    /// Convert to a standard library address
    pub fn to_ipv4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.octets())
    }
}

impl FromStr for InetAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<Ipv4Addr>()
            .map(InetAddress::from)
            .map_err(|_| Error::InvalidAddress(format!("Not a dotted IPv4 address: {:?}", s)))
    }
}

impl From<Ipv4Addr> for InetAddress {
    fn from(ip: Ipv4Addr) -> Self {
        let [o1, o2, o3, o4] = ip.octets();
        InetAddress::from_octets(o1, o2, o3, o4)
    }
}

impl From<InetAddress> for Ipv4Addr {
    fn from(addr: InetAddress) -> Self {
        addr.to_ipv4()
    }
}

impl From<libc::in_addr> for InetAddress {
    fn from(addr: libc::in_addr) -> Self {
        InetAddress::from_raw(addr.s_addr)
    }
}

impl From<InetAddress> for libc::in_addr {
    fn from(addr: InetAddress) -> Self {
        addr.to_in_addr()
    }
}

impl From<[u8; 4]> for InetAddress {
    fn from(octets: [u8; 4]) -> Self {
        InetAddress::from_octets(octets[0], octets[1], octets[2], octets[3])
    }
}

impl fmt::Display for InetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ipv4())
    }
}

/// An IPv4 endpoint: address family, address and port.
///
/// The port is kept in network byte order, the same way `sockaddr_in` keeps
/// it; [`port`](InetHost::port) and [`set_port`](InetHost::set_port) work in
/// host byte order.
///
/// The all-zero value ([`InetHost::UNSET`]) marks "no host", for example the
/// peer reported by a receive on a connected stream socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InetHost {
    family: libc::sa_family_t,
    port_be: u16,
    address: InetAddress,
}

impl InetHost {
    /// The unset sentinel: family, address and port all zero
    pub const UNSET: InetHost = InetHost {
        family: 0,
        port_be: 0,
        address: InetAddress::ANY,
    };

    /// An IPv4 host with the wildcard address and port 0
    pub fn new() -> Self {
        InetHost {
            family: AF_INET,
            port_be: 0,
            address: InetAddress::ANY,
        }
    }

    /// An IPv4 host for `address`, with `port` given in host byte order
    pub fn with_address(address: InetAddress, port: u16) -> Self {
        let mut host = InetHost::new();
        host.set_address(address);
        host.set_port(port);
        host
    }

    /// An IPv4 host from a raw network-order address and host-order port
    pub fn from_raw(address: u32, port: u16) -> Self {
        InetHost::with_address(InetAddress::from_raw(address), port)
    }

    /// An IPv4 host from a dotted address string and host-order port
    pub fn parse_with_port(address: &str, port: u16) -> Result<Self> {
        Ok(InetHost::with_address(address.parse()?, port))
    }

    /// Set the port (host byte order)
    pub fn set_port(&mut self, port: u16) {
        self.port_be = port.to_be();
    }

    /// Set the address
    pub fn set_address(&mut self, address: InetAddress) {
        self.address = address;
    }

    /// Get the port in host byte order
    pub fn port(&self) -> u16 {
        u16::from_be(self.port_be)
    }

    /// Get the address
    pub fn address(&self) -> InetAddress {
        self.address
    }

    /// Get the address family tag
    pub fn family(&self) -> libc::sa_family_t {
        self.family
    }

    /// Check if this is the unset sentinel (all fields zero)
    pub fn is_unset(&self) -> bool {
        self.family == 0 && self.address.raw() == 0 && self.port_be == 0
    }

    /// Check if this host holds anything other than the unset sentinel
    pub fn is_valid(&self) -> bool {
        !self.is_unset()
    }

    /// Convert to the OS native `sockaddr_in`
    pub fn to_sockaddr_in(&self) -> libc::sockaddr_in {
        // SAFETY: sockaddr_in is plain old data; all-zero is a valid value
        // and also clears sin_zero (and sin_len where it exists).
        let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
        sin.sin_family = self.family;
        sin.sin_port = self.port_be;
        sin.sin_addr = self.address.to_in_addr();
        sin
    }

    /// Convert to the generic socket address used by the socket calls
    ///
    /// The family tag is passed through as is, so a host that is not tagged
    /// `AF_INET` (including [`InetHost::UNSET`]) is left for the OS to judge.
    pub fn to_sock_addr(&self) -> SockAddr {
        let sin = self.to_sockaddr_in();
        // SAFETY: sockaddr_storage is plain old data and larger than
        // sockaddr_in, so the zeroed storage can hold the copy and the
        // length covers exactly the bytes written.
        unsafe {
            let mut storage: libc::sockaddr_storage = mem::zeroed();
            ptr::write(
                &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_in,
                sin,
            );
            SockAddr::new(storage, mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
        }
    }

    /// Convert to a standard library socket address
    pub fn to_socket_addr_v4(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.address.to_ipv4(), self.port())
    }
}

impl Default for InetHost {
    fn default() -> Self {
        InetHost::new()
    }
}

impl From<libc::sockaddr_in> for InetHost {
    fn from(sin: libc::sockaddr_in) -> Self {
        InetHost {
            family: sin.sin_family,
            port_be: sin.sin_port,
            address: InetAddress::from(sin.sin_addr),
        }
    }
}

impl From<InetHost> for libc::sockaddr_in {
    fn from(host: InetHost) -> Self {
        host.to_sockaddr_in()
    }
}

impl From<SocketAddrV4> for InetHost {
    fn from(addr: SocketAddrV4) -> Self {
        InetHost::with_address(InetAddress::from(*addr.ip()), addr.port())
    }
}

impl From<InetHost> for SocketAddrV4 {
    fn from(host: InetHost) -> Self {
        host.to_socket_addr_v4()
    }
}

impl From<InetHost> for SockAddr {
    fn from(host: InetHost) -> Self {
        host.to_sock_addr()
    }
}

impl TryFrom<&SockAddr> for InetHost {
    type Error = Error;

    /// Read an `AF_INET` address, or an unspecified one as built by
    /// [`InetHost::to_sock_addr`] for the unset sentinel
    ///
    /// An unspecified address too short to hold a `sockaddr_in` (what the OS
    /// reports for a stream peer) becomes [`InetHost::UNSET`].
    fn try_from(addr: &SockAddr) -> Result<Self> {
        let family = addr.family();
        if family == AF_INET || family == 0 {
            if addr.len() as usize >= mem::size_of::<libc::sockaddr_in>() {
                // SAFETY: the storage holds at least a sockaddr_in worth of
                // initialized bytes; the read does not assume alignment.
                let sin =
                    unsafe { ptr::read_unaligned(addr.as_ptr() as *const libc::sockaddr_in) };
                return Ok(InetHost::from(sin));
            }
            if family == 0 {
                return Ok(InetHost::UNSET);
            }
        }
        Err(Error::UnsupportedFamily(format!(
            "Address family {} is not IPv4",
            family
        )))
    }
}

impl TryFrom<SockAddr> for InetHost {
    type Error = Error;

    fn try_from(addr: SockAddr) -> Result<Self> {
        InetHost::try_from(&addr)
    }
}

impl FromStr for InetHost {
    type Err = Error;

    /// Parse `"a.b.c.d:port"`, `"a.b.c.d port"` or a bare address (port 0)
    fn from_str(s: &str) -> Result<Self> {
        let parsed = HostParser::parse(s, None)?;
        let address = match parsed.host.as_deref() {
            Some(host) => host.parse()?,
            None => InetAddress::ANY,
        };
        Ok(InetHost::with_address(address, parsed.port_number()?))
    }
}

impl fmt::Display for InetHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}>", self.address, self.port())
    }
}
