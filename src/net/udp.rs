//! UDP socket
//!
//! A datagram socket fixed to `AF_INET`/`SOCK_DGRAM`/`IPPROTO_UDP`. It can
//! both bind and transfer; it cannot listen. `connect` only records a default
//! peer for `send`/`recv`.

use socket2::{Domain, Protocol, Type};

use super::{Bind, Endpoint, Error, InetAddress, InetHost, Result, Socket, Transfer};

#[derive(Debug)]
pub struct UdpSocket {
    socket: Socket,
}

impl UdpSocket {
    /// Open a socket with primary host `0.0.0.0:0`
    pub fn new() -> Result<Self> {
        UdpSocket::with_host(InetHost::with_address(InetAddress::ANY, 0))
    }

    /// Open a socket whose primary host is `host`
    pub fn with_host(host: InetHost) -> Result<Self> {
        let mut socket = Socket::open(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_host(host);
        Ok(UdpSocket { socket })
    }

    /// Set SO_BROADCAST
    pub fn set_broadcast(&self, broadcast: bool) -> Result<()> {
        self.socket.handle()?.set_broadcast(broadcast).map_err(Error::from)
    }
}

impl Endpoint for UdpSocket {
    fn socket(&self) -> &Socket {
        &self.socket
    }

    fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }
}

impl Bind for UdpSocket {}

impl Transfer for UdpSocket {}
