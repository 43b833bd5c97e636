//! Connection-oriented socket and the transfer capability
//!
//! [`Transfer`] adds `connect` and the send/receive family on top of
//! [`Endpoint`]. Every form performs exactly one OS call: there is no
//! partial-transfer loop, and a short fixed-size transfer is reported as
//! [`Error::ShortTransfer`] rather than retried.
//!
//! [`Connection`] is the plain socket with this capability. It deliberately
//! does not implement [`Bind`](super::Bind) or [`Listen`](super::Listen).

use std::mem::MaybeUninit;

use socket2::{Domain, Protocol, Type};

use super::wire::{self, WireValue};
use super::{Endpoint, Error, InetHost, Result, Socket};

/// Scratch size for the allocating receive forms (largest IPv4 datagram)
pub const MAX_DATAGRAM: usize = 0xFFFF;

fn as_uninit(buf: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: an initialized u8 is a valid MaybeUninit<u8>, and the socket
    // calls only ever write initialized bytes into the slice.
    unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) }
}

/// Sockets that connect to a peer and move data.
pub trait Transfer: Endpoint {
    /// Connect to the primary host
    fn connect(&self) -> Result<()> {
        let socket = self.socket();
        self.connect_to(socket.host())
    }

    /// Connect to an explicit host
    fn connect_to(&self, host: &InetHost) -> Result<()> {
        self.socket().handle()?.connect(&host.to_sock_addr())?;
        tracing::debug!(%host, "connected");
        Ok(())
    }

    /// Send `data` to `to`, or over the connection when `to` is `None`
    ///
    /// Returns the number of bytes the OS accepted.
    fn send_to(&self, data: &[u8], to: Option<&InetHost>, flags: i32) -> Result<usize> {
        let handle = self.socket().handle()?;
        let sent = match to {
            Some(host) => handle.send_to_with_flags(data, &host.to_sock_addr(), flags)?,
            None => handle.send_with_flags(data, flags)?,
        };
        tracing::trace!(sent, len = data.len(), "send");
        Ok(sent)
    }

    /// Receive into `buf`, returning the byte count and the sender
    ///
    /// The sender is [`InetHost::UNSET`] when the OS reports none, as on a
    /// connected stream socket. A count of 0 on a stream socket means the
    /// peer closed the connection.
    fn recv_from(&self, buf: &mut [u8], flags: i32) -> Result<(usize, InetHost)> {
        let (received, addr) = self
            .socket()
            .handle()?
            .recv_from_with_flags(as_uninit(buf), flags)?;
        let from = InetHost::try_from(&addr).unwrap_or(InetHost::UNSET);
        tracing::trace!(received, %from, "recv_from");
        Ok((received, from))
    }

    /// Send over the connection
    fn send(&self, data: &[u8], flags: i32) -> Result<usize> {
        self.send_to(data, None, flags)
    }

    /// Receive from the connection
    fn recv(&self, buf: &mut [u8], flags: i32) -> Result<usize> {
        let received = self
            .socket()
            .handle()?
            .recv_with_flags(as_uninit(buf), flags)?;
        tracing::trace!(received, "recv");
        Ok(received)
    }

    /// Receive one datagram (or one read's worth of stream data)
    fn recv_vec_from(&self, flags: i32) -> Result<(Vec<u8>, InetHost)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (received, from) = self.recv_from(&mut buf, flags)?;
        buf.truncate(received);
        Ok((buf, from))
    }

    fn recv_vec(&self, flags: i32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let received = self.recv(&mut buf, flags)?;
        buf.truncate(received);
        Ok(buf)
    }

    fn send_string_to(&self, string: &str, to: Option<&InetHost>, flags: i32) -> Result<usize> {
        self.send_to(string.as_bytes(), to, flags)
    }

    fn send_string(&self, string: &str, flags: i32) -> Result<usize> {
        self.send_to(string.as_bytes(), None, flags)
    }

    /// Receive one read's worth of data as UTF-8
    fn recv_string_from(&self, flags: i32) -> Result<(String, InetHost)> {
        let (bytes, from) = self.recv_vec_from(flags)?;
        Ok((String::from_utf8(bytes)?, from))
    }

    fn recv_string(&self, flags: i32) -> Result<String> {
        Ok(String::from_utf8(self.recv_vec(flags)?)?)
    }

    /// Send exactly `T::SIZE` bytes encoding `value` in one call
    fn send_value<T: WireValue>(&self, value: &T, flags: i32) -> Result<()> {
        let buf = wire::to_bytes(value);
        let sent = self.send(&buf, flags)?;
        if sent != T::SIZE {
            return Err(Error::ShortTransfer {
                expected: T::SIZE,
                actual: sent,
            });
        }
        Ok(())
    }

    /// Receive exactly `T::SIZE` bytes in one call and decode them
    fn recv_value<T: WireValue>(&self, flags: i32) -> Result<T> {
        let mut buf = vec![0u8; T::SIZE];
        let received = self.recv(&mut buf, flags)?;
        if received != T::SIZE {
            return Err(Error::ShortTransfer {
                expected: T::SIZE,
                actual: received,
            });
        }
        Ok(T::decode(&buf))
    }
}

/// A socket with the transfer capability and no bind/listen capability.
#[derive(Debug)]
pub struct Connection {
    socket: Socket,
}

impl Connection {
    /// Open a new OS socket for connection-oriented use
    pub fn open(domain: Domain, ty: Type, protocol: Option<Protocol>) -> Result<Self> {
        Ok(Connection::from_socket(Socket::open(domain, ty, protocol)?))
    }

    /// Take over an existing socket, e.g. one returned by `accept`
    pub fn from_socket(socket: Socket) -> Self {
        Connection { socket }
    }

    /// Give back the underlying socket
    pub fn into_socket(self) -> Socket {
        self.socket
    }

    /// The connected peer (`getpeername`)
    pub fn peer_host(&self) -> Result<InetHost> {
        self.socket.peer_host()
    }
}

impl Endpoint for Connection {
    fn socket(&self) -> &Socket {
        &self.socket
    }

    fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }
}

impl Transfer for Connection {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Bind, InetAddress, Listen};

    fn loopback() -> InetHost {
        InetHost::with_address(InetAddress::LOOPBACK, 0)
    }

    fn stream_pair() -> (Connection, Connection) {
        let listener = Socket::open(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).unwrap();
        listener.bind_to(&loopback()).unwrap();
        listener.listen().unwrap();
        let target = listener.local_host().unwrap();

        let mut client = Connection::open(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).unwrap();
        client.set_primary_host(target);
        client.connect().unwrap();

        let server = Connection::from_socket(listener.accept().unwrap());
        (client, server)
    }

    #[test]
    fn test_stream_bytes() {
        let (client, server) = stream_pair();

        assert_eq!(client.send(b"hello", 0).unwrap(), 5);
        let mut buf = [0u8; 5];
        let received = server.recv(&mut buf, libc::MSG_WAITALL).unwrap();
        assert_eq!(received, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_stream_recv_from_reports_unset_sender() {
        let (client, server) = stream_pair();

        client.send_string("ping", 0).unwrap();
        let (text, from) = server.recv_string_from(0).unwrap();
        assert_eq!(text, "ping");
        assert!(from.is_unset() || from == client.local_host().unwrap());
    }

    #[test]
    fn test_value_round_trip() {
        let (client, server) = stream_pair();

        client.send_value(&0xdead_beefu32, 0).unwrap();
        let value: u32 = server.recv_value(libc::MSG_WAITALL).unwrap();
        assert_eq!(value, 0xdead_beef);
    }

    #[test]
    fn test_short_value_is_error() {
        let (mut client, server) = stream_pair();

        client.send(&[1, 2], 0).unwrap();
        client.close().unwrap();

        let result = server.recv_value::<u64>(libc::MSG_WAITALL);
        assert!(matches!(
            result,
            Err(Error::ShortTransfer {
                expected: 8,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_peer_close_reads_empty() {
        let (mut client, server) = stream_pair();
        client.close().unwrap();

        assert!(server.recv_vec(0).unwrap().is_empty());
    }

    #[test]
    fn test_closed_connection_fails() {
        let (mut client, _server) = stream_pair();
        client.close().unwrap();

        assert!(!client.is_valid());
        assert!(matches!(client.send(b"x", 0), Err(Error::InvalidHandle)));
        let mut buf = [0u8; 1];
        assert!(matches!(client.recv(&mut buf, 0), Err(Error::InvalidHandle)));
    }

    #[test]
    fn test_datagram_send_to() {
        let receiver = Socket::open(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        receiver.bind_to(&loopback()).unwrap();
        let target = receiver.local_host().unwrap();
        let receiver = Connection::from_socket(receiver);

        let sender = Socket::open(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        sender.bind_to(&loopback()).unwrap();
        let sender = Connection::from_socket(sender);
        sender.send_to(b"datagram", Some(&target), 0).unwrap();

        let (data, from) = receiver.recv_vec_from(0).unwrap();
        assert_eq!(data, b"datagram");
        assert_eq!(from, sender.local_host().unwrap());
    }

    #[test]
    fn test_invalid_utf8() {
        let (client, server) = stream_pair();

        client.send(&[0xff, 0xfe], 0).unwrap();
        assert!(matches!(server.recv_string(0), Err(Error::InvalidUtf8(_))));
    }
}
