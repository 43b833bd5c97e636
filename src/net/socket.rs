//! Base socket and the bind/listen capabilities
//!
//! [`Socket`] owns one OS socket handle plus a primary host, the default
//! target for operations that do not name one. The handle is owned
//! exclusively: it is closed by [`Socket::close`] or when the owner is
//! dropped, and [`Socket::try_clone`] is the only way to get a second handle
//! (an independent duplicate, not an alias).
//!
//! What a socket may do is split into capability traits so that each
//! specialization picks the ones it supports:
//!
//! | Trait        | Operations                                   |
//! |--------------|----------------------------------------------|
//! | [`Endpoint`] | validity, close, local host, socket options  |
//! | [`Bind`]     | `bind`, `bind_to`, `bind_port`               |
//! | [`Listen`]   | `listen`, `listen_with_backlog`, `accept`    |
//! | [`Transfer`](super::Transfer) | `connect`, send and receive |

use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::time::Duration;

use socket2::{Domain, Protocol, Type};

use super::option::{self, SockOptValue};
use super::{write_error, Error, InetHost, Result};

/// An OS socket handle and its primary host.
///
/// A socket whose open failed, or that has been closed, holds no handle;
/// [`is_valid`](Socket::is_valid) reports this and every OS operation on it
/// fails with [`Error::InvalidHandle`].
#[derive(Debug)]
pub struct Socket {
    handle: Option<socket2::Socket>,
    host: InetHost,
}

impl Socket {
    /// Open a new OS socket
    pub fn open(domain: Domain, ty: Type, protocol: Option<Protocol>) -> Result<Self> {
        let handle = socket2::Socket::new(domain, ty, protocol)?;
        tracing::debug!(fd = handle.as_raw_fd(), "opened socket");
        Ok(Socket::from_parts(handle, InetHost::new()))
    }

    /// Open a new OS socket, or return an invalid socket on failure
    ///
    /// On failure the error code and message are written to `diag` as
    /// `"<code> | <message>"` and logged; check [`is_valid`](Socket::is_valid)
    /// before use.
    pub fn open_or_invalid<W: io::Write>(
        domain: Domain,
        ty: Type,
        protocol: Option<Protocol>,
        diag: &mut W,
    ) -> Self {
        match socket2::Socket::new(domain, ty, protocol) {
            Ok(handle) => Socket::from_parts(handle, InetHost::new()),
            Err(err) => {
                tracing::error!(error = %err, "socket open failed");
                // Diagnostic output is best effort
                let _ = write_error(diag, &err);
                Socket::invalid()
            }
        }
    }

    /// Wrap an existing handle with the given primary host
    pub fn from_parts(handle: socket2::Socket, host: InetHost) -> Self {
        Socket {
            handle: Some(handle),
            host,
        }
    }

    /// A socket holding no handle
    pub fn invalid() -> Self {
        Socket {
            handle: None,
            host: InetHost::new(),
        }
    }

    /// Check if the socket holds an open handle
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// The underlying handle
    pub fn handle(&self) -> Result<&socket2::Socket> {
        self.handle.as_ref().ok_or(Error::InvalidHandle)
    }

    /// The raw file descriptor
    pub fn raw_fd(&self) -> Result<RawFd> {
        Ok(self.handle()?.as_raw_fd())
    }

    /// The primary host operations default to
    pub fn host(&self) -> &InetHost {
        &self.host
    }

    /// Mutable access to the primary host, e.g. to change only its port
    pub fn host_mut(&mut self) -> &mut InetHost {
        &mut self.host
    }

    /// Replace the primary host; the OS handle is not touched
    pub fn set_host(&mut self, host: InetHost) {
        self.host = host;
    }

    /// Release the OS handle and report the result of `close(2)`
    ///
    /// The socket is invalid afterwards whether or not the close succeeded.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::InvalidHandle)?;
        let fd = handle.into_raw_fd();

        // SAFETY: fd was just released from the owning handle and is closed
        // exactly once here.
        let ret = unsafe { libc::close(fd) };
        if ret < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        tracing::debug!(fd, host = %self.host, "closed socket");
        Ok(())
    }

    /// Duplicate the handle into an independent socket with the same host
    pub fn try_clone(&self) -> Result<Socket> {
        let handle = self.handle()?.try_clone()?;
        Ok(Socket::from_parts(handle, self.host))
    }

    /// The locally bound host (`getsockname`)
    pub fn local_host(&self) -> Result<InetHost> {
        InetHost::try_from(&self.handle()?.local_addr()?)
    }

    /// The connected peer (`getpeername`)
    pub fn peer_host(&self) -> Result<InetHost> {
        InetHost::try_from(&self.handle()?.peer_addr()?)
    }

    /// Read a socket option as `T`
    pub fn get_sock_opt<T: SockOptValue>(&self, level: i32, name: i32) -> Result<T> {
        option::get_opt(self.raw_fd()?, level, name)
    }

    /// Write a socket option from `T`
    pub fn set_sock_opt<T: SockOptValue>(&self, level: i32, name: i32, value: &T) -> Result<()> {
        option::set_opt(self.raw_fd()?, level, name, value)
    }

    /// Set SO_REUSEADDR
    pub fn set_reuse_address(&self, reuse: bool) -> Result<()> {
        self.handle()?.set_reuse_address(reuse).map_err(Error::from)
    }

    /// Set TCP_NODELAY
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.handle()?.set_nodelay(nodelay).map_err(Error::from)
    }

    /// Set SO_KEEPALIVE
    pub fn set_keepalive(&self, keepalive: bool) -> Result<()> {
        self.handle()?.set_keepalive(keepalive).map_err(Error::from)
    }

    /// Set SO_LINGER
    pub fn set_linger(&self, linger: Option<Duration>) -> Result<()> {
        self.handle()?.set_linger(linger).map_err(Error::from)
    }

    /// Set SO_RCVTIMEO; `None` blocks indefinitely
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.handle()?.set_read_timeout(timeout).map_err(Error::from)
    }

    /// Set SO_SNDTIMEO; `None` blocks indefinitely
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.handle()?.set_write_timeout(timeout).map_err(Error::from)
    }

    /// Set socket to blocking or non-blocking mode
    pub fn set_blocking(&self, blocking: bool) -> Result<()> {
        self.handle()?.set_nonblocking(!blocking).map_err(Error::from)
    }

    pub(crate) fn bind_host(&self, host: &InetHost) -> Result<()> {
        self.handle()?.bind(&host.to_sock_addr())?;
        tracing::debug!(%host, "bound socket");
        Ok(())
    }

    pub(crate) fn listen_backlog(&self, backlog: i32) -> Result<()> {
        self.handle()?.listen(backlog)?;
        tracing::debug!(host = %self.host, backlog, "listening");
        Ok(())
    }

    pub(crate) fn accept_socket(&self) -> Result<Socket> {
        let (handle, addr) = self.handle()?.accept()?;
        let peer = InetHost::try_from(&addr).unwrap_or(InetHost::UNSET);
        tracing::debug!(%peer, "accepted connection");
        Ok(Socket::from_parts(handle, peer))
    }
}

/// Access to the underlying [`Socket`] and the operations every socket has.
pub trait Endpoint {
    fn socket(&self) -> &Socket;

    fn socket_mut(&mut self) -> &mut Socket;

    /// Check if the socket holds an open handle
    fn is_valid(&self) -> bool {
        self.socket().is_valid()
    }

    /// Release the OS handle
    fn close(&mut self) -> Result<()> {
        self.socket_mut().close()
    }

    /// The locally bound host (`getsockname`)
    fn local_host(&self) -> Result<InetHost> {
        self.socket().local_host()
    }

    /// The primary host operations default to
    fn primary_host(&self) -> InetHost {
        *self.socket().host()
    }

    fn set_primary_host(&mut self, host: InetHost) {
        self.socket_mut().set_host(host);
    }

    fn get_sock_opt<T: SockOptValue>(&self, level: i32, name: i32) -> Result<T> {
        self.socket().get_sock_opt(level, name)
    }

    fn set_sock_opt<T: SockOptValue>(&self, level: i32, name: i32, value: &T) -> Result<()> {
        self.socket().set_sock_opt(level, name, value)
    }
}

/// Sockets that can be bound to a local host.
pub trait Bind: Endpoint {
    /// Bind to the primary host
    fn bind(&self) -> Result<()> {
        let socket = self.socket();
        socket.bind_host(socket.host())
    }

    /// Bind to an explicit host
    fn bind_to(&self, host: &InetHost) -> Result<()> {
        self.socket().bind_host(host)
    }

    /// Set the primary host's port, then bind to the primary host
    fn bind_port(&mut self, port: u16) -> Result<()> {
        self.socket_mut().host_mut().set_port(port);
        self.bind()
    }
}

/// Sockets that can accept incoming connections.
pub trait Listen: Bind {
    /// Mark the socket as accepting connections, with the maximum backlog
    fn listen(&self) -> Result<()> {
        self.listen_with_backlog(libc::SOMAXCONN)
    }

    fn listen_with_backlog(&self, backlog: i32) -> Result<()> {
        self.socket().listen_backlog(backlog)
    }

    /// Block until a peer connects
    ///
    /// The returned socket's primary host is the peer.
    fn accept(&self) -> Result<Socket> {
        self.socket().accept_socket()
    }
}

impl Endpoint for Socket {
    fn socket(&self) -> &Socket {
        self
    }

    fn socket_mut(&mut self) -> &mut Socket {
        self
    }
}

impl Bind for Socket {}

impl Listen for Socket {}
