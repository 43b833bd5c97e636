//! TCP client and server
//!
//! [`TcpClient`] is a [`Connection`] fixed to `AF_INET`/`SOCK_STREAM`/
//! `IPPROTO_TCP`; [`TcpServer`] is a base socket fixed the same way, bound
//! to the wildcard address, whose `accept` hands back `TcpClient`s.
//!
//! [`TcpServerBuilder`] and [`TcpClientBuilder`] apply the usual socket
//! options before bind/listen and connect.

use std::time::Duration;

use socket2::{Domain, Protocol, Type};

use super::{
    Bind, Connection, Endpoint, Error, InetAddress, InetHost, Listen, ResolveIter, Result,
    Socket, Transfer,
};

fn open_tcp() -> Result<Socket> {
    Socket::open(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
}

/// A TCP stream socket.
///
/// Built from a target host it is not yet connected; call
/// [`connect`](Transfer::connect). Built from an accepted socket it is.
#[derive(Debug)]
pub struct TcpClient {
    conn: Connection,
}

impl TcpClient {
    /// Open a socket whose primary host is `host`
    pub fn new(host: InetHost) -> Result<Self> {
        let mut socket = open_tcp()?;
        socket.set_host(host);
        Ok(TcpClient {
            conn: Connection::from_socket(socket),
        })
    }

    /// Open a socket whose primary host is `address:port`
    pub fn with_address(address: InetAddress, port: u16) -> Result<Self> {
        TcpClient::new(InetHost::with_address(address, port))
    }

    /// Wrap an already connected socket, e.g. one returned by `accept`
    pub fn from_socket(socket: Socket) -> Self {
        TcpClient {
            conn: Connection::from_socket(socket),
        }
    }

    /// The connected peer (`getpeername`)
    pub fn peer_host(&self) -> Result<InetHost> {
        self.conn.peer_host()
    }

    /// Set TCP_NODELAY
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.conn.socket().set_nodelay(nodelay)
    }

    /// Give back the underlying connection
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl Endpoint for TcpClient {
    fn socket(&self) -> &Socket {
        self.conn.socket()
    }

    fn socket_mut(&mut self) -> &mut Socket {
        self.conn.socket_mut()
    }
}

impl Transfer for TcpClient {}

/// A listening TCP socket bound to the wildcard address.
#[derive(Debug)]
pub struct TcpServer {
    socket: Socket,
}

impl TcpServer {
    /// Open a socket with primary host `0.0.0.0:0`
    pub fn new() -> Result<Self> {
        let mut socket = open_tcp()?;
        socket.set_host(InetHost::with_address(InetAddress::ANY, 0));
        Ok(TcpServer { socket })
    }

    /// Open a socket with primary host `0.0.0.0:port`
    pub fn with_port(port: u16) -> Result<Self> {
        let mut server = TcpServer::new()?;
        server.socket.host_mut().set_port(port);
        Ok(server)
    }

    /// Block until a peer connects and return it as a client
    pub fn accept(&self) -> Result<TcpClient> {
        Ok(TcpClient::from_socket(self.socket.accept_socket()?))
    }
}

impl Endpoint for TcpServer {
    fn socket(&self) -> &Socket {
        &self.socket
    }

    fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }
}

impl Bind for TcpServer {}

impl Listen for TcpServer {}

/// TCP server builder
pub struct TcpServerBuilder {
    address: InetAddress,
    port: u16,
    reuse_address: bool,
    backlog: i32,
}

impl Default for TcpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpServerBuilder {
    /// Create a builder for `0.0.0.0:0` with SO_REUSEADDR and the maximum backlog
    pub fn new() -> Self {
        TcpServerBuilder {
            address: InetAddress::ANY,
            port: 0,
            reuse_address: true,
            backlog: libc::SOMAXCONN,
        }
    }

    /// Bind to a specific local address instead of the wildcard
    pub fn address(mut self, address: InetAddress) -> Self {
        self.address = address;
        self
    }

    /// Set the local port (default: 0, picked by the OS)
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set SO_REUSEADDR option (default: true)
    pub fn reuse_address(mut self, reuse: bool) -> Self {
        self.reuse_address = reuse;
        self
    }

    /// Set listen backlog (default: SOMAXCONN)
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Open, bind and listen
    pub fn build(&self) -> Result<TcpServer> {
        let mut server = TcpServer::new()?;
        server.set_primary_host(InetHost::with_address(self.address, self.port));
        server.socket.set_reuse_address(self.reuse_address)?;
        server.bind()?;
        server.listen_with_backlog(self.backlog)?;
        Ok(server)
    }
}

/// TCP client builder
pub struct TcpClientBuilder {
    nodelay: bool,
    keepalive: bool,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Default for TcpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpClientBuilder {
    /// Create a builder with no options set and blocking, untimed I/O
    pub fn new() -> Self {
        TcpClientBuilder {
            nodelay: false,
            keepalive: false,
            read_timeout: None,
            write_timeout: None,
        }
    }

    /// Set TCP_NODELAY option
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Set SO_KEEPALIVE option
    pub fn keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Set SO_RCVTIMEO option (default: none)
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set SO_SNDTIMEO option (default: none)
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Open a client for `host`, apply the options and connect
    pub fn connect(&self, host: &InetHost) -> Result<TcpClient> {
        let client = TcpClient::new(*host)?;
        let socket = client.socket();

        socket.set_nodelay(self.nodelay)?;
        if self.keepalive {
            socket.set_keepalive(true)?;
        }
        socket.set_read_timeout(self.read_timeout)?;
        socket.set_write_timeout(self.write_timeout)?;

        client.connect()?;
        Ok(client)
    }

    /// Resolve a host string and connect to the first host that accepts
    ///
    /// If every host fails, the error from the first attempt is returned.
    pub fn connect_addr(&self, addr: &str, default_port: Option<&str>) -> Result<TcpClient> {
        let mut hosts = ResolveIter::resolve(addr, default_port)?;

        let first = hosts
            .next()
            .ok_or_else(|| Error::ResolutionFailed("No addresses resolved".to_string()))?;

        match self.connect(&first) {
            Ok(client) => Ok(client),
            Err(first_err) => {
                for host in hosts {
                    if let Ok(client) = self.connect(&host) {
                        return Ok(client);
                    }
                }
                Err(first_err)
            }
        }
    }
}
