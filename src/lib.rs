//! Thin IPv4 socket wrappers
//!
//! Named methods over the Berkeley socket calls: address and host values,
//! a base socket, a connection-oriented socket, and TCP/UDP specializations.

pub mod net;

pub use net::{
    Bind, Connection, Endpoint, Error, InetAddress, InetHost, Listen, NetworkContext, Result,
    Socket, TcpClient, TcpServer, Transfer, UdpSocket,
};
