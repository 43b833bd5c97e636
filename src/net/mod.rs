//! Network wrappers
//!
//! This module provides thin, named wrappers over the IPv4 socket calls:
//! address and host values, the base socket with its bind/listen capability,
//! the connection-oriented transfer capability, and the TCP and UDP
//! specializations built from them.

pub mod addr;
pub mod connection;
pub mod context;
pub mod option;
pub mod resolver;
pub mod socket;
pub mod tcp;
pub mod udp;
pub mod wire;

use std::io;

pub use addr::{InetAddress, InetHost};
pub use connection::{Connection, Transfer, MAX_DATAGRAM};
pub use context::NetworkContext;
pub use option::{Linger, SockOptValue};
pub use resolver::{HostParser, ResolveIter};
pub use socket::{Bind, Endpoint, Listen, Socket};
pub use tcp::{TcpClient, TcpClientBuilder, TcpServer, TcpServerBuilder};
pub use udp::UdpSocket;
pub use wire::WireValue;

/// Result type for network operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Address resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("Unsupported address family: {0}")]
    UnsupportedFamily(String),

    #[error("Socket handle is not open")]
    InvalidHandle,

    #[error("Short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("Received data is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// The raw OS error code, if this error came from the OS
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Io(err) => err.raw_os_error(),
            _ => None,
        }
    }

    /// Check whether the error means the peer went away or the link dropped
    ///
    /// These are expected in normal stream operation and are surfaced to the
    /// caller unchanged; nothing in this crate retries on them.
    pub fn is_disconnect(&self) -> bool {
        let Error::Io(err) = self else {
            return false;
        };

        matches!(
            err.kind(),
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::NotConnected
        ) || matches!(
            err.raw_os_error(),
            Some(libc::ECONNRESET)
                | Some(libc::ENOTCONN)
                | Some(libc::EPIPE)
                | Some(libc::ENETDOWN)
                | Some(libc::ENETUNREACH)
                | Some(libc::ENETRESET)
                | Some(libc::ECONNABORTED)
                | Some(libc::EHOSTUNREACH)
        )
    }
}

/// Write the last OS socket error as `"<code> | <message>"`
///
/// Purely informational: it reads the thread's last error and formats it,
/// nothing else.
pub fn write_last_error<W: io::Write>(out: &mut W) -> io::Result<()> {
    write_error(out, &io::Error::last_os_error())
}

/// Write a captured OS error as `"<code> | <message>"`
pub fn write_error<W: io::Write>(out: &mut W, err: &io::Error) -> io::Result<()> {
    let code = err.raw_os_error().unwrap_or(0);
    let message = match err.raw_os_error() {
        // Strip the " (os error N)" suffix std appends
        Some(_) => {
            let text = err.to_string();
            match text.rfind(" (os error") {
                Some(pos) => text[..pos].to_string(),
                None => text,
            }
        }
        None => err.to_string(),
    };
    writeln!(out, "{} | {}", code, message)
}
