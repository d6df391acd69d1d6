//! Listener setup over raw sockets.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

#[cfg(unix)]
const LISTEN_BACKLOG: i32 = libc::SOMAXCONN;
#[cfg(not(unix))]
const LISTEN_BACKLOG: i32 = 128;

/// Binds a non-blocking TCP listener on the wildcard address.
///
/// Tries one unspecified address per family and keeps the first that binds;
/// there is no preference between families. Must run inside a tokio runtime
/// (the listener registers with the reactor).
pub fn bind_listener(port: u16) -> io::Result<TcpListener> {
    let candidates = [
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
    ];

    let mut last_err = None;
    for addr in candidates {
        match try_bind(addr) {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                log::debug!("[Net] bind {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no bindable address")))
}

fn try_bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    TcpListener::from_std(socket.into())
}
