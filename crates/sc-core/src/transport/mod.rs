//! Transport dialers for console sockets
//!
//! Each [`Scheme`] has its own dialer; both produce a [`Connection`], a plain
//! bidirectional byte stream, so everything past the dial is agnostic to the
//! address family. Dials are bounded by a timeout and never retried: the
//! caller has to resolve again, since a failure may mean the discovered
//! address went stale.

mod hybrid;
mod vsock;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::UnixStream;

use crate::address::{SandboxAddress, Scheme};
use crate::config::DEFAULT_DIAL_TIMEOUT;
use crate::error::DialError;

pub use hybrid::{dial_hybrid_vsock, HYBRID_VSOCK_ACK};
pub use vsock::{dial_vsock, VsockStream};

/// A connected console socket
pub enum Connection {
    /// Direct AF_VSOCK stream to the guest
    Vsock(VsockStream),
    /// Host Unix socket forwarded to the guest by a hybrid vsock proxy
    HybridVsock(UnixStream),
}

impl Connection {
    pub fn scheme(&self) -> Scheme {
        match self {
            Connection::Vsock(_) => Scheme::Vsock,
            Connection::HybridVsock(_) => Scheme::HybridVsock,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Connection").field(&self.scheme()).finish()
    }
}

impl SandboxAddress {
    /// Dial this address with the default timeout
    pub async fn connect(&self) -> Result<Connection, DialError> {
        self.dial(DEFAULT_DIAL_TIMEOUT).await
    }

    /// Dial this address, giving up after `timeout`
    pub async fn dial(&self, timeout: Duration) -> Result<Connection, DialError> {
        tracing::debug!(address = %self, ?timeout, "Dialing console socket");

        let conn = match self {
            SandboxAddress::Vsock { cid, port } => {
                Connection::Vsock(dial_vsock(*cid, *port, timeout).await?)
            }
            SandboxAddress::HybridVsock { path, port } => {
                Connection::HybridVsock(dial_hybrid_vsock(path, *port, timeout).await?)
            }
        };

        tracing::info!(address = %self, "Connected to console socket");
        Ok(conn)
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Vsock(s) => Pin::new(s).poll_read(cx, buf),
            Connection::HybridVsock(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Vsock(s) => Pin::new(s).poll_write(cx, buf),
            Connection::HybridVsock(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Vsock(s) => Pin::new(s).poll_flush(cx),
            Connection::HybridVsock(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Vsock(s) => Pin::new(s).poll_shutdown(cx),
            Connection::HybridVsock(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Map a connect attempt bounded by `timeout` onto [`DialError`]
pub(crate) async fn with_timeout<T, F>(address: String, timeout: Duration, fut: F) -> Result<T, DialError>
where
    F: std::future::Future<Output = Result<T, DialError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(DialError::Timeout { address, timeout }),
    }
}
