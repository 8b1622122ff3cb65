//! AF_VSOCK dialer

use std::time::Duration;

use crate::error::DialError;

#[cfg(target_os = "linux")]
pub use tokio_vsock::VsockStream;

/// Connect to `port` on the guest with context ID `cid`
#[cfg(target_os = "linux")]
pub async fn dial_vsock(cid: u32, port: u32, timeout: Duration) -> Result<VsockStream, DialError> {
    use tokio_vsock::VsockAddr;

    let address = format!("vsock:{}:{}", cid, port);
    super::with_timeout(address.clone(), timeout, async {
        VsockStream::connect(VsockAddr::new(cid, port))
            .await
            .map_err(|source| DialError::Connect { address, source })
    })
    .await
}

/// Connect to `port` on the guest with context ID `cid`
#[cfg(not(target_os = "linux"))]
pub async fn dial_vsock(cid: u32, port: u32, _timeout: Duration) -> Result<VsockStream, DialError> {
    Err(DialError::Unsupported(format!("vsock:{}:{}", cid, port)))
}

/// AF_VSOCK only exists on Linux; elsewhere no stream can ever be produced.
#[cfg(not(target_os = "linux"))]
pub enum VsockStream {}

#[cfg(not(target_os = "linux"))]
mod unsupported {
    use super::VsockStream;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    impl AsyncRead for VsockStream {
        fn poll_read(self: Pin<&mut Self>, _: &mut Context<'_>, _: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            match *self {}
        }
    }

    impl AsyncWrite for VsockStream {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            match *self {}
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            match *self {}
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            match *self {}
        }
    }
}
