//! Hybrid vsock dialer
//!
//! A hybrid vsock proxy (as used by Firecracker and Cloud Hypervisor) exposes
//! guest vsock ports through one host Unix socket. The client asks for a
//! port with `CONNECT <port>\n` and the proxy answers `OK <host port>\n`
//! before the stream becomes transparent.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::error::DialError;

/// Prefix of a successful proxy reply
pub const HYBRID_VSOCK_ACK: &str = "OK";

/// Longest proxy reply accepted before giving up on the handshake
const MAX_REPLY_LEN: usize = 64;

/// Connect to guest `port` through the proxy socket at `path`.
///
/// The timeout covers both the socket connect and the handshake.
pub async fn dial_hybrid_vsock(path: &Path, port: u32, timeout: Duration) -> Result<UnixStream, DialError> {
    let address = format!("hvsock:{}:{}", path.display(), port);

    super::with_timeout(address.clone(), timeout, async {
        let mut stream = UnixStream::connect(path)
            .await
            .map_err(|source| DialError::Connect {
                address: address.clone(),
                source,
            })?;

        handshake(&mut stream, path, port)
            .await
            .map_err(|e| match e {
                HandshakeFailure::Io(source) => DialError::Connect { address, source },
                HandshakeFailure::Rejected(reply) => DialError::Handshake {
                    path: path.to_path_buf(),
                    reply,
                },
            })?;

        Ok(stream)
    })
    .await
}

enum HandshakeFailure {
    Io(std::io::Error),
    Rejected(String),
}

impl From<std::io::Error> for HandshakeFailure {
    fn from(e: std::io::Error) -> Self {
        HandshakeFailure::Io(e)
    }
}

async fn handshake(stream: &mut UnixStream, path: &Path, port: u32) -> Result<(), HandshakeFailure> {
    stream
        .write_all(format!("CONNECT {}\n", port).as_bytes())
        .await?;

    // Byte at a time: anything after the newline already belongs to the console.
    let mut reply = Vec::with_capacity(16);
    loop {
        let byte = match stream.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(HandshakeFailure::Rejected(
                    String::from_utf8_lossy(&reply).into_owned(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        if byte == b'\n' {
            break;
        }
        reply.push(byte);
        if reply.len() > MAX_REPLY_LEN {
            return Err(HandshakeFailure::Rejected(
                String::from_utf8_lossy(&reply).into_owned(),
            ));
        }
    }

    let reply = String::from_utf8_lossy(&reply).into_owned();
    if !reply.starts_with(HYBRID_VSOCK_ACK) {
        return Err(HandshakeFailure::Rejected(reply));
    }

    tracing::debug!(path = %path.display(), port, reply = %reply.trim_end(), "Hybrid vsock handshake complete");
    Ok(())
}
