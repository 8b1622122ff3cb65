//! Session endpoint: one live connection with close-once semantics
//!
//! Both relay directions hold a handle to the same endpoint. Closing is a
//! single compare-and-set on the `closed` flag; the winner wakes any read or
//! write still parked on the connection, shuts the write side down and drops
//! the connection. Every operation after that, including another `close`,
//! fails with [`StreamError::Closed`] without touching the transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;

/// Shared handle to a console connection
pub struct SessionEndpoint<C> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    closed: AtomicBool,
    shutdown: CancellationToken,
    reader: Mutex<Option<ReadHalf<C>>>,
    writer: Mutex<Option<WriteHalf<C>>>,
}

impl<C> Clone for SessionEndpoint<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> SessionEndpoint<C>
where
    C: AsyncRead + AsyncWrite,
{
    /// Take ownership of a freshly dialed connection
    pub fn new(conn: C) -> Self {
        let (reader, writer) = tokio::io::split(conn);
        Self {
            inner: Arc::new(Inner {
                closed: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                reader: Mutex::new(Some(reader)),
                writer: Mutex::new(Some(writer)),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Resolves once the endpoint has been closed
    pub async fn closed(&self) {
        self.inner.shutdown.cancelled().await
    }

    /// Read from the connection. `Ok(0)` means the remote side finished.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, StreamError> {
        if self.is_closed() {
            return Err(StreamError::Closed);
        }

        let mut guard = tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => return Err(StreamError::Closed),
            guard = self.inner.reader.lock() => guard,
        };
        let reader = guard.as_mut().ok_or(StreamError::Closed)?;

        tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => Err(StreamError::Closed),
            n = reader.read(buf) => Ok(n?),
        }
    }

    /// Write to the connection, returning how many bytes were accepted
    pub async fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        if self.is_closed() {
            return Err(StreamError::Closed);
        }

        let mut guard = tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => return Err(StreamError::Closed),
            guard = self.inner.writer.lock() => guard,
        };
        let writer = guard.as_mut().ok_or(StreamError::Closed)?;

        tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => Err(StreamError::Closed),
            n = writer.write(buf) => Ok(n?),
        }
    }

    /// Write all of `buf`
    pub async fn write_all(&self, mut buf: &[u8]) -> Result<(), StreamError> {
        while !buf.is_empty() {
            let n = self.write(buf).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            buf = &buf[n..];
        }
        Ok(())
    }

    /// Close the connection.
    ///
    /// Only the first call does anything; later calls return
    /// [`StreamError::Closed`]. The first call only fails if shutting down
    /// the transport fails, and the endpoint counts as closed either way.
    pub async fn close(&self) -> Result<(), StreamError> {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StreamError::Closed);
        }

        // Wake the other direction so it releases its half
        self.inner.shutdown.cancel();

        let writer = self.inner.writer.lock().await.take();
        let reader = self.inner.reader.lock().await.take();

        let result = match writer {
            Some(mut writer) => writer.shutdown().await,
            None => Ok(()),
        };
        drop(reader);

        tracing::debug!("Session endpoint closed");
        result.map_err(StreamError::from)
    }
}
