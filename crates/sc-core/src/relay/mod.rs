//! Relay engine: copies bytes between the local terminal and a session endpoint
//!
//! Two copy loops run concurrently:
//!
//! - **inbound** (terminal input -> endpoint) is spawned and never joined.
//!   It ends when its input reaches end-of-file, when a write fails, or as
//!   soon as the endpoint is closed. End-of-file only stops this loop: the
//!   remote may still be answering input it already received.
//! - **outbound** (endpoint -> terminal output) is awaited. When it ends the
//!   session is over: the endpoint is closed, which releases the inbound
//!   loop, and the completion token fires.
//!
//! The outbound loop always closes the endpoint on its way out, the inbound
//! loop only when it fails. Only one close can win; the loser's
//! [`StreamError::Closed`] is expected and ignored.

mod pool;

pub use pool::{BufferPool, PooledBuffer, DEFAULT_BUFFER_SIZE};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::endpoint::SessionEndpoint;
use crate::error::StreamError;

/// Copy direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local terminal input to the remote console
    Inbound,
    /// Remote console output to the local terminal
    Outbound,
}

/// Lifecycle of one copy loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionState {
    Idle,
    Copying,
    Done,
}

/// Byte counts for a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes written to the endpoint by the time the session ended
    pub sent: u64,
    /// Bytes delivered to the terminal output
    pub received: u64,
}

/// Runs one relay session
#[derive(Debug)]
pub struct Relay {
    pool: Arc<BufferPool>,
    done: CancellationToken,
}

impl Relay {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            done: CancellationToken::new(),
        }
    }

    /// Token cancelled when the outbound direction finishes
    pub fn completion(&self) -> CancellationToken {
        self.done.clone()
    }

    /// Relay between `endpoint` and the terminal streams until the remote
    /// side stops producing output.
    ///
    /// The endpoint is always closed before this returns. A read error on
    /// the endpoint or a write error on `output` is returned after teardown;
    /// the inbound loop's own errors are only logged.
    pub async fn run<C, I, O>(
        &self,
        endpoint: SessionEndpoint<C>,
        input: I,
        mut output: O,
    ) -> Result<RelayStats, StreamError>
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
    {
        let sent = Arc::new(AtomicU64::new(0));

        // Inbound: detached, bounded by the endpoint's lifetime
        {
            let endpoint = endpoint.clone();
            let sent = Arc::clone(&sent);
            let buf = self.pool.acquire();
            tokio::spawn(async move {
                let result = copy_inbound(input, &endpoint, buf, &sent).await;
                finish(Direction::Inbound, result.as_ref().err());
                if result.is_err() {
                    close_tolerant(&endpoint, Direction::Inbound).await;
                }
            });
        }

        // Outbound: awaited, defines the end of the session
        let buf = self.pool.acquire();
        let result = copy_outbound(&endpoint, &mut output, buf).await;
        finish(Direction::Outbound, result.as_ref().err());
        close_tolerant(&endpoint, Direction::Outbound).await;
        self.done.cancel();

        let stats = RelayStats {
            sent: sent.load(Ordering::Relaxed),
            received: match &result {
                Ok(n) => *n,
                Err(_) => 0,
            },
        };
        tracing::info!(sent = stats.sent, received = stats.received, "Relay finished");

        match result {
            Ok(_) => Ok(stats),
            // The inbound side closed first: a normal end of session
            Err(StreamError::Closed) => Ok(stats),
            Err(e) => Err(e),
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(Arc::new(BufferPool::default()))
    }
}

async fn copy_inbound<C, I>(
    mut input: I,
    endpoint: &SessionEndpoint<C>,
    mut buf: PooledBuffer,
    sent: &AtomicU64,
) -> Result<(), StreamError>
where
    C: AsyncRead + AsyncWrite,
    I: AsyncRead + Unpin,
{
    transition(Direction::Inbound, DirectionState::Copying);
    loop {
        let n = tokio::select! {
            biased;
            _ = endpoint.closed() => return Err(StreamError::Closed),
            n = input.read(&mut buf) => n?,
        };
        if n == 0 {
            return Ok(());
        }
        endpoint.write_all(&buf[..n]).await?;
        sent.fetch_add(n as u64, Ordering::Relaxed);
    }
}

async fn copy_outbound<C, O>(
    endpoint: &SessionEndpoint<C>,
    output: &mut O,
    mut buf: PooledBuffer,
) -> Result<u64, StreamError>
where
    C: AsyncRead + AsyncWrite,
    O: AsyncWrite + Unpin,
{
    transition(Direction::Outbound, DirectionState::Copying);
    let mut total = 0u64;
    loop {
        let n = endpoint.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        output.write_all(&buf[..n]).await?;
        output.flush().await?;
        total += n as u64;
    }
}

fn transition(direction: Direction, state: DirectionState) {
    tracing::trace!(?direction, ?state, "Relay direction state change");
}

fn finish(direction: Direction, error: Option<&StreamError>) {
    match error {
        None => tracing::debug!(?direction, "Reached end of stream"),
        Some(StreamError::Closed) => tracing::debug!(?direction, "Endpoint closed by the other direction"),
        Some(e) => tracing::debug!(?direction, error = %e, "Copy loop failed"),
    }
    transition(direction, DirectionState::Done);
}

async fn close_tolerant<C>(endpoint: &SessionEndpoint<C>, direction: Direction)
where
    C: AsyncRead + AsyncWrite,
{
    match endpoint.close().await {
        Ok(()) => tracing::debug!(?direction, "Closed session endpoint"),
        Err(StreamError::Closed) => {}
        Err(e) => tracing::warn!(?direction, error = %e, "Error closing session endpoint"),
    }
}
