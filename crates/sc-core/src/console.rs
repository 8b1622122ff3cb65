//! Attach a local terminal to a sandbox debug console
//!
//! ```text
//! sandbox id ──► DiscoveryClient::resolve ──► SandboxAddress
//!                                                  │ dial
//!                                                  ▼
//! terminal ◄──── Relay ◄──── SessionEndpoint ◄── Connection
//! ```
//!
//! The terminal only enters raw mode once a connection exists, so every
//! resolution or dial failure leaves it untouched.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::Instrument;

use crate::address::SandboxAddress;
use crate::config::ConsoleConfig;
use crate::discovery::DiscoveryClient;
use crate::endpoint::SessionEndpoint;
use crate::error::ConsoleError;
use crate::relay::{BufferPool, Relay, RelayStats};
use crate::terminal::{LocalTerminal, RawMode, RawModeGuard};
use crate::transport::Connection;

/// Entry point for console sessions
#[derive(Debug, Clone)]
pub struct Console {
    config: ConsoleConfig,
    discovery: DiscoveryClient,
    pool: Arc<BufferPool>,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Result<Self, ConsoleError> {
        config.validate()?;
        let discovery = DiscoveryClient::from_config(&config)?;
        Ok(Self {
            config,
            discovery,
            pool: Arc::new(BufferPool::default()),
        })
    }

    /// Share a buffer pool between sessions
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Look up the console address of `sandbox_id`
    pub async fn resolve(&self, sandbox_id: &str) -> Result<SandboxAddress, ConsoleError> {
        let sandbox_id = require_sandbox_id(sandbox_id)?;
        Ok(self
            .discovery
            .resolve(sandbox_id, self.config.debug_port)
            .await?)
    }

    /// Resolve and dial the console of `sandbox_id`
    pub async fn connect(&self, sandbox_id: &str) -> Result<Connection, ConsoleError> {
        let address = self.resolve(sandbox_id).await?;
        Ok(address.dial(self.config.dial_timeout).await?)
    }

    /// Attach `terminal` to the debug console of `sandbox_id`.
    ///
    /// Returns once the remote side stops producing output.
    ///
    /// # Arguments
    /// * `sandbox_id` - Sandbox whose console to enter
    /// * `terminal` - Local streams plus the raw-mode switch for them
    ///
    /// # Returns
    /// Byte counts for the session. Resolution and dial failures are
    /// returned before the terminal enters raw mode.
    pub async fn attach<M, I, O>(
        &self,
        sandbox_id: &str,
        terminal: LocalTerminal<M, I, O>,
    ) -> Result<RelayStats, ConsoleError>
    where
        M: RawMode,
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
    {
        let span = tracing::info_span!(
            "exec",
            endpoint = %self.config.monitor_address,
            port = self.config.debug_port,
            sandbox = sandbox_id,
        );

        async {
            let conn = self.connect(sandbox_id).await?;
            self.relay(conn, terminal).await
        }
        .instrument(span)
        .await
    }

    /// Relay between an established connection and `terminal`, holding the
    /// terminal in raw mode for the duration.
    pub async fn relay<C, M, I, O>(
        &self,
        conn: C,
        terminal: LocalTerminal<M, I, O>,
    ) -> Result<RelayStats, ConsoleError>
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
        M: RawMode,
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
    {
        let LocalTerminal {
            mut raw_mode,
            input,
            output,
        } = terminal;

        let endpoint = SessionEndpoint::new(conn);
        let guard = match RawModeGuard::new(&mut raw_mode) {
            Ok(guard) => guard,
            Err(e) => {
                // Nothing will ever read from the endpoint, release it
                let _ = endpoint.close().await;
                return Err(ConsoleError::Terminal(e));
            }
        };

        let relay = Relay::new(Arc::clone(&self.pool));
        let stats = relay.run(endpoint, input, output).await;

        let restored = guard.restore();
        let stats = match (stats, restored) {
            (Ok(stats), Ok(())) => stats,
            (Ok(_), Err(e)) => return Err(ConsoleError::Terminal(e)),
            (Err(e), restored) => {
                if let Err(restore_err) = restored {
                    tracing::warn!("Failed to restore terminal: {}", restore_err);
                }
                return Err(e.into());
            }
        };
        Ok(stats)
    }
}

fn require_sandbox_id(sandbox_id: &str) -> Result<&str, ConsoleError> {
    let trimmed = sandbox_id.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::Usage("SandboxID not found".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::testing::RecordingRawMode;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    fn console() -> Console {
        Console::new(ConsoleConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_sandbox_id_is_usage_error() {
        let err = console().resolve("  ").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Usage(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ConsoleConfig {
            debug_port: 0,
            ..Default::default()
        };
        assert!(matches!(Console::new(config), Err(ConsoleError::Config(_))));
    }

    #[tokio::test]
    async fn test_relay_holds_raw_mode_until_remote_closes() {
        let (local, mut remote) = duplex(1024);
        let (_stdin_writer, stdin) = duplex(64);
        let (stdout, mut stdout_reader) = duplex(1024);
        let mode = RecordingRawMode::default();
        let raw = mode.raw.clone();
        let disabled = mode.disabled.clone();

        let console = console();
        let session = tokio::spawn(async move {
            console
                .relay(local, LocalTerminal::new(mode, stdin, stdout))
                .await
        });

        remote.write_all(b"sh-5.1# ").await.unwrap();
        let mut buf = [0u8; 8];
        stdout_reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"sh-5.1# ");
        assert!(raw.load(Ordering::SeqCst));

        drop(remote);
        let stats = tokio::time::timeout(Duration::from_secs(1), session)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stats.received, 8);
        assert!(!raw.load(Ordering::SeqCst));
        assert_eq!(disabled.load(Ordering::SeqCst), 1);
    }

    /// Raw mode that switches on but refuses to switch back
    struct StuckRawMode;

    impl RawMode for StuckRawMode {
        fn enable(&mut self) -> std::io::Result<()> {
            Ok(())
        }

        fn disable(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "tcsetattr failed"))
        }
    }

    #[tokio::test]
    async fn test_relay_error_wins_over_restore_error() {
        let (local, mut remote) = duplex(1024);
        let (_stdin_writer, stdin) = duplex(64);
        let (stdout, stdout_reader) = duplex(64);
        drop(stdout_reader);

        remote.write_all(b"boot log").await.unwrap();
        let err = console()
            .relay(local, LocalTerminal::new(StuckRawMode, stdin, stdout))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Stream(_)));
    }

    #[tokio::test]
    async fn test_restore_error_reported_after_clean_session() {
        let (local, remote) = duplex(1024);
        let (_stdin_writer, stdin) = duplex(64);
        let (stdout, _stdout_reader) = duplex(64);
        drop(remote);

        let err = console()
            .relay(local, LocalTerminal::new(StuckRawMode, stdin, stdout))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Terminal(_)));
    }

    #[tokio::test]
    async fn test_relay_error_still_restores_terminal() {
        let (local, mut remote) = duplex(1024);
        let (_stdin_writer, stdin) = duplex(64);
        let (stdout, stdout_reader) = duplex(64);
        drop(stdout_reader);
        let mode = RecordingRawMode::default();
        let raw = mode.raw.clone();

        remote.write_all(b"boot log").await.unwrap();
        let err = console()
            .relay(local, LocalTerminal::new(mode, stdin, stdout))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Stream(_)));
        assert!(!raw.load(Ordering::SeqCst));
    }
}
