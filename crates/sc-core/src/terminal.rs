//! Local terminal handling
//!
//! Raw mode is held by a guard for exactly as long as the relay runs, so the
//! terminal is restored on every exit path: normal return, error
//! propagation, and panics unwinding through the session.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, Stdin, Stdout};

/// Capability to switch a terminal in and out of raw mode
pub trait RawMode: Send {
    fn enable(&mut self) -> io::Result<()>;
    fn disable(&mut self) -> io::Result<()>;
}

/// Raw mode on the process's controlling terminal
#[derive(Debug, Default)]
pub struct CrosstermRawMode;

impl RawMode for CrosstermRawMode {
    fn enable(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable(&mut self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}

/// Keeps a terminal in raw mode until dropped
pub struct RawModeGuard<'a, M: RawMode> {
    mode: &'a mut M,
    active: bool,
}

impl<'a, M: RawMode> RawModeGuard<'a, M> {
    /// Enable raw mode; nothing needs restoring if this fails
    pub fn new(mode: &'a mut M) -> io::Result<Self> {
        mode.enable()?;
        tracing::trace!("Terminal raw mode enabled");
        Ok(Self { mode, active: true })
    }

    /// Restore the terminal now and report the result
    pub fn restore(mut self) -> io::Result<()> {
        self.active = false;
        self.mode.disable()
    }
}

impl<M: RawMode> Drop for RawModeGuard<'_, M> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.mode.disable() {
                tracing::warn!("Failed to restore terminal: {}", e);
            }
        }
    }
}

/// The interactive terminal a session is attached to
pub struct LocalTerminal<M, I, O> {
    pub raw_mode: M,
    pub input: I,
    pub output: O,
}

impl LocalTerminal<CrosstermRawMode, Stdin, Stdout> {
    /// The current process's terminal: stdin, stdout and raw mode on the tty
    pub fn current() -> Self {
        Self {
            raw_mode: CrosstermRawMode,
            input: tokio::io::stdin(),
            output: tokio::io::stdout(),
        }
    }
}

impl<M, I, O> LocalTerminal<M, I, O>
where
    M: RawMode,
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin,
{
    pub fn new(raw_mode: M, input: I, output: O) -> Self {
        Self {
            raw_mode,
            input,
            output,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Raw mode stand-in that records what happened to it
    #[derive(Debug, Clone, Default)]
    pub struct RecordingRawMode {
        pub raw: Arc<AtomicBool>,
        pub enabled: Arc<AtomicUsize>,
        pub disabled: Arc<AtomicUsize>,
    }

    impl RawMode for RecordingRawMode {
        fn enable(&mut self) -> io::Result<()> {
            self.raw.store(true, Ordering::SeqCst);
            self.enabled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn disable(&mut self) -> io::Result<()> {
            self.raw.store(false, Ordering::SeqCst);
            self.disabled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRawMode;
    use super::*;
    use std::sync::atomic::Ordering;

    struct FailingRawMode;

    impl RawMode for FailingRawMode {
        fn enable(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "not a tty"))
        }

        fn disable(&mut self) -> io::Result<()> {
            panic!("disable called without enable");
        }
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let mut mode = RecordingRawMode::default();
        let raw = mode.raw.clone();
        {
            let _guard = RawModeGuard::new(&mut mode).unwrap();
            assert!(raw.load(Ordering::SeqCst));
        }
        assert!(!raw.load(Ordering::SeqCst));
        assert_eq!(mode.disabled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_restore_disables_once() {
        let mut mode = RecordingRawMode::default();
        let guard = RawModeGuard::new(&mut mode).unwrap();
        guard.restore().unwrap();
        assert_eq!(mode.enabled.load(Ordering::SeqCst), 1);
        assert_eq!(mode.disabled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_enable_restores_nothing() {
        let mut mode = FailingRawMode;
        assert!(RawModeGuard::new(&mut mode).is_err());
    }

    #[test]
    fn test_guard_restores_during_unwind() {
        let mut mode = RecordingRawMode::default();
        let raw = mode.raw.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = RawModeGuard::new(&mut mode).unwrap();
            panic!("relay blew up");
        }));
        assert!(result.is_err());
        assert!(!raw.load(Ordering::SeqCst));
    }
}
