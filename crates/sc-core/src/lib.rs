//! sc-core: attach a terminal to a sandbox's debug console
//!
//! The console socket of a sandbox is not at a fixed address. This crate
//! asks the sandbox monitor where it lives, dials it over vsock or hybrid
//! vsock, and relays raw terminal I/O until the remote side goes away.

pub mod address;
pub mod config;
pub mod console;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod relay;
pub mod terminal;
pub mod transport;

pub use address::{SandboxAddress, Scheme};
pub use console::Console;
pub use discovery::DiscoveryClient;
pub use endpoint::SessionEndpoint;
pub use error::{ConfigError, ConsoleError, DialError, ResolveError, StreamError};
pub use relay::{BufferPool, Relay, RelayStats};
pub use terminal::{CrosstermRawMode, LocalTerminal, RawMode, RawModeGuard};
pub use transport::Connection;
