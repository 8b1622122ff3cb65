//! Core error types for sandbox-console

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for a console session
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Invalid invocation, reported before any I/O
    #[error("Usage error: {0}")]
    Usage(String),

    /// Address resolution error
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Transport dial error
    #[error("Dial error: {0}")]
    Dial(#[from] DialError),

    /// Relay stream error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local terminal could not be switched to or from raw mode
    #[error("Terminal error: {0}")]
    Terminal(#[source] io::Error),
}

/// Errors raised while turning a sandbox ID into a transport address
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The discovery request could not be sent
    #[error("Failed to get {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The discovery response body could not be read
    #[error("Failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The discovery service answered with a non-success status
    #[error("Failed to get {url}: {status}")]
    Status { url: String, status: u16 },

    /// The discovery URL could not be built from the configured endpoint
    #[error("Invalid discovery endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// The discovered address is not a URI
    #[error("Invalid address {address}: {source}")]
    InvalidUri {
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// A vsock URI without exactly `<cid>:<port>` in its authority
    #[error("Invalid vsock scheme: {0}")]
    InvalidVsockAddress(String),

    /// A hybrid vsock URI without `<path>:<port>` in its path
    #[error("Invalid hybrid vsock scheme: {0}")]
    InvalidHybridVsockAddress(String),

    /// Scheme other than `vsock` or `hvsock`
    #[error("schema {0} not found")]
    SchemeNotFound(String),
}

/// Errors raised while connecting to a resolved address
#[derive(Error, Debug)]
pub enum DialError {
    /// The connection (including any handshake) did not finish in time
    #[error("timed out dialing {address} after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// The transport refused or failed the connection
    #[error("failed to dial {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The hybrid vsock proxy rejected the `CONNECT` request
    #[error("hybrid vsock handshake with {path:?} failed: {reply:?}")]
    Handshake { path: PathBuf, reply: String },

    /// The address family is not available on this platform
    #[error("{0} is not supported on this platform")]
    Unsupported(String),
}

/// Errors raised by a session endpoint
#[derive(Error, Debug)]
pub enum StreamError {
    /// The endpoint was already closed
    #[error("stream closed")]
    Closed,

    /// I/O error on the underlying connection or local terminal
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StreamError {
    /// Whether this error only reports that the endpoint is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamError::Closed)
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Config file or directory could not be read or written
    #[error("Config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_reports_url_and_code() {
        let err = ResolveError::Status {
            url: "http://localhost:8090/agent-url?sandbox=abc".to_string(),
            status: 500,
        };
        let msg = err.to_string();
        assert!(msg.contains("agent-url?sandbox=abc"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn test_scheme_not_found_names_scheme() {
        let err = ResolveError::SchemeNotFound("tcp".to_string());
        assert_eq!(err.to_string(), "schema tcp not found");
    }

    #[test]
    fn test_stream_closed() {
        assert!(StreamError::Closed.is_closed());
        assert_eq!(StreamError::Closed.to_string(), "stream closed");

        let io_err = StreamError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(!io_err.is_closed());
    }

    #[test]
    fn test_console_error_wraps_sources() {
        let err: ConsoleError = StreamError::Closed.into();
        assert!(matches!(err, ConsoleError::Stream(StreamError::Closed)));

        let err: ConsoleError = ResolveError::InvalidVsockAddress("vsock://1".into()).into();
        assert!(err.to_string().contains("Invalid vsock scheme"));
    }
}
