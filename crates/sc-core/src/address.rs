//! Console socket addresses
//!
//! The monitor reports where a sandbox's agent socket lives as a URI:
//!
//! - `vsock://<cid>:<port>` for a guest reachable over AF_VSOCK
//! - `hvsock://<unix socket path>:<port>` for a hybrid vsock proxy (a host
//!   Unix socket that forwards to a guest vsock port)
//!
//! The port in that URI is the agent's port. The debug console listens on a
//! different guest port, so parsing always substitutes the caller's port.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ResolveError;

/// Supported address families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `vsock`: numeric context ID plus port
    Vsock,
    /// `hvsock`: host Unix socket path plus guest port
    HybridVsock,
}

impl Scheme {
    /// URI scheme string
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Vsock => "vsock",
            Scheme::HybridVsock => "hvsock",
        }
    }

    /// Build the address for this scheme from a discovery URI, replacing
    /// the discovered port with `port`.
    ///
    /// The discovered port is validated for shape only. It is never used,
    /// so the full 32-bit vsock port range is accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use sc_core::{SandboxAddress, Scheme};
    ///
    /// let addr = Scheme::Vsock.parse_address("vsock://7:1073741824", 1026).unwrap();
    /// assert_eq!(addr, SandboxAddress::Vsock { cid: 7, port: 1026 });
    /// ```
    pub fn parse_address(self, raw: &str, port: u32) -> Result<SandboxAddress, ResolveError> {
        match self {
            Scheme::Vsock => {
                // vsock://31513974:1024
                let invalid = || ResolveError::InvalidVsockAddress(raw.to_string());
                let authority = raw
                    .strip_prefix("vsock://")
                    .and_then(|rest| rest.split(['/', '?', '#']).next())
                    .ok_or_else(invalid)?;

                let fields: Vec<&str> = authority.split(':').collect();
                let [cid, agent_port] = fields.as_slice() else {
                    return Err(invalid());
                };
                if agent_port.is_empty() || !agent_port.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let cid = cid.parse::<u32>().map_err(|_| invalid())?;
                Ok(SandboxAddress::Vsock { cid, port })
            }
            Scheme::HybridVsock => {
                // hvsock:///run/vc/firecracker/<id>/root/kata.hvsock:1024
                let invalid = || ResolveError::InvalidHybridVsockAddress(raw.to_string());
                let uri = Url::parse(raw).map_err(|source| ResolveError::InvalidUri {
                    address: raw.to_string(),
                    source,
                })?;
                let path = percent_decode_str(uri.path())
                    .decode_utf8()
                    .map_err(|_| invalid())?;

                let fields: Vec<&str> = path.split(':').collect();
                match fields.as_slice() {
                    [path, agent_port] if !path.is_empty() && !agent_port.is_empty() => {
                        Ok(SandboxAddress::HybridVsock {
                            path: PathBuf::from(*path),
                            port,
                        })
                    }
                    _ => Err(invalid()),
                }
            }
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vsock" => Ok(Scheme::Vsock),
            "hvsock" => Ok(Scheme::HybridVsock),
            other => Err(ResolveError::SchemeNotFound(other.to_string())),
        }
    }
}

/// A validated console socket address.
///
/// `Display` renders the dialer form `vsock:<cid>:<port>` or
/// `hvsock:<path>:<port>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SandboxAddress {
    Vsock { cid: u32, port: u32 },
    HybridVsock { path: PathBuf, port: u32 },
}

impl SandboxAddress {
    /// Parse a discovery response into an address targeting `port`.
    ///
    /// A single trailing newline is ignored. The scheme is read before
    /// anything else, so an unsupported scheme is always reported by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use sc_core::SandboxAddress;
    ///
    /// let addr = SandboxAddress::parse("hvsock:///run/vc/x/kata.hvsock:1024\n", 1026).unwrap();
    /// assert_eq!(addr.to_string(), "hvsock:/run/vc/x/kata.hvsock:1026");
    /// ```
    pub fn parse(response: &str, port: u32) -> Result<Self, ResolveError> {
        let raw = strip_newline(response);
        let scheme: Scheme = uri_scheme(raw)
            .ok_or_else(|| ResolveError::InvalidUri {
                address: raw.to_string(),
                source: url::ParseError::RelativeUrlWithoutBase,
            })?
            .parse()?;
        scheme.parse_address(raw, port)
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            SandboxAddress::Vsock { .. } => Scheme::Vsock,
            SandboxAddress::HybridVsock { .. } => Scheme::HybridVsock,
        }
    }

    pub fn port(&self) -> u32 {
        match self {
            SandboxAddress::Vsock { port, .. } | SandboxAddress::HybridVsock { port, .. } => *port,
        }
    }

    /// The context ID (vsock) or socket path (hybrid vsock), as text
    pub fn host_identifier(&self) -> String {
        match self {
            SandboxAddress::Vsock { cid, .. } => cid.to_string(),
            SandboxAddress::HybridVsock { path, .. } => path.display().to_string(),
        }
    }

    /// Socket path of a hybrid vsock address
    pub fn socket_path(&self) -> Option<&Path> {
        match self {
            SandboxAddress::HybridVsock { path, .. } => Some(path),
            SandboxAddress::Vsock { .. } => None,
        }
    }
}

impl fmt::Display for SandboxAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scheme(), self.host_identifier(), self.port())
    }
}

/// The `scheme` of `scheme:rest`, if `s` starts with a syntactically valid one
fn uri_scheme(s: &str) -> Option<&str> {
    let (scheme, _) = s.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn strip_newline(s: &str) -> &str {
    let s = s.strip_suffix('\n').unwrap_or(s);
    s.strip_suffix('\r').unwrap_or(s)
}
