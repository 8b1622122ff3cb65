//! sc-cli: command-line front end for sandbox-console
//!
//! Provides the `sandbox-console` binary for attaching to a sandbox's
//! debug console and inspecting where that console lives.

pub mod commands;
pub mod output;
