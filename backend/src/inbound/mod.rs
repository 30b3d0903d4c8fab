//! Inbound adapters that translate external requests into domain service
//! calls while keeping transport details at the edge.
//!
//! The command-line adapter lives under [`cli`].

pub mod cli;

pub use cli::{CliHandler, CliPolicies, CliRequest};
