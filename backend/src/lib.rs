//! Fleet delivery dashboard data core.
//!
//! The crate follows a hexagonal layout: [`domain`] holds the services and
//! the ports they depend on, [`outbound`] provides document store adapters,
//! and [`inbound`] drives the services from the command line.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::FleetSettings;
