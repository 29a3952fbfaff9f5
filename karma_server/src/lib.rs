//! HTTP surface for the karma points economy.
//!
//! The binary wires these modules together; they are exposed as a library
//! so integration tests can build the router against an in-memory store.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
