//! Namespace kinds and wiring helpers for Loom specs.
//!
//! Each module here is a small plugin over the core wiring engine:
//!
//! - [`service`]: declares application-level service instances with a
//!   pointer, so other plugins can wrap their clients and servers.
//! - [`rpc`]: deploys a service behind an address with an RPC client and
//!   server pair.
//! - [`process`] / [`container`]: containment levels that collect
//!   instances and processes respectively.
//! - [`pool`]: wraps the client side of a service with a bounded pool.
//! - [`memstore`]: in-memory cache and queue instances, unique
//!   application-wide.
//! - [`testbundle`]: collects client instances of selected services so a
//!   test harness can be emitted for them.
//! - [`membership`]: shared machinery for placing (possibly pointered)
//!   children inside namespace nodes.
//!
//! All of these follow the same recipe: declaration helpers write
//! definitions, aliases, and properties into the spec; the node itself is
//! built later, on demand, when some namespace gets it.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod container;
pub mod membership;
pub mod memstore;
pub mod pool;
pub mod process;
pub mod rpc;
pub mod service;
pub mod testbundle;
