//! Loom wiring specification and build engine.
//!
//! A wiring specification is a deferred, name-based registry of node
//! definitions, aliases, and properties.  Declaring things never builds
//! anything; the registry simply accumulates.  Calling
//! [`WiringSpec::build_ir`] constructs a root namespace and drives on-demand
//! recursive construction of the application's IR.
//!
//! The pieces:
//!
//! - [`callsite`]: captures the wiring-file line of every declaration so
//!   that build errors and diagnostics point back at the operator's code.
//! - [`spec`]: the declarative registry ([`WiringSpec`], [`WiringDef`]).
//! - [`namespace`]: the hierarchical dependency-injection engine
//!   ([`Namespace`], [`NamespaceHandler`]) that instantiates nodes on
//!   demand, threads cross-boundary edges, and owns the deferred work queue.
//! - [`application`]: build orchestration; seeds the root namespace with
//!   the requested roots and drains the deferred queue.
//!
//! The engine is single-threaded and runs once, at build time.  Shared state
//! uses `Rc`/`RefCell` handles throughout; no borrow is held across a call
//! into a user-provided build closure.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod application;
pub mod callsite;
pub mod error;
pub mod namespace;
pub mod spec;

pub use application::{build_application_ir, BuildError};
pub use callsite::Callsite;
pub use error::WiringError;
pub use namespace::{Namespace, NamespaceHandler};
pub use spec::{BuildFn, WiringDef, WiringOpts, WiringSpec};
