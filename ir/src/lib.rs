//! Loom intermediate representation.
//!
//! Building a wiring spec produces a tree of IR nodes.  Each node represents
//! one artifact of the compiled system: a service instance, a client wrapper,
//! a process, a container, an address, a configuration value, or a piece of
//! build-time metadata.  This crate provides the shared vocabulary for those
//! nodes (the [`IrNode`] trait, the [`NodeRef`] shared handle, and the
//! [`NodeKind`] tag that namespaces use to decide where a node may be built)
//! along with deterministic rendering and filtering helpers.
//!
//! # Capability dispatch
//!
//! There is no node class hierarchy.  A node advertises capabilities through
//! trait methods with conservative defaults: [`IrNode::is_metadata`] for nodes
//! with no runtime presence, and [`IrNode::as_namespace`] for nodes that
//! contain other nodes.  Consumers that need a concrete type downcast through
//! [`NodeRef::downcast_ref`].
//!
//! # Rendering
//!
//! Every node has a deterministic [`IrNode::render`] projection used for
//! debugging and for test assertions.  Rendering is one-way; it is not a
//! serialization format.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod node;
pub mod render;

pub use node::{Application, ArtifactIr, IrNode, NamespaceIr, NodeKind, NodeRef, ValueNode};
pub use render::{filter, filter_kind, indent, render_namespace};
