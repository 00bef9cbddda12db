//! Typed errors for the wiring registry and the namespace engine.
//!
//! Error messages are part of the crate's contract: tests and downstream
//! tooling match on the stable phrases `"does not exist in the wiring spec"`
//! and `"does not accept node"`.  Errors raised by build closures are plain
//! `anyhow` errors and propagate unchanged.

use loom_ir::NodeKind;
use thiserror::Error;

/// Errors produced by the wiring registry and the namespace engine.
#[derive(Debug, Error)]
pub enum WiringError {
    /// A `get` targeted a name with no definition after alias resolution.
    #[error("{name} does not exist in the wiring spec of namespace {namespace}")]
    UndefinedName {
        /// The requested name.
        name: String,
        /// The namespace the request was made from.
        namespace: String,
    },

    /// A property read found values of a different type than requested.
    #[error("property {key:?} of {name} does not hold values of the requested type")]
    PropertyType {
        /// The definition the property belongs to.
        name: String,
        /// The property key.
        key: String,
    },

    /// A definition was declared through property access only and carries no
    /// build function.
    #[error("{name} was never defined with a build function")]
    NoBuildFunction {
        /// The definition name.
        name: String,
    },

    /// A namespace cannot build a node kind and has no parent to delegate to.
    #[error("namespace {namespace} does not accept node {name} of kind {kind} and has no parent namespace to get it from")]
    NotAccepted {
        /// The refusing namespace.
        namespace: String,
        /// The requested name.
        name: String,
        /// The definition's node kind.
        kind: NodeKind,
    },

    /// A node was injected into a namespace that does not accept it, and the
    /// namespace has no parent to push it to.
    #[error("{name} of kind {kind} does not belong in namespace {namespace} and there is no parent namespace to push it to")]
    NoParentForPut {
        /// The refusing namespace.
        namespace: String,
        /// The injected node's name.
        name: String,
        /// The injected node's kind.
        kind: NodeKind,
    },

    /// Errors accumulated while declaring the wiring spec, surfaced at build
    /// time.
    #[error("errors were recorded while declaring the wiring spec:\n{}", .0.join("\n"))]
    Accumulated(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_phrases() {
        let err = WiringError::UndefinedName {
            name: "leaf".into(),
            namespace: "app".into(),
        };
        assert!(err.to_string().contains("does not exist in the wiring spec"));

        let err = WiringError::NotAccepted {
            namespace: "proc".into(),
            name: "leaf.addr".into(),
            kind: NodeKind::Address,
        };
        assert!(err.to_string().contains("does not accept node"));
    }

    #[test]
    fn accumulated_lists_every_error() {
        let err = WiringError::Accumulated(vec!["first".into(), "second".into()]);
        let text = err.to_string();
        assert!(text.contains("first"));
        assert!(text.contains("second"));
    }
}
