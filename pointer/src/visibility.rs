//! Uniqueness constraints on aliased nodes.
//!
//! A uniqueness check requires that an aliased node is reached from at most
//! one namespace of a given containment granularity.  This is how an
//! in-process backend is prevented from being silently duplicated across
//! processes: the first namespace that resolves through the alias claims the
//! node; a second namespace attempting the same is a reachability error.
//!
//! The check works with two extra definitions.  A metadata definition at the
//! granularity kind records the claiming namespace; because it is built at
//! the granularity level and cached there, every namespace underneath
//! observes the same record.  A check definition at the node's own kind
//! consults the record before building the real node, and the alias is
//! re-pointed at the check.

use std::any::Any;

use loom_ir::{IrNode, NodeKind, NodeRef};
use loom_wiring::WiringSpec;

/// Metadata node recording which namespace claimed a uniqueness-constrained
/// name.
#[derive(Debug, Default)]
pub struct VisibilityMetadata {
    name: String,
    claimed_by: Option<String>,
    node: Option<NodeRef>,
}

impl VisibilityMetadata {
    fn new(name: impl Into<String>) -> Self {
        VisibilityMetadata {
            name: name.into(),
            claimed_by: None,
            node: None,
        }
    }

    /// The namespace that resolved through the constrained alias, if any.
    #[must_use]
    pub fn claimed_by(&self) -> Option<&str> {
        self.claimed_by.as_deref()
    }

    /// The node built for the claiming namespace, if any.
    #[must_use]
    pub fn node(&self) -> Option<NodeRef> {
        self.node.clone()
    }
}

impl IrNode for VisibilityMetadata {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Metadata
    }

    fn render(&self) -> String {
        self.name.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Requires that the node behind `alias` is unique within the containment
/// granularity `granularity`.
///
/// `alias` must be an alias; the constraint re-points it at an internal
/// check definition.  Misuse is recorded as a declaration error on the spec
/// rather than failing the call.
#[track_caller]
pub fn require_uniqueness(spec: &WiringSpec, alias: &str, granularity: NodeKind) {
    let Some(target) = spec.get_alias(alias) else {
        spec.add_error(anyhow::anyhow!(
            "cannot configure the uniqueness of {alias} because it points directly to a node; uniqueness can only be set for aliases"
        ));
        return;
    };

    let Some(kind) = spec.get_def(&target).and_then(|def| def.kind()) else {
        spec.add_error(anyhow::anyhow!(
            "cannot configure the uniqueness of {target} because it does not exist"
        ));
        return;
    };

    let md_name = format!("{target}.visibility");
    let md = md_name.clone();
    spec.define(&md_name, granularity, move |_| {
        Ok(NodeRef::new(VisibilityMetadata::new(&md)))
    });

    let check_name = format!("{target}.uniqueness_check");
    let md = md_name.clone();
    let checked = target.clone();
    spec.define(&check_name, kind, move |namespace| {
        let record = namespace.get(&md)?;
        {
            let Some(mut record) = record.downcast_mut::<VisibilityMetadata>() else {
                return Err(namespace.err(format!(
                    "expected {md} to be uniqueness metadata, but it is {}",
                    record.name()
                )));
            };
            if let Some(previous) = record.claimed_by() {
                return Err(namespace.err(format!(
                    "reachability error detected for {checked}: {checked} is configured to be unique but cannot be simultaneously reached from namespaces {} and {previous}; fix by disabling uniqueness for {checked} or exposing {checked} over RPC",
                    namespace.name()
                )));
            }
            record.claimed_by = Some(namespace.name());
        }
        let node = namespace.get(&checked)?;
        if let Some(mut record) = record.downcast_mut::<VisibilityMetadata>() {
            record.node = Some(node.clone());
        }
        Ok(node)
    });

    spec.alias(alias, &check_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_ir::ValueNode;

    fn leaf_def(spec: &WiringSpec, name: &str) {
        let owned = name.to_string();
        spec.define(name, NodeKind::Instance, move |_| {
            Ok(NodeRef::new(ValueNode::new(&owned)))
        });
    }

    #[test]
    fn uniqueness_requires_an_alias() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "backend");
        require_uniqueness(&spec, "backend", NodeKind::Application);
        let err = spec.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("uniqueness can only be set for aliases"));
    }

    #[test]
    fn uniqueness_requires_an_existing_target() {
        let spec = WiringSpec::new("test");
        spec.alias("c", "ghost");
        require_uniqueness(&spec, "c", NodeKind::Application);
        let err = spec.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("because it does not exist"));
    }

    #[test]
    fn constrained_alias_resolves_through_the_check() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "backend");
        spec.alias("c", "backend");
        require_uniqueness(&spec, "c", NodeKind::Application);
        assert_eq!(
            spec.get_alias("c"),
            Some("backend.uniqueness_check".to_string())
        );
        // A single resolution through the alias succeeds.
        let app = spec.build_ir(&["c"]);
        assert!(app.is_ok());
    }
}
