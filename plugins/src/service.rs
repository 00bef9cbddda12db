//! Application-level service instances.
//!
//! A service is declared with a type label and the names of its dependencies.
//! Declaring a service installs three things: the handler definition that
//! builds the instance, a uniqueness constraint so the instance cannot be
//! silently duplicated across containment scopes, and a pointer so other
//! plugins can wrap the service's clients and servers.

use std::any::Any;

use loom_ir::{IrNode, NodeKind, NodeRef, ValueNode};
use loom_pointer::{create_pointer, require_uniqueness};
use loom_wiring::WiringSpec;

/// IR node for one service instance.
#[derive(Debug)]
pub struct ServiceInstance {
    name: String,
    service_type: String,
    args: Vec<NodeRef>,
}

impl ServiceInstance {
    fn new(name: &str, service_type: &str, args: Vec<NodeRef>) -> Self {
        ServiceInstance {
            name: name.to_string(),
            service_type: service_type.to_string(),
            args,
        }
    }

    /// The declared service type label.
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    /// The resolved constructor arguments, in declaration order.
    pub fn args(&self) -> &[NodeRef] {
        &self.args
    }
}

impl IrNode for ServiceInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Instance
    }

    fn render(&self) -> String {
        let args: Vec<String> = self.args.iter().map(NodeRef::name).collect();
        format!("{} = {}({})", self.name, self.service_type, args.join(", "))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Declares a service instance called `name` of type `service_type`, with
/// constructor arguments `args`.
///
/// Each argument is either the name of another node in the spec, or, when
/// no such definition exists, a literal configuration value captured as-is.
/// After this call `name` is a pointer: application-level modifiers can be
/// applied to it, and it can be deployed into a process or container.
///
/// Returns `name` for convenient chaining in wiring files.
#[track_caller]
pub fn define_service(
    spec: &WiringSpec,
    name: &str,
    service_type: &str,
    args: &[&str],
) -> String {
    let handler_name = format!("{name}.handler");
    let service_name = name.to_string();
    let type_label = service_type.to_string();
    let arg_names: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();

    spec.define(&handler_name, NodeKind::Instance, move |namespace| {
        let mut resolved = Vec::with_capacity(arg_names.len());
        for arg in &arg_names {
            if namespace.spec().get_def(arg).is_none() {
                resolved.push(NodeRef::new(ValueNode::new(arg)));
            } else {
                resolved.push(namespace.get(arg)?);
            }
        }
        Ok(NodeRef::new(ServiceInstance::new(
            &service_name,
            &type_label,
            resolved,
        )))
    });

    let dst_name = format!("{name}.dst");
    spec.alias(&dst_name, &handler_name);
    require_uniqueness(spec, &dst_name, NodeKind::Application);
    create_pointer(spec, name, &dst_name, NodeKind::Instance);

    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_ir::Application;

    #[test]
    fn services_build_with_resolved_and_literal_args() {
        let spec = WiringSpec::new("test");
        define_service(&spec, "leaf", "Leaf", &[]);
        define_service(&spec, "nonleaf", "NonLeaf", &["leaf", "500"]);
        let app = spec.build_ir(&["leaf", "nonleaf"]);
        let Ok(app) = app else {
            return assert!(false, "build failed");
        };
        let rendered = app.render();
        assert!(rendered.contains("leaf = Leaf()"));
        assert!(rendered.contains("nonleaf = NonLeaf(leaf, 500)"));
        assert!(rendered.contains("leaf.handler.visibility"));
    }

    #[test]
    fn shared_service_nodes_are_reused() {
        let spec = WiringSpec::new("test");
        define_service(&spec, "leaf", "Leaf", &[]);
        define_service(&spec, "a", "A", &["leaf"]);
        define_service(&spec, "b", "B", &["leaf"]);
        let app = spec.build_ir(&[]);
        let Ok(app) = app else {
            return assert!(false, "build failed");
        };
        let Some(children) = app
            .downcast_ref::<Application>()
            .map(|a| a.children.clone())
        else {
            return assert!(false, "no application node");
        };
        let leaves: Vec<NodeRef> = children
            .iter()
            .filter(|c| c.name() == "leaf")
            .cloned()
            .collect();
        assert_eq!(leaves.len(), 1);
    }
}
