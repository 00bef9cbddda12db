//! Containers: the containment level that collects processes.

use std::any::Any;

use loom_ir::{render_namespace, IrNode, NamespaceIr, NodeKind, NodeRef};
use loom_wiring::{NamespaceHandler, WiringSpec};

use crate::membership;

/// IR node for one container.
#[derive(Debug, Default)]
pub struct Container {
    name: String,
    /// Processes built inside this container.
    pub children: Vec<NodeRef>,
    /// Cross-boundary dependencies threaded in from enclosing namespaces.
    pub edges: Vec<NodeRef>,
}

impl Container {
    fn new(name: &str) -> Self {
        Container {
            name: name.to_string(),
            children: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl IrNode for Container {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Container
    }

    fn render(&self) -> String {
        render_namespace(&self.name, "Container", &self.edges, &self.children)
    }

    fn as_namespace(&self) -> Option<&dyn NamespaceIr> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl NamespaceIr for Container {
    fn edges(&self) -> Vec<NodeRef> {
        self.edges.clone()
    }

    fn children(&self) -> Vec<NodeRef> {
        self.children.clone()
    }
}

struct ContainerHandler {
    node: NodeRef,
}

impl NamespaceHandler for ContainerHandler {
    fn accepts(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Process
    }

    fn add_node(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<Container>() {
            Some(mut container) => {
                container.children.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("container IR node has the wrong type")),
        }
    }

    fn add_edge(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<Container>() {
            Some(mut container) => {
                container.edges.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("container IR node has the wrong type")),
        }
    }
}

/// Adds a process to an existing container definition.
#[track_caller]
pub fn add_to_container(spec: &WiringSpec, container_name: &str, child: &str) {
    membership::add_child_to(spec, container_name, NodeKind::Container, child);
}

/// Defines a container called `container_name` holding the given children.
///
/// More children can be added later with [`add_to_container`].  Returns
/// `container_name`.
#[track_caller]
pub fn create_container(spec: &WiringSpec, container_name: &str, children: &[&str]) -> String {
    for child in children {
        add_to_container(spec, container_name, child);
    }

    let name = container_name.to_string();
    spec.define(container_name, NodeKind::Container, move |namespace| {
        let node = NodeRef::new(Container::new(&name));
        membership::instantiate_namespace(
            namespace,
            &name,
            "Container",
            Box::new(ContainerHandler { node: node.clone() }),
        )?;
        Ok(node)
    });

    container_name.to_string()
}

/// Deploys a process-level service into a container of its own.
///
/// The container name derives from the service name by replacing a
/// `_service` suffix with `_ctr`, or appending `_ctr`.  The service should
/// already have been deployed to a process.  Returns the container name.
#[track_caller]
pub fn deploy(spec: &WiringSpec, service: &str) -> String {
    let prefix = service.strip_suffix("_service").unwrap_or(service);
    let container_name = format!("{prefix}_ctr");
    create_container(spec, &container_name, &[service]);
    container_name
}
