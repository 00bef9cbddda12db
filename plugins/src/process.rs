//! Processes: the containment level that collects instance nodes.
//!
//! A process accepts implementation-level instances only.  Addresses,
//! configuration values, and metadata fall through to the parent namespace,
//! becoming argument edges of the process: the inputs a generated process
//! must be given at startup.

use std::any::Any;

use loom_ir::{render_namespace, IrNode, NamespaceIr, NodeKind, NodeRef};
use loom_wiring::{NamespaceHandler, WiringSpec};

use crate::membership;

/// IR node for one process.
#[derive(Debug, Default)]
pub struct Process {
    name: String,
    /// Instances built inside this process.
    pub children: Vec<NodeRef>,
    /// Cross-boundary dependencies threaded in from enclosing namespaces.
    pub edges: Vec<NodeRef>,
}

impl Process {
    fn new(name: &str) -> Self {
        Process {
            name: name.to_string(),
            children: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl IrNode for Process {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Process
    }

    fn render(&self) -> String {
        render_namespace(&self.name, "Process", &self.edges, &self.children)
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

impl NamespaceIr for Process {
    fn edges(&self) -> Vec<NodeRef> {
        self.edges.clone()
    }

    fn children(&self) -> Vec<NodeRef> {
        self.children.clone()
    }
}

pub(crate) struct ProcessHandler {
    node: NodeRef,
}

impl NamespaceHandler for ProcessHandler {
    fn accepts(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Instance
    }

    fn add_node(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<Process>() {
            Some(mut process) => {
                process.children.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("process IR node has the wrong type")),
        }
    }

    fn add_edge(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<Process>() {
            Some(mut process) => {
                process.edges.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("process IR node has the wrong type")),
        }
    }
}

/// Adds an instance to an existing process definition.
#[track_caller]
pub fn add_to_process(spec: &WiringSpec, process_name: &str, child: &str) {
    membership::add_child_to(spec, process_name, NodeKind::Process, child);
}

/// Defines a process called `process_name` containing the given children.
///
/// More children can be added later with [`add_to_process`].  Children that
/// are services become process-level services: their destination side is
/// instantiated inside this process.
///
/// Returns `process_name`.
#[track_caller]
pub fn create_process(spec: &WiringSpec, process_name: &str, children: &[&str]) -> String {
    for child in children {
        add_to_process(spec, process_name, child);
    }

    let name = process_name.to_string();
    spec.define(process_name, NodeKind::Process, move |namespace| {
        let node = NodeRef::new(Process::new(&name));
        membership::instantiate_namespace(
            namespace,
            &name,
            "Process",
            Box::new(ProcessHandler { node: node.clone() }),
        )?;
        Ok(node)
    });

    process_name.to_string()
}

/// Deploys a service into a process of its own.
///
/// The process name derives from the service name by replacing a
/// `_service` suffix with `_proc`, or appending `_proc`:
///
/// ```text
/// user_service => user_proc
/// user         => user_proc
/// ```
///
/// Returns the process name.
#[track_caller]
pub fn deploy(spec: &WiringSpec, service: &str) -> String {
    let prefix = service.strip_suffix("_service").unwrap_or(service);
    let process_name = format!("{prefix}_proc");
    create_process(spec, &process_name, &[service]);
    process_name
}

/// Defines a process containing only clients of the given children.
///
/// Useful as a starting point for a custom driver process: the children's
/// client sides are built inside the process, but their destination sides
/// are left wherever other wiring placed them.
#[track_caller]
pub fn create_client_process(spec: &WiringSpec, process_name: &str, children: &[&str]) -> String {
    let name = process_name.to_string();
    let children: Vec<String> = children.iter().map(|c| (*c).to_string()).collect();
    spec.define(process_name, NodeKind::Process, move |namespace| {
        let node = NodeRef::new(Process::new(&name));
        let process_ns = namespace.derive_namespace(
            &name,
            "Process",
            Box::new(ProcessHandler { node: node.clone() }),
        )?;
        for child in &children {
            process_ns.get(child)?;
        }
        Ok(node)
    });
    process_name.to_string()
}
