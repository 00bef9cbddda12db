//! Test bundles: client instances of selected services, collected so a test
//! harness can be emitted against a running system.
//!
//! The bundle derives its own namespace.  Each declared service-to-test is
//! fetched inside it, which builds the service's client chain in the bundle
//! and surfaces dial dependencies as bundle edges, i.e. the addresses a
//! test run must be pointed at.

use std::any::Any;

use indexmap::IndexMap;
use loom_ir::{render_namespace, IrNode, NamespaceIr, NodeKind, NodeRef};
use loom_wiring::{NamespaceHandler, WiringSpec};

/// The fixed definition name a wiring spec instantiates to build its test
/// bundle.
pub const BUNDLE_NAME: &str = "tests";

/// IR node for the test bundle.
#[derive(Debug, Default)]
pub struct TestBundle {
    name: String,
    /// Client instances keyed by the service under test.
    pub clients: IndexMap<String, NodeRef>,
    /// Instances built inside the bundle's namespace.
    pub children: Vec<NodeRef>,
    /// Cross-boundary dependencies threaded in from enclosing namespaces.
    pub edges: Vec<NodeRef>,
}

impl TestBundle {
    fn new(name: &str) -> Self {
        TestBundle {
            name: name.to_string(),
            clients: IndexMap::new(),
            children: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl IrNode for TestBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Instance
    }

    fn render(&self) -> String {
        render_namespace(&self.name, "TestBundle", &self.edges, &self.children)
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

impl NamespaceIr for TestBundle {
    fn edges(&self) -> Vec<NodeRef> {
        self.edges.clone()
    }

    fn children(&self) -> Vec<NodeRef> {
        self.children.clone()
    }
}

struct BundleHandler {
    node: NodeRef,
}

impl NamespaceHandler for BundleHandler {
    fn accepts(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Instance
    }

    fn add_node(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<TestBundle>() {
            Some(mut bundle) => {
                bundle.children.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("test bundle IR node has the wrong type")),
        }
    }

    fn add_edge(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<TestBundle>() {
            Some(mut bundle) => {
                bundle.edges.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("test bundle IR node has the wrong type")),
        }
    }
}

/// Declares that tests should be generated for `services`.
///
/// May be called several times; the service lists accumulate.  Returns
/// [`BUNDLE_NAME`], which must be included among the roots passed to
/// `build_ir` for the bundle to be built.
#[track_caller]
pub fn test_bundle(spec: &WiringSpec, services: &[&str]) -> String {
    for service in services {
        spec.add_property(BUNDLE_NAME, "services", (*service).to_string());
    }

    spec.define(BUNDLE_NAME, NodeKind::Instance, move |namespace| {
        let node = NodeRef::new(TestBundle::new(BUNDLE_NAME));
        let bundle_ns = namespace.derive_namespace(
            BUNDLE_NAME,
            "TestBundle",
            Box::new(BundleHandler { node: node.clone() }),
        )?;

        let services: Vec<String> = namespace.get_properties(BUNDLE_NAME, "services")?;
        namespace.info(format!(
            "building test clients for {} services ({})",
            services.len(),
            services.join(", ")
        ));
        for service in &services {
            let client = bundle_ns.get(service)?;
            if let Some(mut bundle) = node.downcast_mut::<TestBundle>() {
                bundle.clients.insert(service.clone(), client);
            }
        }
        Ok(node)
    });

    BUNDLE_NAME.to_string()
}
