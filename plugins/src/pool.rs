//! Client pools: a bounded-concurrency envelope around a service client.
//!
//! A pool is a source-side modifier.  It derives its own namespace so that
//! the downstream client (and any inner wrappers) are built inside the
//! pool, then limits the number of those clients that can be in use at once.

use std::any::Any;

use loom_ir::{indent, IrNode, NamespaceIr, NodeKind, NodeRef};
use loom_pointer::get_pointer;
use loom_wiring::{NamespaceHandler, WiringSpec};

/// IR node for a pool of `n` clients.
#[derive(Debug)]
pub struct ClientPool {
    name: String,
    n: usize,
    client: Option<NodeRef>,
    /// Instances built inside the pool's namespace.
    pub children: Vec<NodeRef>,
    /// Cross-boundary dependencies threaded in from enclosing namespaces.
    pub edges: Vec<NodeRef>,
}

impl ClientPool {
    fn new(name: &str, n: usize) -> Self {
        ClientPool {
            name: name.to_string(),
            n,
            client: None,
            children: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// The pool size.
    pub fn size(&self) -> usize {
        self.n
    }

    /// The wrapped client, once built.
    pub fn client(&self) -> Option<NodeRef> {
        self.client.clone()
    }
}

impl IrNode for ClientPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Instance
    }

    fn render(&self) -> String {
        let client = self.client.as_ref().map(NodeRef::name).unwrap_or_default();
        let header = format!("{} = ClientPool({client}, {})", self.name, self.n);
        if self.children.is_empty() {
            return format!("{header} {{}}");
        }
        let mut rendered: Vec<String> = self.children.iter().map(NodeRef::render).collect();
        rendered.sort();
        format!("{header} {{\n{}\n}}", indent(&rendered.join("\n"), 2))
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

impl NamespaceIr for ClientPool {
    fn edges(&self) -> Vec<NodeRef> {
        self.edges.clone()
    }

    fn children(&self) -> Vec<NodeRef> {
        self.children.clone()
    }
}

struct PoolHandler {
    node: NodeRef,
}

impl NamespaceHandler for PoolHandler {
    fn accepts(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Instance
    }

    fn add_node(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<ClientPool>() {
            Some(mut pool) => {
                pool.children.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("pool IR node has the wrong type")),
        }
    }

    fn add_edge(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.node.downcast_mut::<ClientPool>() {
            Some(mut pool) => {
                pool.edges.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("pool IR node has the wrong type")),
        }
    }
}

/// Wraps the client side of `service` with a pool of `n` clients.
///
/// Callers of the service share the pool; at most `n` calls can be
/// outstanding at a time.  Apply the pool *before* deploying the service
/// over RPC so the pool wraps the RPC client; applied afterwards, the pool
/// has nothing to wrap and the build fails at the pool's wiring line.
#[track_caller]
pub fn create_pool(spec: &WiringSpec, service: &str, n: usize) -> String {
    let pool_name = format!("{service}.pool");

    let Some(ptr) = get_pointer(spec, service) else {
        spec.add_error(anyhow::anyhow!(
            "cannot create a client pool for {service} because it is not a pointer"
        ));
        return pool_name;
    };

    let client_next = ptr.add_src_modifier(spec, &pool_name);
    let name = pool_name.clone();
    spec.define(&pool_name, NodeKind::Instance, move |namespace| {
        let node = NodeRef::new(ClientPool::new(&name, n));
        let pool_ns = namespace.derive_namespace(
            &name,
            "ClientPool",
            Box::new(PoolHandler { node: node.clone() }),
        )?;
        let client = pool_ns.get(&client_next)?;
        if client.is_metadata() {
            return Err(namespace.err(format!(
                "client pool {name} expected {client_next} to be a client instance, but it resolved to {}",
                client.name()
            )));
        }
        if let Some(mut pool) = node.downcast_mut::<ClientPool>() {
            pool.client = Some(client.clone());
        }
        Ok(node)
    });

    pool_name
}
