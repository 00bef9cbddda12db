//! RPC deployment: expose a service behind an address.
//!
//! Deploying a service over RPC splits its pointer at an address.  Clients
//! get an RPC client node that dials the address; the namespace hosting the
//! service gets an RPC server node that wraps the service and binds the
//! address.  RPC should be the last instance-level modifier applied to a
//! service: after it, calls cross the network rather than staying in
//! process.

use std::any::Any;

use loom_ir::{IrNode, NodeKind, NodeRef};
use loom_pointer::address;
use loom_pointer::get_pointer;
use loom_wiring::WiringSpec;

/// IR node for the client side of an RPC-deployed service.
#[derive(Debug)]
pub struct RpcClient {
    name: String,
    dial: NodeRef,
}

impl RpcClient {
    /// The dial configuration this client uses to reach the server.
    pub fn dial_config(&self) -> NodeRef {
        self.dial.clone()
    }
}

impl IrNode for RpcClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Instance
    }

    fn render(&self) -> String {
        format!("{} = RpcClient({})", self.name, self.dial.name())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// IR node for the server side of an RPC-deployed service.
#[derive(Debug)]
pub struct RpcServer {
    name: String,
    wrapped: NodeRef,
    bind: Option<NodeRef>,
}

impl RpcServer {
    /// The service instance this server exposes.
    pub fn wrapped(&self) -> NodeRef {
        self.wrapped.clone()
    }

    /// The bind configuration the server listens on, once bound.
    pub fn bind_config(&self) -> Option<NodeRef> {
        self.bind.clone()
    }
}

impl IrNode for RpcServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Instance
    }

    fn render(&self) -> String {
        match &self.bind {
            Some(bind) => format!(
                "{} = RpcServer({}, {})",
                self.name,
                self.wrapped.name(),
                bind.name()
            ),
            None => format!("{} = RpcServer({})", self.name, self.wrapped.name()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Deploys `service` over RPC.
///
/// Defines the address `service.addr` with its bind/dial configuration
/// nodes, wraps the client side with `service.rpc_client`, and installs
/// `service.rpc_server` behind the address on the destination side.  The
/// service must have been declared as a pointer; anything else is recorded
/// as a declaration error.
#[track_caller]
pub fn deploy(spec: &WiringSpec, service: &str) {
    let client_name = format!("{service}.rpc_client");
    let server_name = format!("{service}.rpc_server");
    let addr_name = format!("{service}.addr");

    let Some(ptr) = get_pointer(spec, service) else {
        spec.add_error(anyhow::anyhow!(
            "cannot deploy {service} over RPC because it is not a pointer"
        ));
        return;
    };

    address::define_address(spec, &addr_name, &server_name, NodeKind::Application);

    // Client side: dial the address.
    let client_next = ptr.add_src_modifier(spec, &client_name);
    let client = client_name.clone();
    spec.define(&client_name, NodeKind::Instance, move |namespace| {
        let (_, dial_config) = address::dial(namespace, &client_next)?;
        Ok(NodeRef::new(RpcClient {
            name: client.clone(),
            dial: dial_config,
        }))
    });

    // Server side: wrap the service and bind the address.
    let Some(server_next) = ptr.add_addr_modifier(spec, &addr_name) else {
        return;
    };
    let server = server_name.clone();
    let bound_addr = addr_name.clone();
    spec.define(&server_name, NodeKind::Instance, move |namespace| {
        let wrapped = namespace.get(&server_next)?;
        if wrapped.is_metadata() {
            return Err(namespace.err(format!(
                "rpc server {server} expected {server_next} to be a service instance, but it resolved to {}",
                wrapped.name()
            )));
        }
        let node = NodeRef::new(RpcServer {
            name: server.clone(),
            wrapped,
            bind: None,
        });
        let config = address::bind(namespace, &bound_addr, node.clone())?;
        if let Some(mut built) = node.downcast_mut::<RpcServer>() {
            built.bind = Some(config);
        }
        Ok(node)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::define_service;

    #[test]
    fn deploy_requires_a_pointer() {
        let spec = WiringSpec::new("test");
        spec.define("plain", NodeKind::Instance, |_| {
            Ok(NodeRef::new(loom_ir::ValueNode::new("plain")))
        });
        deploy(&spec, "plain");
        let err = spec.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("because it is not a pointer"));
    }

    #[test]
    fn deployed_service_splits_into_client_and_server() {
        let spec = WiringSpec::new("test");
        define_service(&spec, "leaf", "Leaf", &[]);
        deploy(&spec, "leaf");
        let ptr = get_pointer(&spec, "leaf");
        let Some(ptr) = ptr else {
            return assert!(false, "leaf is not a pointer");
        };
        assert_eq!(ptr.src_modifiers(), vec!["leaf.rpc_client".to_string()]);
        assert_eq!(ptr.dst_head(), "leaf.rpc_server");
        // The source tail dials the address, not the server.
        assert_eq!(
            spec.get_alias("leaf.rpc_client.ptr.src.next"),
            Some("leaf.addr".to_string())
        );
    }
}
