//! Address nodes: typed endpoints that cross namespace boundaries.
//!
//! An address separates the client side of a pointer from its server side.
//! Clients obtain the address and its dial configuration without touching
//! the destination node, so a client namespace can never accidentally
//! instantiate the server locally.  The server side binds the address when
//! it is built, recording the destination node on the address.
//!
//! An address comes with two configuration nodes: a bind config used by the
//! namespace that hosts the destination, and a dial config used by every
//! namespace that holds a client.  Because configuration nodes are built at
//! the address's reachability level, fetching them from inside a nested
//! namespace threads them through every boundary on the path as argument
//! edges.  That is exactly how a generated process learns which addresses
//! it must be given at startup.

use std::any::Any;

use loom_ir::{IrNode, NodeKind, NodeRef};
use loom_wiring::{Namespace, WiringSpec};

/// IR metadata node for an address.
///
/// Holds the destination node once the server side has been instantiated,
/// plus the bind/dial configuration nodes once they have been requested.
#[derive(Debug, Default)]
pub struct Address {
    name: String,
    destination: Option<NodeRef>,
    bind: Option<NodeRef>,
    dial: Option<NodeRef>,
}

impl Address {
    /// Creates an unbound address node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Address {
            name: name.into(),
            destination: None,
            bind: None,
            dial: None,
        }
    }

    /// The destination node, if the server side has been instantiated.
    #[must_use]
    pub fn destination(&self) -> Option<NodeRef> {
        self.destination.clone()
    }

    /// Records the destination node.
    pub fn set_destination(&mut self, node: NodeRef) {
        self.destination = Some(node);
    }

    /// The bind-side configuration node, if requested.
    #[must_use]
    pub fn bind_config(&self) -> Option<NodeRef> {
        self.bind.clone()
    }

    /// The dial-side configuration node, if requested.
    #[must_use]
    pub fn dial_config(&self) -> Option<NodeRef> {
        self.dial.clone()
    }
}

impl IrNode for Address {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Address
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

/// Which side of an address a configuration node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFacet {
    /// The address the destination binds to.
    Bind,
    /// The address clients dial.
    Dial,
}

/// IR configuration node for one facet of an address.
///
/// Configuration values stay unresolved during IR construction; artifact
/// emitters map them to environment variables or command-line arguments of
/// the generated system.
#[derive(Debug)]
pub struct AddressConfig {
    key: String,
    address: String,
    facet: ConfigFacet,
    value: Option<String>,
}

impl AddressConfig {
    fn new(key: String, address: String, facet: ConfigFacet) -> Self {
        AddressConfig {
            key,
            address,
            facet,
            value: None,
        }
    }

    /// The address this configuration belongs to.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Which facet of the address this configuration carries.
    #[must_use]
    pub fn facet(&self) -> ConfigFacet {
        self.facet
    }

    /// True once a concrete value has been assigned.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// The assigned value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Assigns a concrete `host:port` value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }
}

impl IrNode for AddressConfig {
    fn name(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Config
    }

    fn render(&self) -> String {
        format!("{} = AddressConfig()", self.key)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Declaration-side record of an address, stored as the `"addr"` property.
#[derive(Debug, Clone)]
pub struct AddressDef {
    /// The address name.
    pub name: String,
    /// The name of the destination definition the address points to.
    pub points_to: String,
}

fn replace_suffix(name: &str, suffix: &str, replacement: &str) -> String {
    match name.strip_suffix(suffix) {
        Some(prefix) => format!("{prefix}{replacement}"),
        None => format!("{name}.{replacement}"),
    }
}

/// The name of the bind-side configuration node of `addr`.
#[must_use]
pub fn bind_name(addr: &str) -> String {
    replace_suffix(addr, "addr", "bind_addr")
}

/// The name of the dial-side configuration node of `addr`.
#[must_use]
pub fn dial_name(addr: &str) -> String {
    replace_suffix(addr, "addr", "dial_addr")
}

/// Defines an address called `addr` whose destination is the definition
/// `points_to`, along with its bind and dial configuration nodes.
///
/// `reachability` controls which containment level builds the address and
/// its configs, and therefore which namespaces can reach it.  An address
/// with [`NodeKind::Application`] reachability is visible application-wide.
#[track_caller]
pub fn define_address(spec: &WiringSpec, addr: &str, points_to: &str, reachability: NodeKind) {
    spec.set_property(
        addr,
        "addr",
        AddressDef {
            name: addr.to_string(),
            points_to: points_to.to_string(),
        },
    );

    let addr_name = addr.to_string();
    spec.define(addr, reachability, move |_| {
        Ok(NodeRef::new(Address::new(&addr_name)))
    });

    let bind_key = bind_name(addr);
    let key = bind_key.clone();
    let owner = addr.to_string();
    spec.define(&bind_key, reachability, move |_| {
        Ok(NodeRef::new(AddressConfig::new(
            key.clone(),
            owner.clone(),
            ConfigFacet::Bind,
        )))
    });

    let dial_key = dial_name(addr);
    let key = dial_key.clone();
    let owner = addr.to_string();
    spec.define(&dial_key, reachability, move |_| {
        Ok(NodeRef::new(AddressConfig::new(
            key.clone(),
            owner.clone(),
            ConfigFacet::Dial,
        )))
    });
}

/// Returns the [`AddressDef`] record for `name`, if [`define_address`] was
/// called for it.
#[must_use]
pub fn get_address(spec: &WiringSpec, name: &str) -> Option<AddressDef> {
    spec.get_property::<AddressDef>(name, "addr").ok().flatten()
}

/// Gets the address `name` resolves to, together with its dial
/// configuration, on behalf of a client.
///
/// Getting the dial config here is what threads it across every namespace
/// boundary between the client and the address's reachability level.
///
/// # Errors
///
/// Fails if `name` does not resolve to an address node.
pub fn dial(namespace: &Namespace, name: &str) -> anyhow::Result<(NodeRef, NodeRef)> {
    let addr = namespace.get(name)?;
    if !addr.is::<Address>() {
        return Err(namespace.err(format!(
            "expected {name} to resolve to an address, but it resolved to {}",
            addr.name()
        )));
    }
    let config = namespace.get(&dial_name(&addr.name()))?;
    if let Some(mut address) = addr.downcast_mut::<Address>() {
        address.dial = Some(config.clone());
    }
    Ok((addr, config))
}

/// Binds `destination` into the address `addr` on behalf of the namespace
/// hosting the destination, and returns the bind configuration node.
///
/// # Errors
///
/// Fails if `addr` does not resolve to an address node.
pub fn bind(namespace: &Namespace, addr: &str, destination: NodeRef) -> anyhow::Result<NodeRef> {
    let node = namespace.get(addr)?;
    if !node.is::<Address>() {
        return Err(namespace.err(format!(
            "expected {addr} to resolve to an address, but it resolved to {}",
            node.name()
        )));
    }
    let config = namespace.get(&bind_name(&node.name()))?;
    if let Some(mut address) = node.downcast_mut::<Address>() {
        address.bind = Some(config.clone());
        address.destination = Some(destination);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_rewriting() {
        assert_eq!(bind_name("leaf.addr"), "leaf.bind_addr");
        assert_eq!(dial_name("leaf.addr"), "leaf.dial_addr");
        assert_eq!(bind_name("oddname"), "oddname.bind_addr");
    }

    #[test]
    fn defined_addresses_carry_their_record() {
        let spec = WiringSpec::new("test");
        define_address(&spec, "leaf.addr", "leaf.server", NodeKind::Application);
        let def = get_address(&spec, "leaf.addr");
        assert_eq!(def.map(|d| d.points_to), Some("leaf.server".to_string()));
        assert!(get_address(&spec, "leaf.server").is_none());
    }

    #[test]
    fn address_nodes_are_metadata_but_configs_are_not() {
        let spec = WiringSpec::new("test");
        define_address(&spec, "leaf.addr", "leaf.server", NodeKind::Application);
        let app = spec.build_ir(&["leaf.addr", "leaf.bind_addr"]);
        let Ok(app) = app else {
            return assert!(false, "build failed");
        };
        let Some(app) = app.downcast_ref::<loom_ir::Application>().map(|a| a.children.clone()) else {
            return assert!(false, "root is not an application");
        };
        assert_eq!(app.len(), 2);
        assert!(app[0].is_metadata());
        assert!(!app[1].is_metadata());
        assert_eq!(app[0].render(), "leaf.addr");
        assert_eq!(app[1].render(), "leaf.bind_addr = AddressConfig()");
    }

    #[test]
    fn dial_records_the_config_on_the_address() {
        let spec = WiringSpec::new("test");
        define_address(&spec, "leaf.addr", "leaf.server", NodeKind::Application);
        spec.define("client", NodeKind::Instance, |ns| {
            let (addr, config) = dial(ns, "leaf.addr")?;
            let recorded = addr
                .downcast_ref::<Address>()
                .and_then(|a| a.dial_config())
                .is_some_and(|c| c.ptr_eq(&config));
            anyhow::ensure!(recorded, "dial config was not recorded");
            Ok(addr)
        });
        assert!(spec.build_ir(&["client"]).is_ok());
    }

    #[test]
    fn dial_rejects_non_addresses() {
        let spec = WiringSpec::new("test");
        spec.define("plain", NodeKind::Instance, |_| {
            Ok(NodeRef::new(loom_ir::ValueNode::new("plain")))
        });
        spec.define("client", NodeKind::Instance, |ns| {
            dial(ns, "plain").map(|(addr, _)| addr)
        });
        let err = spec.build_ir(&["client"]).err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("expected plain to resolve to an address")));
    }
}
