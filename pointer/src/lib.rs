//! The pointer protocol: growing one logical name into a chain of
//! client-side and server-side wrappers.
//!
//! When a plugin defines a node that other plugins may want to wrap, most
//! commonly a service, it also creates a **pointer** to that node.  Other
//! plugins then attach modifiers to either side of the pointer: tracing
//! wrappers, RPC clients, client pools on the source side; RPC servers and
//! namespace-membership hops on the destination side.  Modifier order is
//! call order, and it is exactly the order a request traverses the wrappers
//! at runtime.
//!
//! Internally a pointer is a path of aliases:
//!
//! ```text
//! name.src → srcMod₁ → … → srcModₖ → dstMod₁ → … → dstModₘ → destination
//! ```
//!
//! The source side is built eagerly when the pointer itself is built.  The
//! destination side is instantiated lazily through the deferred queue,
//! because the destination usually belongs in a different namespace than the
//! clients that reach it.  An [`address`](crate::address) node between the
//! two sides keeps client namespaces from accidentally instantiating the
//! server locally.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod address;
pub mod visibility;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use loom_ir::NodeKind;
use loom_wiring::{Namespace, WiringSpec};

use crate::address::Address;

pub use visibility::require_uniqueness;

struct PointerState {
    name: String,
    src_head: String,
    src_modifiers: Vec<String>,
    src_tail: String,
    /// What the source tail currently aims at: the destination-side head,
    /// or the address once one has been installed.
    interface_node: String,
    dst_modifiers: Vec<String>,
    dst: String,
}

/// A chain-of-modifiers record for one logical name.
///
/// Cheap to clone; clones share the record, so a pointer looked up with
/// [`get_pointer`] observes modifiers added through any other handle.
/// Stored as the `"ptr"` property of the pointer's name.
#[derive(Clone)]
pub struct PointerDef {
    state: Rc<RefCell<PointerState>>,
}

/// Creates a pointer called `name` whose destination is `dst`.
///
/// `kind` is the node kind of the pointer's client side; it decides which
/// namespaces may build the pointer.  The pointer's build function gets the
/// source-side chain eagerly, defers destination-side instantiation, and
/// returns the source head node.
#[track_caller]
pub fn create_pointer(spec: &WiringSpec, name: &str, dst: &str, kind: NodeKind) -> PointerDef {
    let src_head = format!("{name}.src");
    let ptr = PointerDef {
        state: Rc::new(RefCell::new(PointerState {
            name: name.to_string(),
            src_head: src_head.clone(),
            src_modifiers: Vec::new(),
            src_tail: src_head.clone(),
            interface_node: dst.to_string(),
            dst_modifiers: vec![dst.to_string()],
            dst: dst.to_string(),
        })),
    };

    spec.alias(&src_head, dst);

    let build_ptr = ptr.clone();
    spec.define(name, kind, move |namespace| {
        let node = namespace.get(&build_ptr.src_head())?;
        let deferred_ptr = build_ptr.clone();
        let deferred_ns = namespace.clone();
        namespace.defer(move || deferred_ptr.instantiate_dst(&deferred_ns));
        Ok(node)
    });

    spec.set_property(name, "ptr", ptr.clone());
    ptr
}

/// Returns the pointer record for `name`, if [`create_pointer`] was called
/// for it.
#[must_use]
pub fn get_pointer(spec: &WiringSpec, name: &str) -> Option<PointerDef> {
    spec.get_property::<PointerDef>(name, "ptr")
        .ok()
        .flatten()
}

impl PointerDef {
    /// The pointer's logical name.
    #[must_use]
    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    /// The source-side head alias, `name.src`.
    #[must_use]
    pub fn src_head(&self) -> String {
        self.state.borrow().src_head.clone()
    }

    /// The current head of the destination-side chain.
    #[must_use]
    pub fn dst_head(&self) -> String {
        self.state.borrow().dst_modifiers[0].clone()
    }

    /// The source-side modifier names, in the order they were added.
    #[must_use]
    pub fn src_modifiers(&self) -> Vec<String> {
        self.state.borrow().src_modifiers.clone()
    }

    /// The destination-side chain, head first, ending at the destination.
    #[must_use]
    pub fn dst_modifiers(&self) -> Vec<String> {
        self.state.borrow().dst_modifiers.clone()
    }

    /// Appends `modifier` to the source-side chain.
    ///
    /// Returns the name of the next node downstream of the modifier; the
    /// modifier's build function gets that name to obtain the node it wraps.
    pub fn add_src_modifier(&self, spec: &WiringSpec, modifier: &str) -> String {
        let mut state = self.state.borrow_mut();
        spec.alias(&state.src_tail, modifier);
        state.src_tail = format!("{modifier}.ptr.src.next");
        spec.alias(&state.src_tail, &state.interface_node);
        state.src_modifiers.push(modifier.to_string());
        state.src_tail.clone()
    }

    /// Prepends `modifier` to the destination-side chain and re-aims the
    /// source tail at it.
    ///
    /// Returns the previous chain head, which is the node the modifier wraps.
    pub fn add_dst_modifier(&self, spec: &WiringSpec, modifier: &str) -> String {
        let mut state = self.state.borrow_mut();
        let next = state.dst_modifiers[0].clone();
        state.dst_modifiers.insert(0, modifier.to_string());
        state.interface_node = modifier.to_string();
        spec.alias(&state.src_tail, modifier);
        next
    }

    /// Prepends `modifier` to the destination-side chain without re-aiming
    /// the source tail.  Namespace-membership modifiers use this: they route
    /// destination instantiation into the right namespace but must not change
    /// which node the client side receives.
    pub fn add_dst_modifier_keep_interface(&self, modifier: &str) -> String {
        let mut state = self.state.borrow_mut();
        let next = state.dst_modifiers[0].clone();
        state.dst_modifiers.insert(0, modifier.to_string());
        next
    }

    /// Installs the address `addr` as the interface between the pointer's
    /// two sides.  The address's destination becomes the head of the
    /// destination chain, and the source tail dials the address.
    ///
    /// Returns the node name the address destination wraps, or `None` if
    /// `addr` was not defined with [`address::define_address`] (recorded as
    /// a declaration error on the spec).
    #[track_caller]
    pub fn add_addr_modifier(&self, spec: &WiringSpec, addr: &str) -> Option<String> {
        let Some(def) = address::get_address(spec, addr) else {
            spec.add_error(anyhow::anyhow!(
                "cannot add {addr} to pointer {} because it is not an address",
                self.name()
            ));
            return None;
        };
        let next = self.add_dst_modifier(spec, &def.points_to);
        let mut state = self.state.borrow_mut();
        state.interface_node = addr.to_string();
        spec.alias(&state.src_tail, addr);
        Some(next)
    }

    /// Instantiates the destination side of the pointer from `namespace`.
    ///
    /// If the interface between the two sides is an address whose destination
    /// has not been built yet, instantiating the destination-chain head
    /// cascades through any membership modifiers into the right namespace and
    /// binds the destination into the address.  Idempotent once the address
    /// is bound.
    ///
    /// # Errors
    ///
    /// Fails if any node on the chain fails to build, or if the destination
    /// chain completes without binding the address.
    pub fn instantiate_dst(&self, namespace: &Namespace) -> anyhow::Result<()> {
        namespace.info(format!(
            "instantiating the destination side of pointer {} from namespace {}",
            self.name(),
            namespace.name()
        ));

        let interface = self.state.borrow().interface_node.clone();
        let node = namespace.get(&interface)?;
        if !node.is::<Address>() {
            // No address on the chain; the source side already built the
            // destination in this namespace.
            return Ok(());
        }
        let bound = node
            .downcast_ref::<Address>()
            .is_some_and(|addr| addr.destination().is_some());
        if bound {
            return Ok(());
        }

        let head = self.dst_head();
        namespace.instantiate(&head)?;

        let bound = node
            .downcast_ref::<Address>()
            .is_some_and(|addr| addr.destination().is_some());
        if !bound {
            return Err(namespace.err(format!(
                "attempted to instantiate the destination side of address {} starting with {head}, but the destination failed to instantiate",
                node.name()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PointerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        write!(
            f,
            "[{}] -> [{}]",
            state.src_modifiers.join(" -> "),
            state.dst_modifiers.join(" -> ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_ir::{NodeRef, ValueNode};

    fn leaf_def(spec: &WiringSpec, name: &str) {
        let owned = name.to_string();
        spec.define(name, NodeKind::Instance, move |_| {
            Ok(NodeRef::new(ValueNode::new(&owned)))
        });
    }

    #[test]
    fn pointer_is_stored_as_a_property() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "leaf.handler");
        let ptr = create_pointer(&spec, "leaf", "leaf.handler", NodeKind::Instance);
        assert_eq!(ptr.name(), "leaf");
        let looked_up = get_pointer(&spec, "leaf");
        assert!(looked_up.is_some());
        assert!(get_pointer(&spec, "leaf.handler").is_none());
    }

    #[test]
    fn src_modifiers_chain_in_call_order() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "dst");
        let ptr = create_pointer(&spec, "p", "dst", NodeKind::Instance);

        let next1 = ptr.add_src_modifier(&spec, "m1");
        assert_eq!(next1, "m1.ptr.src.next");
        let next2 = ptr.add_src_modifier(&spec, "m2");
        assert_eq!(next2, "m2.ptr.src.next");

        // p.src → m1 → m1.ptr.src.next → m2 → m2.ptr.src.next → dst
        assert_eq!(spec.get_alias("p.src"), Some("m1".to_string()));
        assert_eq!(spec.get_alias("m1.ptr.src.next"), Some("m2".to_string()));
        assert_eq!(spec.get_alias("m2.ptr.src.next"), Some("dst".to_string()));
        assert_eq!(ptr.src_modifiers(), vec!["m1".to_string(), "m2".to_string()]);
    }

    #[test]
    fn dst_modifiers_prepend_and_retarget_the_tail() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "dst");
        let ptr = create_pointer(&spec, "p", "dst", NodeKind::Instance);

        let next = ptr.add_dst_modifier(&spec, "server");
        assert_eq!(next, "dst");
        assert_eq!(ptr.dst_head(), "server");
        assert_eq!(spec.get_alias("p.src"), Some("server".to_string()));
        assert_eq!(
            ptr.dst_modifiers(),
            vec!["server".to_string(), "dst".to_string()]
        );
    }

    #[test]
    fn keep_interface_leaves_the_tail_alone() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "dst");
        let ptr = create_pointer(&spec, "p", "dst", NodeKind::Instance);
        let next = ptr.add_dst_modifier_keep_interface("hop");
        assert_eq!(next, "dst");
        assert_eq!(ptr.dst_head(), "hop");
        assert_eq!(spec.get_alias("p.src"), Some("dst".to_string()));
    }

    #[test]
    fn full_chain_resolves_src_through_dst_to_destination() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "dst");
        let ptr = create_pointer(&spec, "p", "dst", NodeKind::Instance);
        ptr.add_src_modifier(&spec, "s1");
        ptr.add_src_modifier(&spec, "s2");
        ptr.add_dst_modifier(&spec, "d1");

        // Walk the chain the way modifier builds do: each modifier's
        // downstream neighbor is its ".ptr.src.next" alias.
        let mut walk = vec![];
        let mut current = "p.src".to_string();
        while let Some(next) = spec.get_alias(&current) {
            walk.push(next.clone());
            current = format!("{next}.ptr.src.next");
        }
        assert_eq!(walk, vec!["s1".to_string(), "s2".to_string(), "d1".to_string()]);
    }

    #[test]
    fn building_the_pointer_returns_the_src_head_node() {
        let spec = WiringSpec::new("test");
        leaf_def(&spec, "dst");
        create_pointer(&spec, "p", "dst", NodeKind::Instance);
        let app = spec.build_ir(&["p"]);
        assert!(app.is_ok());
    }
}
