//! Placing children inside namespace nodes.
//!
//! Namespace plugins record their children as a `"children"` property on the
//! namespace definition and instantiate them, deferred, once the namespace
//! node is built.  A child that is a pointer needs one extra step: a proxy
//! modifier on the pointer's destination chain that enters the namespace
//! before instantiating the next destination node, so that lazy destination
//! instantiation lands in this namespace no matter where it is triggered
//! from.

use loom_ir::NodeKind;
use loom_pointer::get_pointer;
use loom_wiring::{Namespace, NamespaceHandler, WiringOpts, WiringSpec};

/// Adds `child` to the namespace definition `namespace_name`.
///
/// `namespace_kind` is the node kind of the namespace definition itself
/// (e.g. `Process`); the proxy modifier is declared at that kind so it is
/// built wherever the namespace node belongs.
#[track_caller]
pub fn add_child_to(
    spec: &WiringSpec,
    namespace_name: &str,
    namespace_kind: NodeKind,
    child: &str,
) {
    let Some(ptr) = get_pointer(spec, child) else {
        // Not a pointer; the namespace instantiates it directly.
        spec.add_property(namespace_name, "children", child.to_string());
        return;
    };

    let modifier = format!("{child}.{namespace_name}");
    let next = ptr.add_dst_modifier_keep_interface(&modifier);

    let ns_name = namespace_name.to_string();
    let target = next.clone();
    spec.define_with(
        &modifier,
        namespace_kind,
        move |parent| {
            let ns_node = parent.get(&ns_name)?;
            let child_ns = parent.get_namespace(&ns_node.name())?;
            child_ns.instantiate(&target)
        },
        WiringOpts { proxy: true },
    );

    spec.add_property(namespace_name, "children", next);
}

/// Derives a child namespace for the namespace node being built and defers
/// instantiation of its recorded children.
///
/// # Errors
///
/// Fails if the child namespace already exists.
pub fn instantiate_namespace(
    parent: &Namespace,
    name: &str,
    label: &str,
    handler: Box<dyn NamespaceHandler>,
) -> anyhow::Result<Namespace> {
    let namespace = parent.derive_namespace(name, label, handler)?;
    let deferred = namespace.clone();
    namespace.defer_front(move || instantiate_children(&deferred));
    Ok(namespace)
}

fn instantiate_children(namespace: &Namespace) -> anyhow::Result<()> {
    let name = namespace.name();
    let children: Vec<String> = namespace.get_properties(&name, "children")?;
    namespace.info(format!(
        "instantiating children [{}]",
        children.join(", ")
    ));
    for child in &children {
        namespace.get(child)?;
    }
    Ok(())
}
