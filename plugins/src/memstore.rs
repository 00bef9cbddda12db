//! In-memory backend instances: caches and queues that live inside a
//! process.
//!
//! These are convenient for tests and all-in-one deployments where a real
//! backend container would be overkill.  Because an in-memory backend has no
//! network presence, it is constrained to be unique application-wide: two
//! processes silently holding separate copies of "the" cache is almost never
//! what the operator meant.  The uniqueness constraint turns that mistake
//! into a reachability error at build time.

use std::any::Any;

use loom_ir::{IrNode, NodeKind, NodeRef};
use loom_pointer::{create_pointer, require_uniqueness};
use loom_wiring::WiringSpec;

/// IR node for an in-memory backend instance.
#[derive(Debug)]
pub struct MemBackend {
    name: String,
    backend_type: String,
}

impl MemBackend {
    /// The backend type label, e.g. `SimpleCache`.
    pub fn backend_type(&self) -> &str {
        &self.backend_type
    }
}

impl IrNode for MemBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Instance
    }

    fn render(&self) -> String {
        format!("{} = {}()", self.name, self.backend_type)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Declares an in-memory cache instance called `name`.
#[track_caller]
pub fn cache(spec: &WiringSpec, name: &str) -> String {
    define(spec, name, "SimpleCache")
}

/// Declares an in-memory queue instance called `name`.
#[track_caller]
pub fn queue(spec: &WiringSpec, name: &str) -> String {
    define(spec, name, "SimpleQueue")
}

#[track_caller]
fn define(spec: &WiringSpec, name: &str, backend_type: &str) -> String {
    let backend_name = format!("{name}.backend");
    let node_name = name.to_string();
    let type_label = backend_type.to_string();
    spec.define(&backend_name, NodeKind::Instance, move |_| {
        Ok(NodeRef::new(MemBackend {
            name: node_name.clone(),
            backend_type: type_label.clone(),
        }))
    });

    // Unique application-wide unless a namespace loosens it.
    let dst_name = format!("{name}.dst");
    spec.alias(&dst_name, &backend_name);
    require_uniqueness(spec, &dst_name, NodeKind::Application);

    create_pointer(spec, name, &dst_name, NodeKind::Instance);
    name.to_string()
}
