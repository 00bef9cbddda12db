//! Core node types: the [`IrNode`] trait, the [`NodeKind`] acceptance tag,
//! and the [`NodeRef`] shared handle.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::render::render_namespace;

/// The acceptance tag carried by every wiring definition and reported by
/// every built node.
///
/// Namespaces decide whether to build a definition locally or delegate to
/// their parent by inspecting this tag.  It stands in for the dynamic type
/// inspection a reflective language would use: the definer chooses the tag,
/// and each namespace kind accepts a fixed subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An application-level instance implemented in the target language:
    /// a service, a client wrapper, or an in-memory backend.
    Instance,
    /// A process grouping instances.
    Process,
    /// A container grouping processes.
    Container,
    /// An address endpoint crossing namespace boundaries.
    Address,
    /// A configuration value, e.g. a bind or dial address key.
    Config,
    /// Pure build-time metadata with no runtime presence.
    Metadata,
    /// The whole application.  Also used as the widest containment
    /// granularity for reachability and uniqueness constraints.
    Application,
}

impl NodeKind {
    /// Returns the tag's display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Instance => "Instance",
            NodeKind::Process => "Process",
            NodeKind::Container => "Container",
            NodeKind::Address => "Address",
            NodeKind::Config => "Config",
            NodeKind::Metadata => "Metadata",
            NodeKind::Application => "Application",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node in the IR tree.
///
/// All nodes carry a stable name and a deterministic rendered form.  An
/// individual node may additionally contain other nodes ([`Self::as_namespace`])
/// or exist purely as build-time metadata ([`Self::is_metadata`]).
pub trait IrNode: Any {
    /// The built name of this node, unique within its enclosing namespace.
    fn name(&self) -> &str;

    /// The acceptance tag this node reports when injected into a namespace.
    fn kind(&self) -> NodeKind;

    /// Deterministic one-way rendering, used for debugging and tests.
    fn render(&self) -> String;

    /// True for nodes that exist only during the build and have no runtime
    /// presence.  Metadata nodes never become cross-namespace edges.
    fn is_metadata(&self) -> bool {
        matches!(self.kind(), NodeKind::Metadata | NodeKind::Address)
    }

    /// Namespace capability: nodes that contain other nodes.
    fn as_namespace(&self) -> Option<&dyn NamespaceIr> {
        None
    }

    /// Artifact capability: nodes that emit files on their own, without an
    /// enclosing build context.
    fn as_artifact(&self) -> Option<&dyn ArtifactIr> {
        None
    }

    /// Upcast for concrete downcasting through [`NodeRef`].
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for concrete downcasting through [`NodeRef`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Capability of IR nodes that contain other IR nodes, such as processes and
/// containers.
///
/// Artifact emitters use this interface to walk the tree without knowing the
/// concrete namespace types.
pub trait NamespaceIr {
    /// Cross-boundary dependencies this namespace receives from its parent.
    fn edges(&self) -> Vec<NodeRef>;
    /// Nodes built inside this namespace.
    fn children(&self) -> Vec<NodeRef>;
}

/// Capability of IR nodes that generate their artifacts independently of any
/// external context, typically the top-level namespace nodes.
///
/// Artifact emitters drive code and image generation through this seam; the
/// compiler core never calls it.
pub trait ArtifactIr {
    /// Generates all artifacts for this node into `dir`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while writing artifacts.
    fn generate_artifacts(&self, dir: &std::path::Path) -> std::io::Result<()>;
}

/// A cheap-clone shared handle to an IR node.
///
/// Nodes are shared: the same node can be cached under several names, held as
/// a child of a namespace node, and referenced as another node's argument.
/// `NodeRef` wraps `Rc<RefCell<dyn IrNode>>` and exposes borrow-scoped access.
///
/// Callers must not hold a borrow across a call back into the build engine;
/// the convenience accessors here all return owned values for that reason.
#[derive(Clone)]
pub struct NodeRef {
    inner: Rc<RefCell<dyn IrNode>>,
}

impl NodeRef {
    /// Wraps a concrete node.
    pub fn new<T: IrNode>(node: T) -> Self {
        NodeRef {
            inner: Rc::new(RefCell::new(node)),
        }
    }

    /// The node's built name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name().to_string()
    }

    /// The node's acceptance tag.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.inner.borrow().kind()
    }

    /// The node's rendered form.
    #[must_use]
    pub fn render(&self) -> String {
        self.inner.borrow().render()
    }

    /// True if the node is build-time metadata.
    #[must_use]
    pub fn is_metadata(&self) -> bool {
        self.inner.borrow().is_metadata()
    }

    /// True if the node's concrete type is `T`.
    #[must_use]
    pub fn is<T: IrNode>(&self) -> bool {
        self.inner.borrow().as_any().is::<T>()
    }

    /// Borrows the node as the trait object.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, dyn IrNode> {
        self.inner.borrow()
    }

    /// Mutably borrows the node as the trait object.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, dyn IrNode> {
        self.inner.borrow_mut()
    }

    /// Borrows the node downcast to its concrete type, if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: IrNode>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.inner.borrow(), |node| node.as_any().downcast_ref::<T>()).ok()
    }

    /// Mutably borrows the node downcast to its concrete type, if it is a `T`.
    #[must_use]
    pub fn downcast_mut<T: IrNode>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.inner.borrow_mut(), |node| {
            node.as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// True if both handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.inner.borrow();
        write!(f, "NodeRef({} {})", node.kind(), node.name())
    }
}

/// The root IR node representing the whole application.
///
/// Building a wiring spec returns an `Application`.  Its children are every
/// node that was built in, or delegated up to, the root namespace.
#[derive(Debug, Default)]
pub struct Application {
    name: String,
    /// Top-level nodes of the application, in build order.
    pub children: Vec<NodeRef>,
}

impl Application {
    /// Creates an empty application node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Application {
            name: name.into(),
            children: Vec::new(),
        }
    }
}

impl IrNode for Application {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Application
    }

    fn render(&self) -> String {
        render_namespace(&self.name, "Application", &[], &self.children)
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

impl NamespaceIr for Application {
    fn edges(&self) -> Vec<NodeRef> {
        Vec::new()
    }

    fn children(&self) -> Vec<NodeRef> {
        self.children.clone()
    }
}

/// A hard-coded configuration value captured directly from the wiring spec,
/// e.g. a literal timeout passed as a service argument.
#[derive(Debug, Clone)]
pub struct ValueNode {
    /// The literal value.  Values are always strings.
    pub value: String,
}

impl ValueNode {
    /// Wraps a literal value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        ValueNode {
            value: value.into(),
        }
    }
}

impl IrNode for ValueNode {
    fn name(&self) -> &str {
        &self.value
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Config
    }

    fn render(&self) -> String {
        format!("\"{}\"", self.value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noderef_identity() {
        let a = NodeRef::new(ValueNode::new("x"));
        let b = a.clone();
        let c = NodeRef::new(ValueNode::new("x"));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn downcast_roundtrip() {
        let node = NodeRef::new(ValueNode::new("500"));
        assert!(node.is::<ValueNode>());
        assert!(!node.is::<Application>());
        let v = node.downcast_ref::<ValueNode>();
        assert_eq!(v.map(|v| v.value.clone()), Some("500".to_string()));
    }

    #[test]
    fn downcast_mut_mutates_shared_node() {
        let node = NodeRef::new(ValueNode::new("a"));
        let alias = node.clone();
        if let Some(mut v) = alias.downcast_mut::<ValueNode>() {
            v.value = "b".to_string();
        }
        assert_eq!(node.render(), "\"b\"");
    }

    #[test]
    fn application_is_namespace_ir() {
        let mut app = Application::new("app");
        app.children.push(NodeRef::new(ValueNode::new("x")));
        let node = NodeRef::new(app);
        let borrowed = node.borrow();
        let ns = borrowed.as_namespace();
        assert_eq!(ns.map(|ns| ns.children().len()), Some(1));
    }

    #[test]
    fn metadata_defaults_follow_kind() {
        assert!(!NodeRef::new(ValueNode::new("x")).is_metadata());
        assert!(!NodeRef::new(Application::new("app")).is_metadata());
    }
}
