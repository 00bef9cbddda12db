//! The namespace engine: hierarchical, on-demand IR construction.
//!
//! A [`Namespace`] mediates between the pure wiring spec and one level of
//! containment: the whole application, a process inside it, a container
//! around that, a client pool, and so on.  Build closures receive the
//! namespace they are being built into and fetch their dependencies through
//! it; the engine caches built nodes, delegates non-accepted kinds to the
//! parent namespace, records cross-boundary edges, and owns the deferred
//! work queue that the build loop drains.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use loom_ir::{NodeKind, NodeRef};

use crate::error::WiringError;
use crate::spec::{WiringDef, WiringSpec};

/// Behavior that differs between namespace kinds.
///
/// The engine calls `accepts` to decide whether a definition is built locally
/// or delegated to the parent, `add_node` when a local build completes, and
/// `add_edge` when a dependency was satisfied by an enclosing namespace and
/// must be threaded in as an argument.
pub trait NamespaceHandler {
    /// True if this namespace builds nodes of the given kind locally.
    fn accepts(&self, kind: NodeKind) -> bool;

    /// Called once per built name when a node is built in this namespace.
    ///
    /// # Errors
    ///
    /// Handlers may reject a node; the error aborts the current build.
    fn add_node(&self, name: &str, node: &NodeRef) -> anyhow::Result<()>;

    /// Called once per built name when a node crosses into this namespace
    /// from an enclosing one.
    ///
    /// # Errors
    ///
    /// Handlers may reject an edge; the error aborts the current build.
    fn add_edge(&self, name: &str, node: &NodeRef) -> anyhow::Result<()>;
}

/// A deferred unit of work, executed by the build loop after the
/// currently-queued work completes.
pub type DeferredFn = Box<dyn FnOnce() -> anyhow::Result<()>>;

struct NamespaceCore {
    name: String,
    label: String,
    parent: Option<Namespace>,
    spec: WiringSpec,
    handler: Box<dyn NamespaceHandler>,
    built: RefCell<IndexMap<String, NodeRef>>,
    announced: RefCell<IndexSet<String>>,
    deferred: RefCell<VecDeque<DeferredFn>>,
    stack: RefCell<Vec<Rc<WiringDef>>>,
    children: RefCell<IndexMap<String, Namespace>>,
}

/// A build-time dependency-injection scope.  Cheap to clone; clones share
/// the underlying namespace.
#[derive(Clone)]
pub struct Namespace {
    inner: Rc<NamespaceCore>,
}

impl Namespace {
    pub(crate) fn root(
        spec: WiringSpec,
        name: &str,
        label: &str,
        handler: Box<dyn NamespaceHandler>,
    ) -> Namespace {
        Namespace {
            inner: Rc::new(NamespaceCore {
                name: name.to_string(),
                label: label.to_string(),
                parent: None,
                spec,
                handler,
                built: RefCell::new(IndexMap::new()),
                announced: RefCell::new(IndexSet::new()),
                deferred: RefCell::new(VecDeque::new()),
                stack: RefCell::new(Vec::new()),
                children: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// The name of this namespace.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.name.clone()
    }

    /// The wiring spec shared by every namespace in this build.
    #[must_use]
    pub fn spec(&self) -> &WiringSpec {
        &self.inner.spec
    }

    /// Creates a child namespace with the given handler.  Plugin-defined
    /// namespace kinds are introduced this way.
    ///
    /// # Errors
    ///
    /// Fails if a child namespace with this name already exists.
    pub fn derive_namespace(
        &self,
        name: &str,
        label: &str,
        handler: Box<dyn NamespaceHandler>,
    ) -> anyhow::Result<Namespace> {
        if self.inner.children.borrow().contains_key(name) {
            return Err(self.err(format!(
                "attempt to create child namespace {name} that already exists"
            )));
        }
        let child = Namespace {
            inner: Rc::new(NamespaceCore {
                name: name.to_string(),
                label: label.to_string(),
                parent: Some(self.clone()),
                spec: self.inner.spec.clone(),
                handler,
                built: RefCell::new(IndexMap::new()),
                announced: RefCell::new(IndexSet::new()),
                deferred: RefCell::new(VecDeque::new()),
                stack: RefCell::new(Vec::new()),
                children: RefCell::new(IndexMap::new()),
            }),
        };
        self.inner
            .children
            .borrow_mut()
            .insert(name.to_string(), child.clone());
        self.info(format!("created child namespace {name}"));
        Ok(child)
    }

    /// Returns the child namespace created earlier with
    /// [`Self::derive_namespace`].
    ///
    /// # Errors
    ///
    /// Fails if no child with this name exists.
    pub fn get_namespace(&self, name: &str) -> anyhow::Result<Namespace> {
        match self.inner.children.borrow().get(name) {
            Some(child) => Ok(child.clone()),
            None => Err(self.err(format!("child namespace {name} does not exist"))),
        }
    }

    /// Gets the node named `name`, building it if necessary, and records a
    /// dependency edge into this namespace if the node comes from an
    /// enclosing one.
    ///
    /// # Errors
    ///
    /// Fails if the name is undefined, if no namespace on the parent chain
    /// accepts the definition's kind, or if the build closure fails.
    pub fn get(&self, name: &str) -> anyhow::Result<NodeRef> {
        self.fetch(name, true)
    }

    /// [`Self::get`] without recording a dependency edge.  Used when a node
    /// must be constructed in an enclosing namespace without surfacing the
    /// dependency across this namespace's boundary.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::get`].
    pub fn instantiate(&self, name: &str) -> anyhow::Result<NodeRef> {
        self.fetch(name, false)
    }

    fn fetch(&self, name: &str, add_edge: bool) -> anyhow::Result<NodeRef> {
        if let Some(node) = self.inner.built.borrow().get(name) {
            return Ok(node.clone());
        }

        let def = self.lookup_def(name)?;

        self.inner.stack.borrow_mut().push(def.clone());
        let result = self.fetch_uncached(name, &def, add_edge);
        self.inner.stack.borrow_mut().pop();
        result
    }

    fn fetch_uncached(
        &self,
        name: &str,
        def: &Rc<WiringDef>,
        add_edge: bool,
    ) -> anyhow::Result<NodeRef> {
        // Alias: fetch the terminal name and cache the node under both.
        if def.name() != name {
            self.info(format!("resolved {name} to {}", def.name()));
            let node = self.fetch(def.name(), add_edge)?;
            self.inner
                .built
                .borrow_mut()
                .insert(name.to_string(), node.clone());
            return Ok(node);
        }

        let kind = def
            .kind()
            .ok_or_else(|| {
                self.fail(WiringError::NoBuildFunction {
                    name: name.to_string(),
                })
            })?;

        if !self.inner.handler.accepts(kind) {
            return self.fetch_from_parent(name, def, kind, add_edge);
        }

        self.info(format!("building {name} of kind {kind}"));
        let build = def.build_fn().ok_or_else(|| {
            self.fail(WiringError::NoBuildFunction {
                name: name.to_string(),
            })
        })?;
        let node = match build(self) {
            Ok(node) => node,
            Err(err) => {
                self.log_error(format!("unable to build {name}: {err:#}"));
                return Err(err);
            }
        };

        let announced = self.inner.announced.borrow_mut().insert(node.name());
        if announced && !def.opts().proxy {
            self.inner.handler.add_node(name, &node)?;
        }
        self.info(format!("finished building {name}"));
        self.inner
            .built
            .borrow_mut()
            .insert(name.to_string(), node.clone());
        Ok(node)
    }

    fn fetch_from_parent(
        &self,
        name: &str,
        def: &Rc<WiringDef>,
        kind: NodeKind,
        add_edge: bool,
    ) -> anyhow::Result<NodeRef> {
        let Some(parent) = self.inner.parent.clone() else {
            return Err(self.fail(WiringError::NotAccepted {
                namespace: self.inner.name.clone(),
                name: name.to_string(),
                kind,
            }));
        };

        self.info(format!(
            "getting {name} of kind {kind} from parent namespace {}",
            parent.name()
        ));
        let node = if add_edge {
            parent.get(name)?
        } else {
            parent.instantiate(name)?
        };

        let announced = self.inner.announced.borrow_mut().insert(node.name());
        if announced && add_edge && !node.is_metadata() && !def.opts().proxy {
            self.inner.handler.add_edge(name, &node)?;
        }
        self.inner
            .built
            .borrow_mut()
            .insert(name.to_string(), node.clone());
        Ok(node)
    }

    /// Injects an already-built node into this namespace.  If the handler
    /// does not accept the node's kind, the node is pushed to the parent
    /// namespace and recorded here as an edge.
    ///
    /// # Errors
    ///
    /// Fails if no namespace on the parent chain accepts the node.
    pub fn put(&self, name: &str, node: NodeRef) -> anyhow::Result<()> {
        self.inner
            .built
            .borrow_mut()
            .insert(name.to_string(), node.clone());

        if self.inner.handler.accepts(node.kind()) {
            self.inner.handler.add_node(name, &node)?;
            self.info(format!("{name} of kind {} added to namespace", node.kind()));
            return Ok(());
        }

        // Check the parent exists before doing anything else.
        let Some(parent) = self.inner.parent.clone() else {
            return Err(self.fail(WiringError::NoParentForPut {
                namespace: self.inner.name.clone(),
                name: name.to_string(),
                kind: node.kind(),
            }));
        };
        self.info(format!(
            "{name} of kind {} does not belong in this namespace; pushing to parent namespace {}",
            node.kind(),
            parent.name()
        ));
        parent.put(name, node.clone())?;
        self.inner.handler.add_edge(name, &node)
    }

    /// Reads the single value stored under `(name, key)` in the wiring spec.
    ///
    /// # Errors
    ///
    /// Fails if `name` is undefined or on a property type mismatch.
    pub fn get_property<T: Clone + 'static>(
        &self,
        name: &str,
        key: &str,
    ) -> anyhow::Result<Option<T>> {
        let def = self.lookup_def(name)?;
        def.get_property(key).map_err(|e| self.fail(e))
    }

    /// Reads every value stored under `(name, key)` in the wiring spec.
    ///
    /// # Errors
    ///
    /// Fails if `name` is undefined or on a property type mismatch.
    pub fn get_properties<T: Clone + 'static>(
        &self,
        name: &str,
        key: &str,
    ) -> anyhow::Result<Vec<T>> {
        let def = self.lookup_def(name)?;
        def.get_properties(key).map_err(|e| self.fail(e))
    }

    /// Enqueues work to run after all currently-queued work finishes.
    /// Deferrals are always forwarded to the root namespace, so there is a
    /// single queue per build.
    pub fn defer(&self, f: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.push_deferred(Box::new(f), false);
    }

    /// Like [`Self::defer`], but prepends to the queue.
    pub fn defer_front(&self, f: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.push_deferred(Box::new(f), true);
    }

    fn push_deferred(&self, f: DeferredFn, front: bool) {
        match &self.inner.parent {
            Some(parent) => parent.push_deferred(f, front),
            None => {
                let mut queue = self.inner.deferred.borrow_mut();
                if front {
                    queue.push_front(f);
                } else {
                    queue.push_back(f);
                }
            }
        }
    }

    pub(crate) fn pop_deferred(&self) -> Option<DeferredFn> {
        self.inner.deferred.borrow_mut().pop_front()
    }

    fn lookup_def(&self, name: &str) -> anyhow::Result<Rc<WiringDef>> {
        self.inner.spec.get_def(name).ok_or_else(|| {
            self.fail(WiringError::UndefinedName {
                name: name.to_string(),
                namespace: self.inner.name.clone(),
            })
        })
    }

    fn diag_context(&self) -> String {
        match self.inner.stack.borrow().last() {
            Some(def) => format!(" ({})", def.callsite()),
            None => String::new(),
        }
    }

    /// Logs an info-level diagnostic tagged with this namespace and the
    /// wiring line currently being built.
    pub fn info(&self, message: impl AsRef<str>) {
        log::info!(
            "{} {}: {}{}",
            self.inner.label,
            self.inner.name,
            message.as_ref(),
            self.diag_context()
        );
    }

    /// Logs a warning-level diagnostic.
    pub fn warn(&self, message: impl AsRef<str>) {
        log::warn!(
            "{} {}: {}{}",
            self.inner.label,
            self.inner.name,
            message.as_ref(),
            self.diag_context()
        );
    }

    fn log_error(&self, message: String) {
        log::error!(
            "{} {}: {}{}",
            self.inner.label,
            self.inner.name,
            message,
            self.diag_context()
        );
    }

    /// Logs an error-level diagnostic and returns it as an error, with the
    /// wiring line currently being built appended for attribution.
    #[must_use]
    pub fn err(&self, message: impl Into<String>) -> anyhow::Error {
        let message = message.into();
        self.log_error(message.clone());
        anyhow::anyhow!(
            "{} {}: {message}{}",
            self.inner.label,
            self.inner.name,
            self.diag_context()
        )
    }

    fn fail(&self, err: WiringError) -> anyhow::Error {
        self.log_error(err.to_string());
        anyhow::Error::new(err)
    }
}
