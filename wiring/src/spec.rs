//! The wiring specification: a pure, declarative registry of node
//! definitions, aliases, and properties.
//!
//! Nothing here builds IR nodes.  Declarations accumulate in the registry and
//! are consumed later by the namespace engine.  Declaration calls never fail;
//! errors noticed while declaring are accumulated on the spec and surfaced
//! when the build starts.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use loom_ir::{NodeKind, NodeRef};

use crate::application::{build_application_ir, BuildError};
use crate::callsite::Callsite;
use crate::error::WiringError;
use crate::namespace::Namespace;

/// The build closure of a definition.  Invoked at most once per namespace
/// that accepts the definition; receives the namespace the node is being
/// built into.
pub type BuildFn = Rc<dyn Fn(&Namespace) -> anyhow::Result<NodeRef>>;

/// A property value.  Values are type-erased; readers downcast with
/// [`WiringDef::get_property`] / [`WiringDef::get_properties`].
pub type PropValue = Rc<dyn Any>;

/// Additional options attached to a definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct WiringOpts {
    /// A proxy definition builds a node on behalf of another definition.
    /// The engine suppresses the node and edge announcements for it, so the
    /// node it returns is attributed to its real definition only.
    pub proxy: bool,
}

struct DefState {
    kind: Option<NodeKind>,
    build: Option<BuildFn>,
    opts: WiringOpts,
    callsite: Callsite,
}

/// A single named entry in the wiring spec.
///
/// Definitions are created by [`WiringSpec::define`], or implicitly by
/// property writes against a name that has no definition yet.  A definition
/// created implicitly has no node kind and no build function until a later
/// `define` fills them in; properties survive redefinition.
pub struct WiringDef {
    name: String,
    state: RefCell<DefState>,
    properties: RefCell<IndexMap<String, Vec<PropValue>>>,
}

impl WiringDef {
    fn new(name: &str, callsite: Callsite) -> Self {
        WiringDef {
            name: name.to_string(),
            state: RefCell::new(DefState {
                kind: None,
                build: None,
                opts: WiringOpts::default(),
                callsite,
            }),
            properties: RefCell::new(IndexMap::new()),
        }
    }

    /// The definition's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node kind, if the definition has been fully declared.
    #[must_use]
    pub fn kind(&self) -> Option<NodeKind> {
        self.state.borrow().kind
    }

    /// The build closure, if the definition has been fully declared.
    #[must_use]
    pub fn build_fn(&self) -> Option<BuildFn> {
        self.state.borrow().build.clone()
    }

    /// The definition's options.
    #[must_use]
    pub fn opts(&self) -> WiringOpts {
        self.state.borrow().opts
    }

    /// The wiring-file location of the declaration.
    #[must_use]
    pub fn callsite(&self) -> Callsite {
        self.state.borrow().callsite
    }

    /// Appends a value to the property list for `key`.
    pub fn add_property(&self, key: &str, value: PropValue) {
        self.properties
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push(value);
    }

    /// Replaces the property list for `key` with a single value.
    pub fn set_property(&self, key: &str, value: PropValue) {
        self.properties
            .borrow_mut()
            .insert(key.to_string(), vec![value]);
    }

    /// Reads the single value stored under `key`.
    ///
    /// Returns `None` when the key is absent or holds more than one value;
    /// callers expecting several values use [`Self::get_properties`].
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::PropertyType`] when the stored value is not a
    /// `T`.
    pub fn get_property<T: Clone + 'static>(&self, key: &str) -> Result<Option<T>, WiringError> {
        let properties = self.properties.borrow();
        let Some(values) = properties.get(key) else {
            return Ok(None);
        };
        if values.len() != 1 {
            return Ok(None);
        }
        match values[0].downcast_ref::<T>() {
            Some(value) => Ok(Some(value.clone())),
            None => Err(WiringError::PropertyType {
                name: self.name.clone(),
                key: key.to_string(),
            }),
        }
    }

    /// Reads every value stored under `key`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::PropertyType`] when any stored value is not a
    /// `T`.
    pub fn get_properties<T: Clone + 'static>(&self, key: &str) -> Result<Vec<T>, WiringError> {
        let properties = self.properties.borrow();
        let Some(values) = properties.get(key) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match value.downcast_ref::<T>() {
                Some(value) => out.push(value.clone()),
                None => {
                    return Err(WiringError::PropertyType {
                        name: self.name.clone(),
                        key: key.to_string(),
                    })
                }
            }
        }
        Ok(out)
    }

    fn render(&self) -> String {
        let kind = match self.state.borrow().kind {
            Some(kind) => kind.as_str().to_string(),
            None => "?".to_string(),
        };
        let properties = self.properties.borrow();
        let props: Vec<String> = properties
            .iter()
            .map(|(key, values)| {
                let shown: Vec<String> = values.iter().map(|v| render_prop(v)).collect();
                format!("{key}={}", shown.join(","))
            })
            .collect();
        format!("{} = {kind}({})", self.name, props.join(", "))
    }
}

fn render_prop(value: &PropValue) -> String {
    if let Some(s) = value.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = value.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else {
        "…".to_string()
    }
}

struct SpecInner {
    name: String,
    defs: RefCell<IndexMap<String, Rc<WiringDef>>>,
    aliases: RefCell<IndexMap<String, String>>,
    errors: RefCell<Vec<String>>,
}

/// The wiring specification.  Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct WiringSpec {
    inner: Rc<SpecInner>,
}

impl WiringSpec {
    /// Creates an empty wiring spec for an application called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        WiringSpec {
            inner: Rc::new(SpecInner {
                name: name.into(),
                defs: RefCell::new(IndexMap::new()),
                aliases: RefCell::new(IndexMap::new()),
                errors: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The application name this spec was created with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn def_entry(&self, name: &str, callsite: Callsite) -> Rc<WiringDef> {
        let mut defs = self.inner.defs.borrow_mut();
        if let Some(def) = defs.get(name) {
            return def.clone();
        }
        let def = Rc::new(WiringDef::new(name, callsite));
        defs.insert(name.to_string(), def.clone());
        // A name is either a definition or an alias, never both.
        self.inner.aliases.borrow_mut().shift_remove(name);
        def
    }

    /// Installs or overwrites the definition for `name`.
    ///
    /// `kind` tells namespaces where the node may be built; the build closure
    /// is not required to return a node of that kind.  The closure is not
    /// executed here.  Redefining a name replaces its kind and build function
    /// but keeps any properties already attached to it.
    #[track_caller]
    pub fn define(
        &self,
        name: &str,
        kind: NodeKind,
        build: impl Fn(&Namespace) -> anyhow::Result<NodeRef> + 'static,
    ) {
        self.define_with(name, kind, build, WiringOpts::default());
    }

    /// [`Self::define`] with explicit [`WiringOpts`].
    #[track_caller]
    pub fn define_with(
        &self,
        name: &str,
        kind: NodeKind,
        build: impl Fn(&Namespace) -> anyhow::Result<NodeRef> + 'static,
        opts: WiringOpts,
    ) {
        let callsite = Callsite::capture();
        let def = self.def_entry(name, callsite);
        let mut state = def.state.borrow_mut();
        state.kind = Some(kind);
        state.build = Some(Rc::new(build));
        state.opts = opts;
        state.callsite = callsite;
    }

    /// Installs an alias from `name` to `target`, discarding any existing
    /// definition under `name`.
    pub fn alias(&self, name: &str, target: &str) {
        self.inner.defs.borrow_mut().shift_remove(name);
        self.inner
            .aliases
            .borrow_mut()
            .insert(name.to_string(), target.to_string());
    }

    /// Returns what `name` points to if it is an alias.  Does not resolve
    /// transitively.
    #[must_use]
    pub fn get_alias(&self, name: &str) -> Option<String> {
        self.inner.aliases.borrow().get(name).cloned()
    }

    /// Resolves alias chains starting at `name` to a terminal name.
    ///
    /// Alias cycles are a programming error in the wiring spec; resolution
    /// gives up after visiting every alias once rather than spinning.
    #[must_use]
    pub fn resolve(&self, name: &str) -> String {
        let aliases = self.inner.aliases.borrow();
        let mut current = name.to_string();
        let mut hops = 0;
        while let Some(next) = aliases.get(&current) {
            current = next.clone();
            hops += 1;
            if hops > aliases.len() {
                break;
            }
        }
        current
    }

    /// Resolves aliases and returns the terminal definition, if one exists.
    #[must_use]
    pub fn get_def(&self, name: &str) -> Option<Rc<WiringDef>> {
        let terminal = self.resolve(name);
        self.inner.defs.borrow().get(&terminal).cloned()
    }

    /// The names of all definitions, in declaration order.
    #[must_use]
    pub fn defined_names(&self) -> Vec<String> {
        self.inner.defs.borrow().keys().cloned().collect()
    }

    /// Replaces the `key` property of `name` with a single value, creating
    /// the definition record if it does not exist yet.
    #[track_caller]
    pub fn set_property(&self, name: &str, key: &str, value: impl Any) {
        let def = self.def_entry(name, Callsite::capture());
        def.set_property(key, Rc::new(value));
    }

    /// Appends a value to the `key` property of `name`, creating the
    /// definition record if it does not exist yet.
    #[track_caller]
    pub fn add_property(&self, name: &str, key: &str, value: impl Any) {
        let def = self.def_entry(name, Callsite::capture());
        def.add_property(key, Rc::new(value));
    }

    /// Reads the single value stored under `(name, key)`.  `None` when the
    /// definition or key is absent, or when the key holds several values.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::PropertyType`] on a type mismatch.
    pub fn get_property<T: Clone + 'static>(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<T>, WiringError> {
        match self.get_def(name) {
            Some(def) => def.get_property(key),
            None => Ok(None),
        }
    }

    /// Reads every value stored under `(name, key)`.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::PropertyType`] on a type mismatch.
    pub fn get_properties<T: Clone + 'static>(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Vec<T>, WiringError> {
        match self.get_def(name) {
            Some(def) => def.get_properties(key),
            None => Ok(Vec::new()),
        }
    }

    /// Records an error noticed while declaring the spec.  Declaration calls
    /// never fail; accumulated errors are surfaced when the build starts.
    pub fn add_error(&self, err: anyhow::Error) {
        log::error!("wiring spec {}: {err:#}", self.inner.name);
        self.inner.errors.borrow_mut().push(format!("{err:#}"));
    }

    /// Returns the accumulated declaration errors, if any.
    #[must_use]
    pub fn err(&self) -> Option<WiringError> {
        let errors = self.inner.errors.borrow();
        if errors.is_empty() {
            None
        } else {
            Some(WiringError::Accumulated(errors.clone()))
        }
    }

    /// Builds the application IR for the given roots.  An empty root list
    /// builds every defined name.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] carrying the partially-built application IR
    /// alongside the failure.
    pub fn build_ir(&self, roots: &[&str]) -> Result<NodeRef, BuildError> {
        build_application_ir(self, &self.inner.name.clone(), roots)
    }
}

impl fmt::Display for WiringSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self
            .inner
            .defs
            .borrow()
            .values()
            .map(|def| def.render())
            .collect();
        lines.extend(
            self.inner
                .aliases
                .borrow()
                .iter()
                .map(|(alias, target)| format!("{alias} -> {target}")),
        );
        write!(
            f,
            "{} = WiringSpec {{\n{}\n}}",
            self.inner.name,
            loom_ir::indent(&lines.join("\n"), 2)
        )
    }
}
