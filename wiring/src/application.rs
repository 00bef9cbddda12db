//! Build orchestration: the root application namespace and the deferred
//! work loop.

use std::fmt;

use loom_ir::{Application, NodeRef};

use crate::namespace::{Namespace, NamespaceHandler};
use crate::spec::WiringSpec;

/// A build failure carrying the partially-constructed application IR.
///
/// The application node is always present so that callers can render the
/// partial IR when diagnosing the failure.
#[derive(Debug)]
pub struct BuildError {
    /// The application IR as it stood when the build failed.
    pub app: NodeRef,
    /// The failure.
    pub cause: anyhow::Error,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.cause)
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Handler for the root application namespace: accepts every node kind and
/// attaches built nodes as children of the application IR node.
struct ApplicationHandler {
    app: NodeRef,
}

impl NamespaceHandler for ApplicationHandler {
    fn accepts(&self, _kind: loom_ir::NodeKind) -> bool {
        true
    }

    fn add_node(&self, _name: &str, node: &NodeRef) -> anyhow::Result<()> {
        match self.app.downcast_mut::<Application>() {
            Some(mut app) => {
                app.children.push(node.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("application IR node has the wrong type")),
        }
    }

    fn add_edge(&self, name: &str, _node: &NodeRef) -> anyhow::Result<()> {
        // Nothing exists outside the application.
        Err(anyhow::anyhow!(
            "the application namespace cannot receive {name} as an edge; nothing encloses the application"
        ))
    }
}

/// Builds the application IR from `spec`.
///
/// Each requested root is enqueued as deferred work, front-loaded so that the
/// output IR preserves the order the roots were given in; the loop then
/// drains the root queue until it is empty.  An empty `roots` list builds
/// every defined name.
///
/// # Errors
///
/// Returns a [`BuildError`] carrying the partial application IR when the
/// spec accumulated declaration errors or when any deferred closure fails.
pub fn build_application_ir(
    spec: &WiringSpec,
    name: &str,
    roots: &[&str],
) -> Result<NodeRef, BuildError> {
    let app = NodeRef::new(Application::new(name));

    if let Some(err) = spec.err() {
        return Err(BuildError {
            app,
            cause: anyhow::Error::new(err),
        });
    }

    let root_ns = Namespace::root(
        spec.clone(),
        name,
        "Application",
        Box::new(ApplicationHandler { app: app.clone() }),
    );

    let roots: Vec<String> = if roots.is_empty() {
        spec.defined_names()
    } else {
        roots.iter().map(|r| (*r).to_string()).collect()
    };

    // Front-loaded in reverse so the queue runs in the order given.
    for root in roots.iter().rev() {
        let ns = root_ns.clone();
        let root = root.clone();
        root_ns.defer_front(move || {
            ns.info(format!("instantiating {root}"));
            ns.get(&root).map(|_| ())
        });
    }

    while let Some(work) = root_ns.pop_deferred() {
        if let Err(cause) = work() {
            return Err(BuildError { app, cause });
        }
    }

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_ir::{NodeKind, ValueNode};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn builds_requested_roots_in_order() {
        let spec = WiringSpec::new("app");
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b"] {
            let order = order.clone();
            spec.define(name, NodeKind::Instance, move |_| {
                order.borrow_mut().push(name);
                Ok(NodeRef::new(ValueNode::new(name)))
            });
        }
        let app = spec.build_ir(&["b", "a"]);
        assert!(app.is_ok());
        assert_eq!(order.borrow().as_slice(), ["b", "a"]);
    }

    #[test]
    fn empty_roots_build_every_definition() {
        let spec = WiringSpec::new("app");
        for name in ["a", "b", "c"] {
            spec.define(name, NodeKind::Instance, move |_| {
                Ok(NodeRef::new(ValueNode::new(name)))
            });
        }
        let app = spec.build_ir(&[]);
        let children = app
            .ok()
            .and_then(|app| app.downcast_ref::<Application>().map(|a| a.children.len()));
        assert_eq!(children, Some(3));
    }

    #[test]
    fn failure_returns_partial_ir() {
        let spec = WiringSpec::new("app");
        spec.define("good", NodeKind::Instance, |_| {
            Ok(NodeRef::new(ValueNode::new("good")))
        });
        spec.define("bad", NodeKind::Instance, |_| {
            Err(anyhow::anyhow!("boom"))
        });
        let err = match spec.build_ir(&["good", "bad"]) {
            Err(err) => err,
            Ok(_) => return assert!(false, "expected a build failure"),
        };
        assert!(err.to_string().contains("boom"));
        let children = err
            .app
            .downcast_ref::<Application>()
            .map(|a| a.children.len());
        assert_eq!(children, Some(1));
    }

    #[test]
    fn accumulated_declaration_errors_fail_the_build() {
        let spec = WiringSpec::new("app");
        spec.add_error(anyhow::anyhow!("declared something impossible"));
        let err = spec.build_ir(&[]).err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("declared something impossible")));
    }

    #[test]
    fn defer_exhaustion_before_return() {
        let spec = WiringSpec::new("app");
        let hits = Rc::new(RefCell::new(0));
        let outer_hits = hits.clone();
        spec.define("root", NodeKind::Instance, move |ns| {
            let inner_hits = outer_hits.clone();
            ns.defer(move || {
                *inner_hits.borrow_mut() += 1;
                Ok(())
            });
            Ok(NodeRef::new(ValueNode::new("root")))
        });
        let app = spec.build_ir(&["root"]);
        assert!(app.is_ok());
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn double_build_renders_identically() {
        let spec = WiringSpec::new("app");
        for name in ["a", "b"] {
            spec.define(name, NodeKind::Instance, move |_| {
                Ok(NodeRef::new(ValueNode::new(name)))
            });
        }
        let first = spec.build_ir(&[]).map(|app| app.render());
        let second = spec.build_ir(&[]).map(|app| app.render());
        assert!(first.is_ok());
        match (first, second) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            other => assert!(false, "unexpected results: {other:?}"),
        }
    }
}
