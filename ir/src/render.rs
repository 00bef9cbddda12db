//! Deterministic rendering and filtering of IR trees.
//!
//! The rendered form is a debugging projection: namespace nodes print as
//! `name = Label(edge, edge) { children }` with children sorted by their
//! rendered form, so that two structurally equal trees always print
//! identically regardless of build order.

use crate::node::{IrNode, NodeKind, NodeRef};

/// Indents every line of `s` by `amount` spaces.
#[must_use]
pub fn indent(s: &str, amount: usize) -> String {
    let pad = " ".repeat(amount);
    s.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a namespace node: its name, a type label, the names of its
/// argument edges, and its children.
///
/// Edge names and child renderings are sorted so the output is independent
/// of build order.
#[must_use]
pub fn render_namespace(name: &str, label: &str, edges: &[NodeRef], children: &[NodeRef]) -> String {
    let mut edge_names: Vec<String> = edges.iter().map(NodeRef::name).collect();
    edge_names.sort();
    let header = format!("{name} = {label}({})", edge_names.join(", "));

    if children.is_empty() {
        return format!("{header} {{}}");
    }

    let mut rendered: Vec<String> = children.iter().map(NodeRef::render).collect();
    rendered.sort();
    format!("{header} {{\n{}\n}}", indent(&rendered.join("\n"), 2))
}

/// Returns the nodes whose concrete type is `T`.
#[must_use]
pub fn filter<T: IrNode>(nodes: &[NodeRef]) -> Vec<NodeRef> {
    nodes.iter().filter(|n| n.is::<T>()).cloned().collect()
}

/// Returns the nodes carrying the requested [`NodeKind`] tag.
#[must_use]
pub fn filter_kind(nodes: &[NodeRef], kind: NodeKind) -> Vec<NodeRef> {
    nodes.iter().filter(|n| n.kind() == kind).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Application, ValueNode};

    #[test]
    fn indent_pads_every_line() {
        assert_eq!(indent("a\nb", 2), "  a\n  b");
    }

    #[test]
    fn namespace_rendering_sorts_children() {
        let children = vec![
            NodeRef::new(ValueNode::new("zz")),
            NodeRef::new(ValueNode::new("aa")),
        ];
        let rendered = render_namespace("ns", "Process", &[], &children);
        assert_eq!(rendered, "ns = Process() {\n  \"aa\"\n  \"zz\"\n}");
    }

    #[test]
    fn namespace_rendering_lists_edge_names() {
        let edges = vec![NodeRef::new(ValueNode::new("b.addr")), NodeRef::new(ValueNode::new("a.addr"))];
        let rendered = render_namespace("ns", "Process", &edges, &[]);
        assert_eq!(rendered, "ns = Process(a.addr, b.addr) {}");
    }

    #[test]
    fn filters_by_type_and_kind() {
        let nodes = vec![
            NodeRef::new(ValueNode::new("x")),
            NodeRef::new(Application::new("app")),
        ];
        assert_eq!(filter::<ValueNode>(&nodes).len(), 1);
        assert_eq!(filter::<Application>(&nodes).len(), 1);
        assert_eq!(filter_kind(&nodes, NodeKind::Application).len(), 1);
        assert_eq!(filter_kind(&nodes, NodeKind::Process).len(), 0);
    }
}
