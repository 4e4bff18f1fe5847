//! Structural inverse of the parser.

use crate::ParseNode;

/// Rebuild the source text of `node`.
///
/// Every node keeps the aether consumed in front of it, and every group the
/// aether consumed before its end marker, so `unparse(parse(s)) == s` holds for
/// every `s` the grammar accepts.
pub fn unparse(node: &ParseNode) -> String {
    let mut out = String::with_capacity(node.length());
    write_node(node, &mut out);
    out
}

fn write_node(node: &ParseNode, out: &mut String) {
    match node {
        ParseNode::Entity(entity) => {
            out.push_str(&entity.leading);
            out.push_str(&entity.content);
        }
        ParseNode::Group(group) => {
            out.push_str(&group.leading);
            out.push_str(&group.start);
            for child in &group.children {
                write_node(child, out);
            }
            out.push_str(&group.trailing);
            out.push_str(&group.end);
        }
    }
}
