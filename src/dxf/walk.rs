//! Tree walker with in-place substitution
//!
//! Visits the children of a node in order, invoking a pre- and a
//! post-filter on each.  A filter may splice the child out for zero or
//! more replacements; replacements count as output of the current pass and
//! are not revisited.

use crate::dxf::node::Node;
use crate::error::Result;

/// Outcome of a filter invocation.
pub enum Visit {
    /// Keep the node and descend into its children.
    Descend,
    /// Keep the node, do not descend.
    Keep,
    /// Splice these nodes in place of the visited one.
    Replace(Vec<Node>),
}

/// Walk the children of `node` recursively with a pre- and post-filter.
pub fn walk<F, G>(node: &mut Node, pre: &mut F, post: &mut G) -> Result<()>
where
    F: FnMut(&mut Node) -> Result<Visit>,
    G: FnMut(&mut Node) -> Result<Visit>,
{
    let mut i = 0;
    while i < node.children.len() {
        match pre(&mut node.children[i])? {
            Visit::Replace(replacement) => {
                let advance = replacement.len();
                node.children.splice(i..i + 1, replacement);
                i += advance;
                continue;
            }
            Visit::Keep => {}
            Visit::Descend => walk(&mut node.children[i], pre, post)?,
        }
        match post(&mut node.children[i])? {
            Visit::Replace(replacement) => {
                let advance = replacement.len();
                node.children.splice(i..i + 1, replacement);
                i += advance;
            }
            _ => i += 1,
        }
    }
    Ok(())
}

/// Walk with only a pre-filter.
pub fn walk_pre<F>(node: &mut Node, pre: &mut F) -> Result<()>
where
    F: FnMut(&mut Node) -> Result<Visit>,
{
    walk(node, pre, &mut |_| Ok(Visit::Keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Node {
        Node::new("dxf")
            .with_child(Node::new("A").with_child(Node::new("B")))
            .with_child(Node::new("C"))
    }

    #[test]
    fn test_visit_order() {
        let mut root = tree();
        let mut seen = Vec::new();
        walk_pre(&mut root, &mut |n| {
            seen.push(n.name.clone());
            Ok(Visit::Descend)
        })
        .unwrap();
        assert_eq!(seen, ["A", "B", "C"]);
    }

    #[test]
    fn test_skip_descend() {
        let mut root = tree();
        let mut seen = Vec::new();
        walk_pre(&mut root, &mut |n| {
            seen.push(n.name.clone());
            Ok(Visit::Keep)
        })
        .unwrap();
        assert_eq!(seen, ["A", "C"]);
    }

    #[test]
    fn test_replacement_not_revisited() {
        let mut root = tree();
        let mut seen = Vec::new();
        walk_pre(&mut root, &mut |n| {
            seen.push(n.name.clone());
            if n.name == "A" {
                // Replacing A with another A would loop forever if
                // replacements were revisited.
                Ok(Visit::Replace(vec![Node::new("A"), Node::new("A2")]))
            } else {
                Ok(Visit::Descend)
            }
        })
        .unwrap();
        assert_eq!(seen, ["A", "C"]);
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "A2", "C"]);
    }

    #[test]
    fn test_removal() {
        let mut root = tree();
        walk_pre(&mut root, &mut |n| {
            if n.name == "C" {
                Ok(Visit::Replace(Vec::new()))
            } else {
                Ok(Visit::Keep)
            }
        })
        .unwrap();
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A"]);
    }

    #[test]
    fn test_post_filter_runs_after_children() {
        let mut root = tree();
        let order = std::cell::RefCell::new(Vec::new());
        walk(
            &mut root,
            &mut |n| {
                order.borrow_mut().push(format!("pre:{}", n.name));
                Ok(Visit::Descend)
            },
            &mut |n| {
                order.borrow_mut().push(format!("post:{}", n.name));
                Ok(Visit::Keep)
            },
        )
        .unwrap();
        assert_eq!(order.into_inner(), ["pre:A", "pre:B", "post:B", "post:A", "pre:C", "post:C"]);
    }
}
