//! DXF tree parser
//!
//! Two phases: a linear sweep turning the pair stream into a flat node
//! list, then end-node resolution folding the list into a tree.  An
//! unmatched end node is tolerated with a warning; a missing root `EOF`
//! is fatal.

use crate::dxf::code::{self, HEADER_VARIABLE, NODE_START};
use crate::dxf::node::Node;
use crate::dxf::reader::CodePairReader;
use crate::error::{CamError, Result};
use crate::notification::NotificationCollection;
use std::io::Read;

/// A parsed drawing: the tree plus non-fatal diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Drawing {
    /// Tree root, paired with the `EOF` terminator.
    pub root: Node,
    /// Diagnostics collected while parsing and transforming.
    pub notifications: NotificationCollection,
}

impl Drawing {
    /// An empty drawing (bare root).
    pub fn new() -> Self {
        Drawing {
            root: Node::root(),
            ..Drawing::default()
        }
    }
}

/// Parse a DXF document from a reader.
pub fn parse<R: Read>(input: R) -> Result<Drawing> {
    let mut pairs = CodePairReader::new(input);
    let mut notifications = NotificationCollection::new();

    let flat = linear_sweep(&mut pairs, &mut notifications)?;
    let root = resolve_end_nodes(flat, &mut notifications)?;

    Ok(Drawing {
        root,
        notifications,
    })
}

/// Parse a DXF document from a string.
pub fn parse_str(input: &str) -> Result<Drawing> {
    parse(input.as_bytes())
}

/// Sweep the pair stream into a flat node list.  Attribute pairs attach to
/// the most recently started node; pairs before the first node start are
/// dropped with a warning.
fn linear_sweep<R: Read>(
    pairs: &mut CodePairReader<R>,
    notifications: &mut NotificationCollection,
) -> Result<Vec<Node>> {
    let mut nodes: Vec<Node> = Vec::new();

    while let Some(pair) = pairs.read_pair()? {
        match pair.code {
            NODE_START | HEADER_VARIABLE => {
                let name = if pair.code == HEADER_VARIABLE && !pair.value.starts_with('$') {
                    // Header variables carry the $ by convention; tolerate
                    // its absence in the input.
                    format!("${}", pair.value)
                } else {
                    pair.value
                };
                nodes.push(Node::new(name));
            }
            _ => match nodes.last_mut() {
                Some(node) => node.push_attr(code::attr_name(pair.code), pair.value),
                None => notifications.warn(format!(
                    "dropping attribute pair ({}, '{}') before any node",
                    pair.code, pair.value
                )),
            },
        }
    }

    Ok(nodes)
}

/// Fold the flat list into a tree by pairing end nodes with their nearest
/// unclosed starters.
fn resolve_end_nodes(
    flat: Vec<Node>,
    notifications: &mut NotificationCollection,
) -> Result<Node> {
    // Each stack entry is an open starter accumulating children; entry 0
    // is the root, closed only by EOF.
    let mut stack: Vec<Node> = vec![Node::root()];
    let mut root_closed = false;

    for node in flat {
        if root_closed {
            notifications.warn(format!("dropping node '{}' after EOF", node.name));
            continue;
        }

        if let Some(starter) = code::end_node_starter(&node.name) {
            let position = stack.iter().rposition(|open| open.name == starter);
            match position {
                None => {
                    notifications.warn(format!("dropping unmatched end node '{}'", node.name));
                }
                Some(pos) => {
                    // Starters left open above the match fold into their
                    // parents without a terminator of their own.
                    while stack.len() > pos + 1 {
                        let unclosed = stack.pop().expect("stack underflow");
                        if code::is_starter(&unclosed.name) {
                            notifications.warn(format!(
                                "'{}' closed implicitly by '{}'",
                                unclosed.name, node.name
                            ));
                        }
                        stack
                            .last_mut()
                            .expect("stack underflow")
                            .children
                            .push(unclosed);
                    }
                    if pos == 0 {
                        stack[0].end_tag = Some(Box::new(node));
                        root_closed = true;
                    } else {
                        let mut closed = stack.pop().expect("stack underflow");
                        closed.end_tag = Some(Box::new(node));
                        stack
                            .last_mut()
                            .expect("stack underflow")
                            .children
                            .push(closed);
                    }
                }
            }
        } else if code::is_starter(&node.name) {
            stack.push(node);
        } else {
            stack.last_mut().expect("stack underflow").children.push(node);
        }
    }

    if !root_closed {
        return Err(CamError::Parse("missing EOF at end of document".into()));
    }

    Ok(stack.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\nA\n10\n0.0\n20\n0.0\n11\n100.0\n21\n50.0\n0\nENDSEC\n0\nEOF\n";

    #[test]
    fn test_parse_minimal() {
        let drawing = parse_str(MINIMAL).unwrap();
        let root = &drawing.root;
        assert_eq!(root.children.len(), 1);

        let section = &root.children[0];
        assert_eq!(section.name, "SECTION");
        assert_eq!(section.attr_str("name"), Some("ENTITIES"));
        assert_eq!(section.end_tag.as_ref().unwrap().name, "ENDSEC");

        let line = &section.children[0];
        assert_eq!(line.name, "LINE");
        assert_eq!(line.attr_str("layer"), Some("A"));
        assert_eq!(line.attr_f64("x1").unwrap(), Some(100.0));
        assert!(drawing.notifications.is_empty());
    }

    #[test]
    fn test_header_variable_nodes() {
        let input = "0\nSECTION\n2\nHEADER\n9\n$ACADVER\n1\nAC1015\n0\nENDSEC\n0\nEOF\n";
        let drawing = parse_str(input).unwrap();
        let header = &drawing.root.children[0];
        let var = &header.children[0];
        assert_eq!(var.name, "$ACADVER");
        assert_eq!(var.group_code(), 9);
        assert_eq!(var.attr_str("text"), Some("AC1015"));
    }

    #[test]
    fn test_polyline_seqend() {
        let input = "0\nSECTION\n2\nENTITIES\n0\nPOLYLINE\n0\nVERTEX\n10\n0\n20\n0\n0\nVERTEX\n10\n1\n20\n1\n0\nSEQEND\n0\nENDSEC\n0\nEOF\n";
        let drawing = parse_str(input).unwrap();
        let polyline = &drawing.root.children[0].children[0];
        assert_eq!(polyline.name, "POLYLINE");
        assert_eq!(polyline.children.len(), 2);
        assert_eq!(polyline.children[1].name, "VERTEX");
        assert_eq!(polyline.end_tag.as_ref().unwrap().name, "SEQEND");
    }

    #[test]
    fn test_unmatched_end_node_warns() {
        let input = "0\nENDBLK\n0\nEOF\n";
        let drawing = parse_str(input).unwrap();
        assert!(drawing.root.children.is_empty());
        assert_eq!(drawing.notifications.len(), 1);
    }

    #[test]
    fn test_missing_eof_is_fatal() {
        let input = "0\nSECTION\n2\nENTITIES\n0\nENDSEC\n";
        assert!(matches!(parse_str(input), Err(CamError::Parse(_))));
    }

    #[test]
    fn test_implicit_close_of_nested_starter() {
        // Missing SEQEND: ENDSEC closes the section, folding the open
        // POLYLINE in as a child with a warning.
        let input = "0\nSECTION\n2\nENTITIES\n0\nPOLYLINE\n0\nVERTEX\n10\n0\n20\n0\n0\nENDSEC\n0\nEOF\n";
        let drawing = parse_str(input).unwrap();
        let section = &drawing.root.children[0];
        assert_eq!(section.children.len(), 1);
        assert_eq!(section.children[0].name, "POLYLINE");
        assert!(section.children[0].end_tag.is_none());
        assert!(!drawing.notifications.is_empty());
    }

    #[test]
    fn test_repeated_codes_become_lists() {
        let input = "0\nSECTION\n2\nENTITIES\n0\nLWPOLYLINE\n90\n3\n10\n0\n20\n0\n10\n5\n20\n1\n10\n9\n20\n0\n0\nENDSEC\n0\nEOF\n";
        let drawing = parse_str(input).unwrap();
        let lw = &drawing.root.children[0].children[0];
        assert_eq!(lw.attr_f64_list("x").unwrap(), vec![0.0, 5.0, 9.0]);
        assert_eq!(lw.attr_f64_list("y").unwrap(), vec![0.0, 1.0, 0.0]);
    }
}
