//! XML mirror of the DXF tree
//!
//! Every tree node maps to one XML element: the node name becomes the tag
//! (a leading `$` rewritten to `_`), scalar attributes become XML
//! attributes, and list attributes are space-joined under a `-array`
//! suffix.  Element text carries only indentation.  Operates on
//! canonicalised trees, which carry no end tags.

use crate::dxf::node::{AttrValue, Node};
use crate::error::{CamError, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;

fn xml_error(e: impl std::fmt::Display) -> CamError {
    CamError::BadInput(format!("xml: {e}"))
}

fn xml_name(node_name: &str) -> String {
    match node_name.strip_prefix('$') {
        Some(rest) => format!("_{rest}"),
        None => node_name.to_string(),
    }
}

fn node_name(tag: &str) -> String {
    match tag.strip_prefix('_') {
        Some(rest) => format!("${rest}"),
        None => tag.to_string(),
    }
}

/// Serialise a tree (root included) as indented XML.
pub fn tree_to_xml(root: &Node) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, root)?;
    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(xml_error)
}

fn write_element<W: Write>(writer: &mut Writer<W>, node: &Node) -> Result<()> {
    let tag = xml_name(&node.name);
    let mut start = BytesStart::new(tag.clone());
    for (name, value) in &node.attrs {
        match value {
            AttrValue::Scalar(s) => start.push_attribute((name.as_str(), s.as_str())),
            AttrValue::List(values) => {
                let key = format!("{name}-array");
                let joined = values.join(" ");
                start.push_attribute((key.as_str(), joined.as_str()));
            }
        }
    }
    if node.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_error)?;
    } else {
        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        for child in &node.children {
            write_element(writer, child)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(xml_error)?;
    }
    Ok(())
}

/// Parse the XML mirror back into a tree.
pub fn xml_to_tree(xml: &str) -> Result<Node> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(e) => {
                stack.push(element_to_node(&e)?);
            }
            Event::Empty(e) => {
                let node = element_to_node(&e)?;
                attach(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| xml_error("unbalanced end tag"))?;
                attach(&mut stack, &mut root, node);
            }
            // Indentation and prolog noise.
            Event::Text(_) | Event::Decl(_) | Event::Comment(_) | Event::PI(_) => {}
            Event::CData(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error("unterminated element"));
    }
    root.ok_or_else(|| xml_error("empty document"))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

fn element_to_node(element: &BytesStart<'_>) -> Result<Node> {
    let tag = String::from_utf8_lossy(element.name().as_ref()).to_string();
    let mut node = Node::new(node_name(&tag));
    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        let value = attribute.unescape_value().map_err(xml_error)?.to_string();
        match key.strip_suffix("-array") {
            Some(base) => node.set_attr(
                base,
                value
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<String>>(),
            ),
            None => node.set_attr(key, value),
        }
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dxf::parser::parse_str;
    use crate::dxf::transform::canonicalise;

    #[test]
    fn test_header_variable_tag_rewrite() {
        let root = Node::root().with_child(
            Node::new("SECTION")
                .with_attr("name", "HEADER")
                .with_child(Node::new("$ACADVER").with_attr("text", "AC1015")),
        );
        let xml = tree_to_xml(&root).unwrap();
        assert!(xml.contains("<_ACADVER text=\"AC1015\"/>"));

        let back = xml_to_tree(&xml).unwrap();
        assert_eq!(back.children[0].children[0].name, "$ACADVER");
    }

    #[test]
    fn test_list_attributes_join() {
        let root = Node::root().with_child(
            Node::new("LWPOLYLINE")
                .with_attr("x", vec!["0.0".to_string(), "5.0".to_string()])
                .with_attr("y", vec!["1.0".to_string(), "2.0".to_string()]),
        );
        let xml = tree_to_xml(&root).unwrap();
        assert!(xml.contains("x-array=\"0.0 5.0\""));
        assert!(xml.contains("y-array=\"1.0 2.0\""));
    }

    #[test]
    fn test_roundtrip_canonicalised_tree() {
        let input = "0\nSECTION\n2\nENTITIES\n0\nLWPOLYLINE\n90\n2\n70\n1\n10\n0\n20\n0\n10\n5\n20\n5\n0\nLINE\n8\nA\n10\n0\n20\n0\n11\n1\n21\n1\n0\nENDSEC\n0\nEOF\n";
        let mut drawing = parse_str(input).unwrap();
        canonicalise(&mut drawing.root, false, &mut drawing.notifications).unwrap();

        let xml = tree_to_xml(&drawing.root).unwrap();
        let back = xml_to_tree(&xml).unwrap();
        assert_eq!(back, drawing.root);
    }

    #[test]
    fn test_bad_xml_fails() {
        assert!(xml_to_tree("<dxf><SECTION></dxf>").is_err());
        assert!(xml_to_tree("").is_err());
    }
}
