//! Whole-tree operations: canonicalise, strip, filter
//!
//! These rewrite the section layout of a parsed drawing so later stages
//! can rely on a fixed shape.

use crate::dxf::node::Node;
use crate::dxf::walk::{walk_pre, Visit};
use crate::error::{CamError, Result};
use crate::notification::NotificationCollection;
use std::collections::BTreeSet;

/// The sections of a canonical drawing, in order.
pub const CANONICAL_SECTIONS: &[&str] = &[
    "HEADER", "CLASSES", "TABLES", "BLOCKS", "ENTITIES", "OBJECTS",
];

/// Version written into a synthesised minimal HEADER.
const DEFAULT_ACADVER: &str = "AC1015";

fn section_name(node: &Node) -> Option<&str> {
    if node.name == "SECTION" {
        node.attr_str("name")
    } else {
        None
    }
}

/// Build an empty `SECTION` node.
pub fn empty_section(name: &str) -> Node {
    Node::new("SECTION").with_attr("name", name)
}

/// Ensure the root carries exactly the canonical sections in order,
/// merging duplicates (or failing on them in strict mode), synthesising a
/// minimal HEADER, and dropping all stored end tags.
pub fn canonicalise(
    root: &mut Node,
    strict: bool,
    notifications: &mut NotificationCollection,
) -> Result<()> {
    let mut sections: Vec<Option<Node>> = vec![None; CANONICAL_SECTIONS.len()];

    for child in root.children.drain(..) {
        let name = match section_name(&child) {
            Some(name) => name.to_string(),
            None => {
                notifications.warn(format!(
                    "dropping stray root child '{}' during canonicalisation",
                    child.name
                ));
                continue;
            }
        };
        let Some(index) = CANONICAL_SECTIONS.iter().position(|s| *s == name) else {
            notifications.warn(format!("dropping unknown section '{}'", name));
            continue;
        };
        match &mut sections[index] {
            slot @ None => *slot = Some(child),
            Some(existing) => {
                if strict {
                    return Err(CamError::DuplicateSection(name));
                }
                notifications.warn(format!("merging duplicate section '{}'", name));
                existing.children.extend(child.children);
            }
        }
    }

    for (index, canonical) in CANONICAL_SECTIONS.iter().enumerate() {
        let mut section = sections[index]
            .take()
            .unwrap_or_else(|| empty_section(canonical));
        if *canonical == "HEADER" && section.find_child("$ACADVER").is_none() {
            section
                .children
                .insert(0, Node::new("$ACADVER").with_attr("text", DEFAULT_ACADVER));
        }
        root.children.push(section);
    }

    root.drop_end_tags();
    Ok(())
}

/// Delete CLASSES and TABLES, empty BLOCKS and OBJECTS, and remove the
/// `comment` attribute from every node.
pub fn strip(root: &mut Node) -> Result<()> {
    root.children.retain(|child| {
        !matches!(section_name(child), Some("CLASSES") | Some("TABLES"))
    });
    for child in &mut root.children {
        if matches!(section_name(child), Some("BLOCKS") | Some("OBJECTS")) {
            child.children.clear();
        }
    }
    strip_comments(root);
    Ok(())
}

fn strip_comments(node: &mut Node) {
    node.remove_attr("comment");
    if let Some(end) = &mut node.end_tag {
        end.remove_attr("comment");
    }
    for child in &mut node.children {
        strip_comments(child);
    }
}

/// An entity filter criterion.
pub enum Criterion {
    /// Keep or drop by entity kind.
    Kinds {
        names: BTreeSet<String>,
        include: bool,
    },
    /// Keep entities for which the predicate returns true.
    Predicate(Box<dyn FnMut(&str, &Node) -> bool>),
}

impl Criterion {
    /// Parse a textual criterion: a comma-separated kind list with an
    /// optional `+` (keep only these) or `-` (drop these, the default)
    /// prefix.
    pub fn parse(input: &str) -> Result<Criterion> {
        let (include, rest) = match input.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('-').unwrap_or(input)),
        };
        let names: BTreeSet<String> = rest
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_uppercase())
            .collect();
        if names.is_empty() {
            return Err(CamError::InvalidArgument(format!(
                "empty filter criterion '{}'",
                input
            )));
        }
        Ok(Criterion::Kinds { names, include })
    }

    fn keep(&mut self, name: &str, node: &Node) -> bool {
        match self {
            Criterion::Kinds { names, include } => names.contains(name) == *include,
            Criterion::Predicate(pred) => pred(name, node),
        }
    }
}

/// Remove entities not matching the criterion from the BLOCKS, ENTITIES
/// and OBJECTS sections (inside each BLOCK wrapper for BLOCKS).
pub fn filter_entities(root: &mut Node, mut criterion: Criterion) -> Result<()> {
    for child in &mut root.children {
        match section_name(child) {
            Some("ENTITIES") | Some("OBJECTS") => {
                filter_children(child, &mut criterion)?;
            }
            Some("BLOCKS") => {
                for block in &mut child.children {
                    filter_children(block, &mut criterion)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn filter_children(parent: &mut Node, criterion: &mut Criterion) -> Result<()> {
    walk_pre(parent, &mut |node| {
        if criterion.keep(&node.name, node) {
            Ok(Visit::Keep)
        } else {
            Ok(Visit::Replace(Vec::new()))
        }
    })
}

/// Keep or drop entities by their `layer` attribute.
pub fn filter_by_layer(root: &mut Node, layers: &[String], include: bool) -> Result<()> {
    let wanted: BTreeSet<String> = layers.iter().cloned().collect();
    filter_entities(
        root,
        Criterion::Predicate(Box::new(move |_, node| {
            let on_listed = node
                .attr_str("layer")
                .map(|l| wanted.contains(l))
                .unwrap_or(false);
            on_listed == include
        })),
    )
}

/// Keep or drop entities by their `color` attribute.
pub fn filter_by_color(root: &mut Node, colors: &[i64], include: bool) -> Result<()> {
    let wanted: BTreeSet<i64> = colors.iter().copied().collect();
    filter_entities(
        root,
        Criterion::Predicate(Box::new(move |_, node| {
            let on_listed = node
                .attr_i64("color")
                .ok()
                .flatten()
                .map(|c| wanted.contains(&c))
                .unwrap_or(false);
            on_listed == include
        })),
    )
}
