//! Block flattener
//!
//! Resolves every `INSERT` into transformed copies of the referenced
//! block's entities, honouring per-axis scale, rotation and row/column
//! arrays.  Blocks referencing blocks are expanded depth-first; a block
//! that references itself, directly or through a cycle, is rejected.

use crate::dxf::boil::inherit_general;
use crate::dxf::code;
use crate::dxf::node::Node;
use crate::dxf::walk::{walk_pre, Visit};
use crate::dxf::writer::format_double;
use crate::error::{CamError, Result};
use crate::notification::NotificationCollection;
use crate::types::Vector2;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Block child kinds the flattener knows how to transform.
const SUPPORTED_CHILDREN: &[&str] = &["LINE", "SPLINE", "POINT", "LWPOLYLINE"];

/// The transform applied to each entity of one inserted block copy.
struct InsertTransform {
    anchor: Vector2,
    scale: Vector2,
    /// Rotation in degrees.
    rotation: f64,
    offset: Vector2,
}

impl InsertTransform {
    fn apply(&self, p: Vector2) -> Vector2 {
        let scaled = Vector2::new(
            (p.x - self.anchor.x) * self.scale.x,
            (p.y - self.anchor.y) * self.scale.y,
        );
        let theta = self.rotation.to_radians();
        let (sin, cos) = (theta.sin(), theta.cos());
        let rotated = Vector2::new(
            scaled.x * cos + scaled.y * sin,
            -scaled.x * sin + scaled.y * cos,
        );
        rotated + self.offset
    }
}

/// Flatten every `INSERT` in the drawing.  Afterwards no INSERT survives
/// anywhere; block definitions stay behind (insert-free) for `strip` to
/// empty.
pub fn flatten(root: &mut Node, notifications: &mut NotificationCollection) -> Result<()> {
    let mut blocks = collect_blocks(root);

    let names: Vec<String> = blocks.keys().cloned().collect();
    let mut finished: HashSet<String> = HashSet::new();
    for name in &names {
        expand_block(name, &mut blocks, &mut finished, &mut Vec::new(), notifications)?;
    }

    // Write the expanded definitions back so the BLOCKS subtree obeys the
    // no-INSERT post-condition.
    if let Some(section) = find_section_mut(root, "BLOCKS") {
        for block in &mut section.children {
            if let Some(name) = block.attr_str("name") {
                if let Some(expanded) = blocks.get(name) {
                    block.children = expanded.children.clone();
                }
            }
        }
    }

    if let Some(section) = find_section_mut(root, "ENTITIES") {
        walk_pre(section, &mut |node| {
            if node.name == "INSERT" {
                Ok(Visit::Replace(expand_insert(node, &blocks, notifications)?))
            } else {
                Ok(Visit::Keep)
            }
        })?;
    }
    Ok(())
}

fn find_section_mut<'a>(root: &'a mut Node, name: &str) -> Option<&'a mut Node> {
    root.children
        .iter_mut()
        .find(|c| c.name == "SECTION" && c.attr_str("name") == Some(name))
}

fn collect_blocks(root: &Node) -> IndexMap<String, Node> {
    let mut blocks = IndexMap::new();
    let section = root
        .children
        .iter()
        .find(|c| c.name == "SECTION" && c.attr_str("name") == Some("BLOCKS"));
    if let Some(section) = section {
        for block in &section.children {
            if block.name == "BLOCK" {
                if let Some(name) = block.attr_str("name") {
                    blocks.insert(name.to_string(), block.clone());
                }
            }
        }
    }
    blocks
}

/// Expand the INSERTs inside one block definition, recursing into the
/// blocks it references first.  `in_progress` detects reference cycles.
fn expand_block(
    name: &str,
    blocks: &mut IndexMap<String, Node>,
    finished: &mut HashSet<String>,
    in_progress: &mut Vec<String>,
    notifications: &mut NotificationCollection,
) -> Result<()> {
    if finished.contains(name) {
        return Ok(());
    }
    if in_progress.iter().any(|n| n == name) {
        return Err(CamError::NotImplemented(format!(
            "recursive INSERT of block '{}'",
            name
        )));
    }
    in_progress.push(name.to_string());

    let children = match blocks.get(name) {
        Some(block) => block.children.clone(),
        None => {
            in_progress.pop();
            return Ok(());
        }
    };

    let mut expanded = Vec::with_capacity(children.len());
    for child in children {
        if child.name == "INSERT" {
            if let Some(reference) = child.attr_str("name").map(str::to_string) {
                expand_block(&reference, blocks, finished, in_progress, notifications)?;
            }
            expanded.extend(expand_insert(&child, blocks, notifications)?);
        } else {
            expanded.push(child);
        }
    }

    if let Some(block) = blocks.get_mut(name) {
        block.children = expanded;
    }
    in_progress.pop();
    finished.insert(name.to_string());
    Ok(())
}

/// Expand one INSERT into transformed entity copies.
fn expand_insert(
    insert: &Node,
    blocks: &IndexMap<String, Node>,
    notifications: &mut NotificationCollection,
) -> Result<Vec<Node>> {
    let Some(name) = insert.attr_str("name") else {
        notifications.warn("dropping INSERT without a block name");
        return Ok(Vec::new());
    };
    let Some(block) = blocks.get(name) else {
        notifications.warn(format!("dropping INSERT of unknown block '{}'", name));
        return Ok(Vec::new());
    };

    let anchor = block.point()?;
    let insert_point = insert.point()?;
    let scale = Vector2::new(
        insert.f64_or("float1", 1.0)?,
        insert.f64_or("float2", 1.0)?,
    );
    let rotation = insert.f64_or("angle", 0.0)?;
    let columns = insert.i64_or("int", 1)?.max(1);
    let rows = insert.i64_or("int1", 1)?.max(1);
    let col_spacing = insert.f64_or("float4", 0.0)?;
    let row_spacing = insert.f64_or("float5", 0.0)?;

    let mut expanded = Vec::new();
    for row in 0..rows {
        for col in 0..columns {
            let transform = InsertTransform {
                anchor,
                scale,
                rotation,
                offset: insert_point
                    + Vector2::new(col as f64 * col_spacing, row as f64 * row_spacing),
            };
            for child in &block.children {
                if !SUPPORTED_CHILDREN.contains(&child.name.as_str()) {
                    return Err(CamError::NotImplemented(format!(
                        "{} inside block '{}'",
                        child.name, name
                    )));
                }
                if !child.children.is_empty() {
                    return Err(CamError::NotImplemented(format!(
                        "{} inside block '{}' has child nodes",
                        child.name, name
                    )));
                }
                let mut entity = child.clone();
                transform_entity(&mut entity, &transform)?;
                inherit_general(insert, &mut entity);
                expanded.push(entity);
            }
        }
    }
    Ok(expanded)
}

/// Transform every coordinate slot of an entity, per point index for
/// parallel lists.
fn transform_entity(entity: &mut Node, transform: &InsertTransform) -> Result<()> {
    for slot in 0..9 {
        let x_name = code::attr_name(10 + slot);
        let y_name = code::attr_name(20 + slot);
        if entity.attr(&x_name).is_none() && entity.attr(&y_name).is_none() {
            continue;
        }
        let xs = entity.attr_f64_list(&x_name)?;
        let ys = entity.attr_f64_list(&y_name)?;
        let count = xs.len().max(ys.len());
        let mut new_xs = Vec::with_capacity(count);
        let mut new_ys = Vec::with_capacity(count);
        for i in 0..count {
            let p = Vector2::new(
                xs.get(i).copied().unwrap_or(0.0),
                ys.get(i).copied().unwrap_or(0.0),
            );
            let t = transform.apply(p);
            new_xs.push(format_double(t.x));
            new_ys.push(format_double(t.y));
        }
        if count == 1 {
            entity.set_attr(x_name, new_xs.remove(0));
            entity.set_attr(y_name, new_ys.remove(0));
        } else {
            entity.set_attr(x_name, new_xs);
            entity.set_attr(y_name, new_ys);
        }
    }
    Ok(())
}
