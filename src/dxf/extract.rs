//! Polyline extraction
//!
//! Pulls `LWPOLYLINE` geometry out of the ENTITIES section into the
//! uniform polyline list the post-processor works on.  Run after boil-down
//! so nothing but points and light-weight polylines is left.

use crate::dxf::node::Node;
use crate::error::{CamError, Result};
use crate::notification::NotificationCollection;
use crate::types::{Polyline, Vector2};
use bitflags::bitflags;

bitflags! {
    /// `LWPOLYLINE`/`POLYLINE` flag word (group code 70).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PolyFlags: i64 {
        const CLOSED = 1;
        const PLINEGEN = 128;
    }
}

/// Read the parallel coordinate arrays and closed flag of an `LWPOLYLINE`
/// (also used for the node shapes boil-down produces).
pub fn lwpolyline_geometry(node: &Node) -> Result<(Vec<Vector2>, bool)> {
    let xs = node.attr_f64_list("x")?;
    let ys = node.attr_f64_list("y")?;
    if xs.len() != ys.len() {
        return Err(CamError::InvalidPolyline(format!(
            "{} x values but {} y values",
            xs.len(),
            ys.len()
        )));
    }
    if xs.is_empty() {
        return Err(CamError::InvalidPolyline("no points".into()));
    }
    let points = xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Vector2::new(x, y))
        .collect();
    let flags = PolyFlags::from_bits_truncate(node.i64_or("int", 0)?);
    Ok((points, flags.contains(PolyFlags::CLOSED)))
}

/// Build an `LWPOLYLINE` node from points.
pub fn lwpolyline_node(points: &[Vector2], closed: bool) -> Node {
    use crate::dxf::writer::format_double;

    let mut node = Node::new("LWPOLYLINE");
    node.set_attr("int_32", format!("{}", points.len()));
    let flags = if closed { PolyFlags::CLOSED } else { PolyFlags::empty() };
    node.set_attr("int", format!("{}", flags.bits()));
    node.set_attr(
        "x",
        points.iter().map(|p| format_double(p.x)).collect::<Vec<_>>(),
    );
    node.set_attr(
        "y",
        points.iter().map(|p| format_double(p.y)).collect::<Vec<_>>(),
    );
    node
}

/// Extract every `LWPOLYLINE` in the ENTITIES section as a `Polyline`.
/// Other surviving entity kinds are skipped with a warning.
pub fn extract_polylines(
    root: &Node,
    notifications: &mut NotificationCollection,
) -> Result<Vec<Polyline>> {
    let mut polylines = Vec::new();
    let entities = root
        .children
        .iter()
        .find(|c| c.name == "SECTION" && c.attr_str("name") == Some("ENTITIES"));

    let Some(entities) = entities else {
        return Ok(polylines);
    };

    for entity in &entities.children {
        if entity.name == "LWPOLYLINE" {
            let (points, closed) = lwpolyline_geometry(entity)?;
            polylines.push(Polyline { closed, points });
        } else {
            notifications.warn(format!(
                "skipping {} entity during polyline extraction",
                entity.name
            ));
        }
    }

    Ok(polylines)
}
