//! Entity rewriter ("boil-down")
//!
//! Rewrites high-level entities into a chosen primitive set by chaining
//! pair-wise conversions.  The chain for each kind is found by a
//! breadth-first search from the acceptable set over the reversed
//! conversion graph, so every rewritten entity takes a shortest path.

use crate::dxf::code::GENERAL_ATTRS;
use crate::dxf::extract::{lwpolyline_geometry, lwpolyline_node, PolyFlags};
use crate::dxf::node::Node;
use crate::dxf::walk::{walk_pre, Visit};
use crate::dxf::writer::format_double;
use crate::error::{CamError, Result};
use crate::types::Vector2;
use std::collections::{HashMap, VecDeque};
use std::f64::consts::TAU;

type Converter = fn(&Node) -> Result<Vec<Node>>;

/// One edge of the conversion graph.
pub struct Conversion {
    pub from: &'static str,
    pub to: &'static str,
    convert: Converter,
}

/// Number of sample steps per cubic Bézier segment.
const SPLINE_STEPS: usize = 20;

static CONVERSIONS: &[Conversion] = &[
    Conversion {
        from: "SPLINE",
        to: "LWPOLYLINE",
        convert: spline_to_lwpolyline,
    },
    Conversion {
        from: "POLYLINE",
        to: "LWPOLYLINE",
        convert: polyline_to_lwpolyline,
    },
    Conversion {
        from: "ELLIPSE",
        to: "LWPOLYLINE",
        convert: ellipse_to_lwpolyline,
    },
    Conversion {
        from: "LINE",
        to: "LWPOLYLINE",
        convert: line_to_lwpolyline,
    },
    Conversion {
        from: "ARC",
        to: "ELLIPSE",
        convert: arc_to_ellipse,
    },
    Conversion {
        from: "CIRCLE",
        to: "ARC",
        convert: circle_to_arc,
    },
    Conversion {
        from: "LWPOLYLINE",
        to: "LINE",
        convert: lwpolyline_to_lines,
    },
];

/// Entity kinds that appear somewhere in the conversion graph.
pub fn graph_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<&'static str> = Vec::new();
    for c in CONVERSIONS {
        for kind in [c.from, c.to] {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }
    kinds
}

/// For every kind reachable into the acceptable set, the first conversion
/// of its shortest chain.  BFS from the acceptable kinds over reversed
/// edges; deterministic given the order of `acceptable`.
fn next_hops(acceptable: &[&str]) -> HashMap<&'static str, &'static Conversion> {
    let mut next: HashMap<&'static str, &'static Conversion> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut reached: Vec<&str> = Vec::new();

    for &kind in acceptable {
        if !reached.contains(&kind) {
            reached.push(kind);
            queue.push_back(kind);
        }
    }
    while let Some(kind) = queue.pop_front() {
        for conversion in CONVERSIONS {
            if conversion.to == kind && !reached.contains(&conversion.from) {
                reached.push(conversion.from);
                next.insert(conversion.from, conversion);
                queue.push_back(conversion.from);
            }
        }
    }
    next
}

/// The shortest conversion chain from `kind` into the acceptable set, or
/// `None` when unreachable.  An already-acceptable kind has an empty chain.
pub fn conversion_chain(
    kind: &str,
    acceptable: &[&str],
) -> Option<Vec<&'static Conversion>> {
    if acceptable.contains(&kind) {
        return Some(Vec::new());
    }
    let next = next_hops(acceptable);
    let mut chain = Vec::new();
    let mut current = kind;
    while !acceptable.contains(&current) {
        let hop = *next.get(current)?;
        chain.push(hop);
        current = hop.to;
    }
    Some(chain)
}

/// Rewrite every entity of a to-replace kind, in the ENTITIES section and
/// inside every BLOCK, into acceptable kinds.
pub fn boil_down(root: &mut Node, acceptable: &[&str], to_replace: &[&str]) -> Result<()> {
    let mut chains: HashMap<&str, Vec<&'static Conversion>> = HashMap::new();
    let mut unresolved: Vec<&str> = Vec::new();
    for &kind in to_replace {
        match conversion_chain(kind, acceptable) {
            Some(chain) => {
                chains.insert(kind, chain);
            }
            None => unresolved.push(kind),
        }
    }
    if !unresolved.is_empty() {
        return Err(CamError::UnsupportedEntity(unresolved.join(", ")));
    }

    for child in &mut root.children {
        if child.name != "SECTION" {
            continue;
        }
        match child.attr_str("name") {
            Some("ENTITIES") => rewrite_children(child, &chains)?,
            Some("BLOCKS") => {
                for block in &mut child.children {
                    rewrite_children(block, &chains)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Boil down every convertible entity present in the tree that is not
/// already acceptable.  Kinds outside the conversion graph are left alone.
pub fn boil_down_tree(root: &mut Node, acceptable: &[&str]) -> Result<()> {
    let known = graph_kinds();
    let mut present: Vec<&str> = Vec::new();
    collect_present(root, &known, &mut present);
    let to_replace: Vec<&str> = present
        .into_iter()
        .filter(|kind| !acceptable.contains(kind))
        .collect();
    boil_down(root, acceptable, &to_replace)
}

fn collect_present<'a>(root: &Node, known: &[&'a str], present: &mut Vec<&'a str>) {
    for child in &root.children {
        if child.name != "SECTION" {
            continue;
        }
        let in_blocks = child.attr_str("name") == Some("BLOCKS");
        if !in_blocks && child.attr_str("name") != Some("ENTITIES") {
            continue;
        }
        for entity in &child.children {
            let scan: &[Node] = if in_blocks {
                &entity.children
            } else {
                std::slice::from_ref(entity)
            };
            for node in scan {
                if let Some(kind) = known.iter().copied().find(|k| *k == node.name) {
                    if !present.contains(&kind) {
                        present.push(kind);
                    }
                }
            }
        }
    }
}

fn rewrite_children(
    parent: &mut Node,
    chains: &HashMap<&str, Vec<&'static Conversion>>,
) -> Result<()> {
    walk_pre(parent, &mut |node| {
        match chains.get(node.name.as_str()) {
            Some(chain) if !chain.is_empty() => {
                Ok(Visit::Replace(apply_chain(node, chain)?))
            }
            _ => Ok(Visit::Keep),
        }
    })
}

fn apply_chain(node: &Node, chain: &[&Conversion]) -> Result<Vec<Node>> {
    let mut current = vec![node.clone()];
    for step in chain {
        let mut next = Vec::new();
        for entity in current {
            if entity.name == step.from {
                for mut replacement in (step.convert)(&entity)? {
                    inherit_general(&entity, &mut replacement);
                    next.push(replacement);
                }
            } else {
                next.push(entity);
            }
        }
        current = next;
    }
    Ok(current)
}

/// Copy the general attributes of `from` onto `to`, keeping values `to`
/// already carries.
pub fn inherit_general(from: &Node, to: &mut Node) {
    for name in GENERAL_ATTRS {
        if to.attr(name).is_none() {
            if let Some(value) = from.attr(name) {
                to.set_attr(*name, value.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------
// Converters
// ---------------------------------------------------------------------

fn copy_attrs(from: &Node, to: &mut Node, names: &[&str]) {
    for name in names {
        if let Some(value) = from.attr(name) {
            to.set_attr(*name, value.clone());
        }
    }
}

/// LINE → 2-point LWPOLYLINE.
fn line_to_lwpolyline(node: &Node) -> Result<Vec<Node>> {
    let p0 = Vector2::new(node.f64_or("x", 0.0)?, node.f64_or("y", 0.0)?);
    let p1 = Vector2::new(node.f64_or("x1", 0.0)?, node.f64_or("y1", 0.0)?);
    Ok(vec![lwpolyline_node(&[p0, p1], false)])
}

/// CIRCLE → full-sweep ARC.
fn circle_to_arc(node: &Node) -> Result<Vec<Node>> {
    let mut arc = Node::new("ARC");
    copy_attrs(node, &mut arc, &["x", "y", "z", "float"]);
    arc.set_attr("angle", "0.0");
    arc.set_attr("angle1", "360.0");
    Ok(vec![arc])
}

/// ARC → ELLIPSE with a degenerate axis ratio of 1 and radian angles.
fn arc_to_ellipse(node: &Node) -> Result<Vec<Node>> {
    let radius = node.f64_or("float", 0.0)?;
    let start = node.f64_or("angle", 0.0)?.to_radians();
    let end = node.f64_or("angle1", 360.0)?.to_radians();

    let mut ellipse = Node::new("ELLIPSE");
    copy_attrs(node, &mut ellipse, &["x", "y", "z"]);
    ellipse.set_attr("x1", format_double(radius));
    ellipse.set_attr("y1", "0.0");
    ellipse.set_attr("float", "1.0");
    ellipse.set_attr("float1", format_double(start));
    ellipse.set_attr("float2", format_double(end));
    Ok(vec![ellipse])
}

/// ELLIPSE → sampled LWPOLYLINE.
fn ellipse_to_lwpolyline(node: &Node) -> Result<Vec<Node>> {
    let center = node.point()?;
    let major = Vector2::new(node.f64_or("x1", 0.0)?, node.f64_or("y1", 0.0)?);
    let ratio = node.f64_or("float", 1.0)?;
    let start = node.f64_or("float1", 0.0)?;
    let mut end = node.f64_or("float2", TAU)?;

    // Normalise the end parameter into (start, start + 2π + ε]; a
    // coincident end means a full turn.
    let eps = 1e-9;
    while end <= start + eps {
        end += TAU;
    }
    while end > start + TAU + eps {
        end -= TAU;
    }
    let closed = end - start >= TAU - eps;

    let minor = major.perp() * ratio;
    let r1 = major.length();
    let segments = (((end - start) * r1).ceil() as usize).max(20);

    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = start + (end - start) * (i as f64) / (segments as f64);
        points.push(center + major * t.cos() + minor * t.sin());
    }
    if closed {
        // The full-turn endpoint coincides up to rounding; make it exact.
        points[segments] = points[0];
    }
    Ok(vec![lwpolyline_node(&points, closed)])
}

/// SPLINE → LWPOLYLINE by sampling each 4-control-point cubic Bézier
/// segment in `SPLINE_STEPS` uniform steps.
fn spline_to_lwpolyline(node: &Node) -> Result<Vec<Node>> {
    let degree = node.i64_or("int1", 3)?;
    if degree != 3 {
        return Err(CamError::NotImplemented(format!(
            "SPLINE of degree {} (only cubic supported)",
            degree
        )));
    }
    let xs = node.attr_f64_list("x")?;
    let ys = node.attr_f64_list("y")?;
    if xs.len() != ys.len() {
        return Err(CamError::InvalidPolyline(format!(
            "SPLINE has {} x values but {} y values",
            xs.len(),
            ys.len()
        )));
    }
    let control: Vec<Vector2> = xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Vector2::new(x, y))
        .collect();
    if control.len() < 4 || (control.len() - 1) % 3 != 0 {
        return Err(CamError::BadInput(format!(
            "SPLINE control point count {} does not form cubic segments",
            control.len()
        )));
    }
    let flags = PolyFlags::from_bits_truncate(node.i64_or("int", 0)?);
    let closed = flags.contains(PolyFlags::CLOSED);

    let mut points = vec![control[0]];
    for segment in control.windows(4).step_by(3) {
        for i in 1..=SPLINE_STEPS {
            let t = (i as f64) / (SPLINE_STEPS as f64);
            points.push(cubic_bezier(segment, t));
        }
    }
    Ok(vec![lwpolyline_node(&points, closed)])
}

fn cubic_bezier(p: &[Vector2], t: f64) -> Vector2 {
    let u = 1.0 - t;
    p[0] * (u * u * u)
        + p[1] * (3.0 * u * u * t)
        + p[2] * (3.0 * u * t * t)
        + p[3] * (t * t * t)
}

/// POLYLINE → LWPOLYLINE by copying the VERTEX children.
fn polyline_to_lwpolyline(node: &Node) -> Result<Vec<Node>> {
    let mut points = Vec::with_capacity(node.children.len());
    for child in &node.children {
        if child.name != "VERTEX" {
            return Err(CamError::NotImplemented(format!(
                "{} child under POLYLINE",
                child.name
            )));
        }
        points.push(child.point()?);
    }
    if points.is_empty() {
        return Err(CamError::InvalidPolyline("POLYLINE without vertices".into()));
    }
    let flags = PolyFlags::from_bits_truncate(node.i64_or("int", 0)?);
    Ok(vec![lwpolyline_node(
        &points,
        flags.contains(PolyFlags::CLOSED),
    )])
}

/// LWPOLYLINE → consecutive-pair LINE fan-out.
fn lwpolyline_to_lines(node: &Node) -> Result<Vec<Node>> {
    let (mut points, closed) = lwpolyline_geometry(node)?;
    if closed {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if first != last {
                points.push(*first);
            }
        }
    }
    let lines = points
        .windows(2)
        .map(|pair| {
            let mut line = Node::new("LINE");
            line.set_attr("x", format_double(pair[0].x));
            line.set_attr("y", format_double(pair[0].y));
            line.set_attr("x1", format_double(pair[1].x));
            line.set_attr("y1", format_double(pair[1].y));
            line
        })
        .collect();
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dxf::parser::parse_str;

    fn entities(root: &Node) -> &Vec<Node> {
        &root
            .children
            .iter()
            .find(|c| c.name == "SECTION" && c.attr_str("name") == Some("ENTITIES"))
            .expect("no ENTITIES section")
            .children
    }

    #[test]
    fn test_chain_for_circle_to_line() {
        let chain = conversion_chain("CIRCLE", &["POINT", "LINE"]).unwrap();
        let steps: Vec<(&str, &str)> = chain.iter().map(|c| (c.from, c.to)).collect();
        assert_eq!(
            steps,
            [
                ("CIRCLE", "ARC"),
                ("ARC", "ELLIPSE"),
                ("ELLIPSE", "LWPOLYLINE"),
                ("LWPOLYLINE", "LINE"),
            ]
        );
    }

    #[test]
    fn test_chain_for_acceptable_kind_is_empty() {
        assert!(conversion_chain("LINE", &["LINE"]).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_kind_fails() {
        // Nothing converts into POINT, so a POLYLINE cannot reach it.
        let mut drawing = parse_str(
            "0\nSECTION\n2\nENTITIES\n0\nPOLYLINE\n0\nVERTEX\n10\n0\n20\n0\n0\nSEQEND\n0\nENDSEC\n0\nEOF\n",
        )
        .unwrap();
        let result = boil_down(&mut drawing.root, &["POINT"], &["POLYLINE"]);
        assert!(matches!(result, Err(CamError::UnsupportedEntity(k)) if k.contains("POLYLINE")));
    }

    #[test]
    fn test_line_boildown_to_lwpolyline() {
        let mut drawing = parse_str(
            "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\nA\n10\n0\n20\n0\n11\n100\n21\n50\n0\nENDSEC\n0\nEOF\n",
        )
        .unwrap();
        boil_down_tree(&mut drawing.root, &["POINT", "LWPOLYLINE"]).unwrap();
        let ents = entities(&drawing.root);
        assert_eq!(ents.len(), 1);
        let lw = &ents[0];
        assert_eq!(lw.name, "LWPOLYLINE");
        assert_eq!(lw.attr_f64_list("x").unwrap(), vec![0.0, 100.0]);
        assert_eq!(lw.attr_f64_list("y").unwrap(), vec![0.0, 50.0]);
        // layer inherited from the original line
        assert_eq!(lw.attr_str("layer"), Some("A"));
    }

    #[test]
    fn test_circle_to_lines_scenario() {
        let mut drawing = parse_str(
            "0\nSECTION\n2\nENTITIES\n0\nCIRCLE\n10\n0\n20\n0\n40\n10\n0\nENDSEC\n0\nEOF\n",
        )
        .unwrap();
        boil_down_tree(&mut drawing.root, &["POINT", "LINE"]).unwrap();
        let ents = entities(&drawing.root);
        assert!(ents.len() >= 20);
        assert!(ents.iter().all(|e| e.name == "LINE"));

        // Every vertex lies on the radius-10 circle.
        for line in ents.iter() {
            for (xa, ya) in [("x", "y"), ("x1", "y1")] {
                let p = Vector2::new(
                    line.attr_f64(xa).unwrap().unwrap(),
                    line.attr_f64(ya).unwrap().unwrap(),
                );
                assert!((p.length() - 10.0).abs() < 1e-6, "off-circle point {p}");
            }
        }

        // The fan-out closes exactly.
        let first = entities(&drawing.root).first().unwrap();
        let last = entities(&drawing.root).last().unwrap();
        assert_eq!(first.attr_str("x"), last.attr_str("x1"));
        assert_eq!(first.attr_str("y"), last.attr_str("y1"));
    }

    #[test]
    fn test_arc_endpoint_exactness() {
        // 90°..180° arc of radius 5 at (2, 3).
        let arc = Node::new("ARC")
            .with_attr("x", "2.0")
            .with_attr("y", "3.0")
            .with_attr("float", "5.0")
            .with_attr("angle", "90.0")
            .with_attr("angle1", "180.0");
        let ellipse = arc_to_ellipse(&arc).unwrap().remove(0);
        let lw = ellipse_to_lwpolyline(&ellipse).unwrap().remove(0);
        let (points, closed) = lwpolyline_geometry(&lw).unwrap();
        assert!(!closed);

        let start = points.first().unwrap();
        let end = points.last().unwrap();
        let expect_start = Vector2::new(2.0 + 5.0 * (90f64).to_radians().cos(),
                                        3.0 + 5.0 * (90f64).to_radians().sin());
        let expect_end = Vector2::new(2.0 + 5.0 * (180f64).to_radians().cos(),
                                      3.0 + 5.0 * (180f64).to_radians().sin());
        assert!(start.distance(&expect_start) < 1e-9);
        assert!(end.distance(&expect_end) < 1e-9);
    }

    #[test]
    fn test_spline_sampling() {
        let spline = Node::new("SPLINE")
            .with_attr("int1", "3")
            .with_attr(
                "x",
                vec!["0".to_string(), "1".into(), "2".into(), "3".into()],
            )
            .with_attr(
                "y",
                vec!["0".to_string(), "1".into(), "1".into(), "0".into()],
            );
        let lw = spline_to_lwpolyline(&spline).unwrap().remove(0);
        let (points, closed) = lwpolyline_geometry(&lw).unwrap();
        assert!(!closed);
        assert_eq!(points.len(), 21);
        assert_eq!(points[0], Vector2::new(0.0, 0.0));
        assert_eq!(points[20], Vector2::new(3.0, 0.0));
        // Midpoint of this symmetric curve sits at x = 1.5.
        assert!((points[10].x - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_spline_wrong_degree() {
        let spline = Node::new("SPLINE").with_attr("int1", "2");
        assert!(matches!(
            spline_to_lwpolyline(&spline),
            Err(CamError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_polyline_vertices_copied() {
        let drawing = parse_str(
            "0\nSECTION\n2\nENTITIES\n0\nPOLYLINE\n70\n1\n0\nVERTEX\n10\n0\n20\n0\n0\nVERTEX\n10\n4\n20\n0\n0\nVERTEX\n10\n4\n20\n4\n0\nSEQEND\n0\nENDSEC\n0\nEOF\n",
        )
        .unwrap();
        let polyline = &entities(&drawing.root)[0];
        let lw = polyline_to_lwpolyline(polyline).unwrap().remove(0);
        let (points, closed) = lwpolyline_geometry(&lw).unwrap();
        assert!(closed);
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Vector2::new(4.0, 4.0));
    }
}
