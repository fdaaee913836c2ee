//! Shared test utilities for cammrust integration tests.
//!
//! Fixture builders (DXF text snippets, polyline constructors) and small
//! lookup helpers used across the test crates via `mod common;`.

#![allow(dead_code)]

use cammrust::dxf::Node;
use cammrust::types::{Polyline, Vector2};

/// Build a DXF document string from pre-rendered section bodies.
pub fn dxf_document(sections: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (name, body) in sections {
        out.push_str("0\nSECTION\n2\n");
        out.push_str(name);
        out.push('\n');
        out.push_str(body);
        out.push_str("0\nENDSEC\n");
    }
    out.push_str("0\nEOF\n");
    out
}

/// A LINE entity body.
pub fn line_entity(layer: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> String {
    format!("0\nLINE\n8\n{layer}\n10\n{x0}\n20\n{y0}\n11\n{x1}\n21\n{y1}\n")
}

/// An open LWPOLYLINE entity body.
pub fn lwpolyline_entity(points: &[(f64, f64)], closed: bool) -> String {
    let mut out = format!(
        "0\nLWPOLYLINE\n90\n{}\n70\n{}\n",
        points.len(),
        if closed { 1 } else { 0 }
    );
    for (x, y) in points {
        out.push_str(&format!("10\n{x}\n20\n{y}\n"));
    }
    out
}

/// A CIRCLE entity body.
pub fn circle_entity(cx: f64, cy: f64, r: f64) -> String {
    format!("0\nCIRCLE\n10\n{cx}\n20\n{cy}\n40\n{r}\n")
}

/// Points from coordinate tuples.
pub fn pts(values: &[(f64, f64)]) -> Vec<Vector2> {
    values.iter().map(|&(x, y)| Vector2::new(x, y)).collect()
}

/// An open polyline from coordinate tuples.
pub fn open_polyline(values: &[(f64, f64)]) -> Polyline {
    Polyline::open(pts(values))
}

/// A closed polyline from coordinate tuples.
pub fn closed_polyline(values: &[(f64, f64)]) -> Polyline {
    Polyline::closed(pts(values))
}

/// The named section of a parsed tree.
pub fn section<'a>(root: &'a Node, name: &str) -> Option<&'a Node> {
    root.children
        .iter()
        .find(|c| c.name == "SECTION" && c.attr_str("name") == Some(name))
}

/// Entity kind names inside the ENTITIES section.
pub fn entity_names(root: &Node) -> Vec<String> {
    section(root, "ENTITIES")
        .map(|s| s.children.iter().map(|c| c.name.clone()).collect())
        .unwrap_or_default()
}

/// Assert two points are equal within `tolerance`.
pub fn assert_close(actual: Vector2, expected: Vector2, tolerance: f64) {
    assert!(
        actual.distance(&expected) <= tolerance,
        "expected {expected}, got {actual}"
    );
}
