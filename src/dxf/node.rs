//! Attributed tree model for DXF documents
//!
//! Values are kept as strings for lossless round-trips; numeric parsing is
//! deferred to the accessors, which enforce a strict float grammar.

use crate::dxf::code::{self, HEADER_VARIABLE, NODE_START};
use crate::error::{CamError, Result};
use crate::types::Vector2;
use indexmap::IndexMap;

/// A node attribute: a single value or an ordered list.
///
/// Repeated group codes promote a scalar to a list; accessors normalise on
/// read so callers never care which shape is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Scalar(String),
    List(Vec<String>),
}

impl AttrValue {
    /// All values, a one-element slice for scalars.
    pub fn values(&self) -> &[String] {
        match self {
            AttrValue::Scalar(s) => std::slice::from_ref(s),
            AttrValue::List(v) => v,
        }
    }

    /// The first value.
    pub fn first(&self) -> &str {
        match self {
            AttrValue::Scalar(s) => s,
            AttrValue::List(v) => v.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            AttrValue::Scalar(_) => 1,
            AttrValue::List(v) => v.len(),
        }
    }

    /// True when no values are stored (only possible for an empty list).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value, promoting a scalar to a list.
    pub fn push(&mut self, value: String) {
        match self {
            AttrValue::Scalar(s) => {
                let first = std::mem::take(s);
                *self = AttrValue::List(vec![first, value]);
            }
            AttrValue::List(v) => v.push(value),
        }
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Scalar(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Scalar(s.to_string())
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(v: Vec<String>) -> Self {
        AttrValue::List(v)
    }
}

/// A node in the DXF tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    /// Node name; header variables keep their `$` prefix.
    pub name: String,
    /// Attribute map, keyed by alias name.
    pub attrs: IndexMap<String, AttrValue>,
    /// Ordered child nodes.
    pub children: Vec<Node>,
    /// The paired terminator (`ENDSEC`, `ENDBLK`, ...) with its attributes,
    /// when one was present and not canonicalised away.
    pub end_tag: Option<Box<Node>>,
}

impl Node {
    /// Create a node with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            ..Node::default()
        }
    }

    /// Create the synthetic document root.
    pub fn root() -> Self {
        Node::new(code::ROOT_NAME)
    }

    /// Group code used when emitting this node's name line.
    pub fn group_code(&self) -> i32 {
        if self.name.starts_with('$') {
            HEADER_VARIABLE
        } else {
            NODE_START
        }
    }

    /// Append a value under `name`, promoting to a list on repetition.
    pub fn push_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                self.attrs.insert(name, AttrValue::Scalar(value));
            }
        }
    }

    /// Replace the attribute wholesale.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Remove an attribute, returning it if present.
    pub fn remove_attr(&mut self, name: &str) -> Option<AttrValue> {
        self.attrs.shift_remove(name)
    }

    /// Attribute lookup.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// First value of an attribute as a string slice.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(AttrValue::first)
    }

    /// First value of an attribute parsed as a float.
    pub fn attr_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.attr_str(name) {
            Some(s) => parse_double(s).map(Some),
            None => Ok(None),
        }
    }

    /// First value parsed as a float, with a default when absent.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        Ok(self.attr_f64(name)?.unwrap_or(default))
    }

    /// First value of an attribute parsed as an integer.
    pub fn attr_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.attr_str(name) {
            Some(s) => parse_int(s).map(Some),
            None => Ok(None),
        }
    }

    /// First value parsed as an integer, with a default when absent.
    pub fn i64_or(&self, name: &str, default: i64) -> Result<i64> {
        Ok(self.attr_i64(name)?.unwrap_or(default))
    }

    /// All values of an attribute parsed as floats; empty when absent.
    pub fn attr_f64_list(&self, name: &str) -> Result<Vec<f64>> {
        match self.attr(name) {
            Some(value) => value.values().iter().map(|s| parse_double(s)).collect(),
            None => Ok(Vec::new()),
        }
    }

    /// The `(x, y)` point stored under the primary coordinate codes.
    pub fn point(&self) -> Result<Vector2> {
        Ok(Vector2::new(self.f64_or("x", 0.0)?, self.f64_or("y", 0.0)?))
    }

    /// Add a child and return `self` for building fixtures.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute and return `self` for building fixtures.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// First child with the given name.
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given name, mutably.
    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Drop stored end tags from this node and every descendant.
    pub fn drop_end_tags(&mut self) {
        self.end_tag = None;
        for child in &mut self.children {
            child.drop_end_tags();
        }
    }

    /// Total node count of this subtree, the node itself included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

/// Parse a float with the accepted grammar: optional sign, integer and/or
/// fractional digits, optional exponent.  Anything else is bad input.
pub fn parse_double(input: &str) -> Result<f64> {
    let s = input.trim();
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let int_digits = count_digits(bytes, &mut i);
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = count_digits(bytes, &mut i);
    }
    if int_digits + frac_digits == 0 {
        return Err(bad_number(input));
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        if count_digits(bytes, &mut i) == 0 {
            return Err(bad_number(input));
        }
    }
    if i != bytes.len() {
        return Err(bad_number(input));
    }
    s.parse::<f64>().map_err(|_| bad_number(input))
}

/// Parse an integer: optional sign plus decimal digits.
pub fn parse_int(input: &str) -> Result<i64> {
    let s = input.trim();
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    if count_digits(bytes, &mut i) == 0 || i != bytes.len() {
        return Err(bad_number(input));
    }
    s.parse::<i64>().map_err(|_| bad_number(input))
}

fn count_digits(bytes: &[u8], i: &mut usize) -> usize {
    let start = *i;
    while matches!(bytes.get(*i), Some(b) if b.is_ascii_digit()) {
        *i += 1;
    }
    *i - start
}

fn bad_number(input: &str) -> CamError {
    CamError::BadInput(format!("'{}' is not a number", input.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_promotion() {
        let mut node = Node::new("LWPOLYLINE");
        node.push_attr("x", "0.0");
        assert_eq!(node.attr("x"), Some(&AttrValue::Scalar("0.0".into())));
        node.push_attr("x", "1.0");
        node.push_attr("x", "2.0");
        assert_eq!(
            node.attr("x").unwrap().values(),
            &["0.0".to_string(), "1.0".to_string(), "2.0".to_string()]
        );
    }

    #[test]
    fn test_group_code_from_name() {
        assert_eq!(Node::new("LINE").group_code(), 0);
        assert_eq!(Node::new("$ACADVER").group_code(), 9);
    }

    #[test]
    fn test_parse_double_grammar() {
        assert_eq!(parse_double("1").unwrap(), 1.0);
        assert_eq!(parse_double("-2.5").unwrap(), -2.5);
        assert_eq!(parse_double("+.5").unwrap(), 0.5);
        assert_eq!(parse_double("3.").unwrap(), 3.0);
        assert_eq!(parse_double("1e3").unwrap(), 1000.0);
        assert_eq!(parse_double("  1.5E-2 ").unwrap(), 0.015);
        assert!(parse_double("").is_err());
        assert!(parse_double(".").is_err());
        assert!(parse_double("1.5x").is_err());
        assert!(parse_double("e5").is_err());
        assert!(parse_double("nan").is_err());
    }

    #[test]
    fn test_parse_int_grammar() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int(" -7 ").unwrap(), -7);
        assert!(parse_int("1.5").is_err());
        assert!(parse_int("x").is_err());
    }

    #[test]
    fn test_f64_list() {
        let mut node = Node::new("LWPOLYLINE");
        node.push_attr("x", "0");
        node.push_attr("x", "10");
        assert_eq!(node.attr_f64_list("x").unwrap(), vec![0.0, 10.0]);
        assert!(node.attr_f64_list("y").unwrap().is_empty());
    }
}
