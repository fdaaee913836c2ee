//! DXF tree emitter
//!
//! Depth-first emission of the attributed tree back into the two-line
//! group-code form.  Attributes are written in ascending group-code order;
//! the coordinate codes in the 10-range pull their 20-/30-range partners in
//! so each point is written as a consecutive triple.

use crate::dxf::code;
use crate::dxf::node::{AttrValue, Node};
use crate::error::Result;
use std::collections::HashSet;
use std::io::Write;

/// Stream writer for DXF trees.
pub struct DxfWriter<W: Write> {
    writer: W,
}

impl<W: Write> DxfWriter<W> {
    /// Create a new writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Get the inner writer back.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write a group code right-aligned in a 3-character field.
    fn write_code(&mut self, code: i32) -> Result<()> {
        if (0..10).contains(&code) {
            writeln!(self.writer, "  {}", code)?;
        } else if (10..100).contains(&code) {
            writeln!(self.writer, " {}", code)?;
        } else {
            writeln!(self.writer, "{}", code)?;
        }
        Ok(())
    }

    /// Write one code/value pair.
    pub fn write_pair(&mut self, code: i32, value: &str) -> Result<()> {
        self.write_code(code)?;
        writeln!(self.writer, "{}", value)?;
        Ok(())
    }

    /// Emit a whole document.  The root node itself has no name line; its
    /// terminator is the final `EOF`.
    pub fn write_tree(&mut self, root: &Node) -> Result<()> {
        for child in &root.children {
            self.write_node(child)?;
        }
        self.write_terminator(root)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        self.write_pair(node.group_code(), &node.name)?;
        self.write_attrs(node)?;
        for child in &node.children {
            self.write_node(child)?;
        }
        if code::terminator_for(&node.name).is_some() {
            self.write_terminator(node)?;
        }
        Ok(())
    }

    fn write_terminator(&mut self, node: &Node) -> Result<()> {
        match &node.end_tag {
            Some(end) => {
                self.write_pair(end.group_code(), &end.name)?;
                self.write_attrs(end)?;
            }
            None => {
                if let Some(name) = code::terminator_for(&node.name) {
                    self.write_pair(0, name)?;
                }
            }
        }
        Ok(())
    }

    fn write_attrs(&mut self, node: &Node) -> Result<()> {
        let mut entries: Vec<(i32, &str)> = node
            .attrs
            .keys()
            .filter_map(|name| code::attr_code(name).map(|c| (c, name.as_str())))
            .collect();
        entries.sort_by_key(|(c, _)| *c);

        let mut consumed: HashSet<i32> = HashSet::new();
        for (attr_code, name) in entries {
            if consumed.contains(&attr_code) {
                continue;
            }
            if (10..=18).contains(&attr_code) {
                self.write_point_triples(node, attr_code, name, &mut consumed)?;
            } else {
                self.write_values(attr_code, node.attr(name).expect("key just listed"))?;
            }
        }
        Ok(())
    }

    /// Emit the x/y/z values of one coordinate slot interleaved per point.
    fn write_point_triples(
        &mut self,
        node: &Node,
        x_code: i32,
        x_name: &str,
        consumed: &mut HashSet<i32>,
    ) -> Result<()> {
        let xs = node.attr(x_name).expect("key just listed").values();
        let ys = node.attr(&code::attr_name(x_code + 10)).map(AttrValue::values);
        let zs = node.attr(&code::attr_name(x_code + 20)).map(AttrValue::values);

        for (i, x) in xs.iter().enumerate() {
            self.write_pair(x_code, x)?;
            if let Some(ys) = ys {
                if let Some(y) = ys.get(i) {
                    self.write_pair(x_code + 10, y)?;
                }
            }
            if let Some(zs) = zs {
                if let Some(z) = zs.get(i) {
                    self.write_pair(x_code + 20, z)?;
                }
            }
        }
        // Orphan values beyond the x count keep their own code slot.
        if let Some(ys) = ys {
            for y in ys.iter().skip(xs.len()) {
                self.write_pair(x_code + 10, y)?;
            }
            consumed.insert(x_code + 10);
        }
        if let Some(zs) = zs {
            for z in zs.iter().skip(xs.len()) {
                self.write_pair(x_code + 20, z)?;
            }
            consumed.insert(x_code + 20);
        }
        Ok(())
    }

    fn write_values(&mut self, code: i32, value: &AttrValue) -> Result<()> {
        for v in value.values() {
            self.write_pair(code, v)?;
        }
        Ok(())
    }
}

/// Emit a tree into a string.
pub fn emit_to_string(root: &Node) -> Result<String> {
    let mut writer = DxfWriter::new(Vec::new());
    writer.write_tree(root)?;
    let bytes = writer.into_inner();
    Ok(String::from_utf8(bytes).expect("writer emits UTF-8"))
}

/// Format a float the way DXF values are written: full precision, trailing
/// zeros trimmed, at least one decimal place.
pub fn format_double(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        let formatted = format!("{:.15}", value);
        let trimmed = formatted.trim_end_matches('0');
        if trimmed.ends_with('.') {
            format!("{}0", trimmed)
        } else {
            trimmed.to_string()
        }
    }
}
