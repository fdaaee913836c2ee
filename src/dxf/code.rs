//! DXF group codes and attribute-name aliases
//!
//! Group codes classify the value that follows them in a DXF stream.  The
//! tree model stores attributes under short names instead of raw codes;
//! this module owns the bidirectional mapping and the end-node pairing
//! table.

/// Group code introducing an ordinary node (entity, section, table entry).
pub const NODE_START: i32 = 0;

/// Group code introducing a header variable node (`$`-prefixed name).
pub const HEADER_VARIABLE: i32 = 9;

/// Name of the synthetic root node; paired with the `EOF` terminator.
pub const ROOT_NAME: &str = "dxf";

/// Attributes copied from a replaced node onto each replacement during
/// entity rewriting and block flattening.
pub const GENERAL_ATTRS: &[&str] = &[
    "layer",
    "color",
    "linetype",
    "linetype_scale",
    "elevation",
    "thickness",
    "invisible",
    "space",
    "textstyle",
    "comment",
];

/// `$ACADVER` strings accepted in the HEADER section, R10 through 2018.
pub const ACAD_VERSIONS: &[&str] = &[
    "AC1006", "AC1009", "AC1012", "AC1014", "AC1015", "AC1018", "AC1021",
    "AC1024", "AC1027", "AC1032",
];

/// Code ranges whose members share a base name plus a positional suffix:
/// the first code of a range maps to the bare base name, subsequent codes
/// append their offset (`10 → x`, `11 → x1`, ..., `18 → x8`).
const RANGES: &[(i32, i32, &str)] = &[
    (10, 9, "x"),
    (20, 9, "y"),
    (30, 8, "z"),
    (40, 8, "float"),
    (50, 9, "angle"),
    (70, 9, "int"),
    (90, 9, "int_32"),
    (280, 10, "int_8"),
    (290, 10, "bool"),
];

/// Codes with individual names.
const SINGLES: &[(i32, &str)] = &[
    (1, "text"),
    (2, "name"),
    (3, "text2"),
    (4, "text3"),
    (5, "handle"),
    (6, "linetype"),
    (7, "textstyle"),
    (8, "layer"),
    (38, "elevation"),
    (39, "thickness"),
    (48, "linetype_scale"),
    (60, "invisible"),
    (62, "color"),
    (66, "entities_follow"),
    (67, "space"),
    (100, "subclass"),
    (102, "control_string"),
    (105, "dimvar_handle"),
    (210, "extrusion_direction_x"),
    (220, "extrusion_direction_y"),
    (230, "extrusion_direction_z"),
    (999, "comment"),
];

/// Map a group code to its attribute name.
///
/// Codes outside every table fall back to `i<code>` and survive a
/// round-trip verbatim.
pub fn attr_name(code: i32) -> String {
    for &(c, name) in SINGLES {
        if c == code {
            return name.to_string();
        }
    }
    for &(start, size, base) in RANGES {
        if code >= start && code < start + size {
            let offset = code - start;
            if offset == 0 {
                return base.to_string();
            }
            return format!("{base}{offset}");
        }
    }
    format!("i{code}")
}

/// Map an attribute name back to its group code.
pub fn attr_code(name: &str) -> Option<i32> {
    for &(c, n) in SINGLES {
        if n == name {
            return Some(c);
        }
    }
    // Longest base first so "int_32"/"int_8" win over "int".
    let mut ranges: Vec<&(i32, i32, &str)> = RANGES.iter().collect();
    ranges.sort_by_key(|(_, _, base)| std::cmp::Reverse(base.len()));
    for &&(start, size, base) in &ranges {
        if let Some(rest) = name.strip_prefix(base) {
            if rest.is_empty() {
                return Some(start);
            }
            if let Ok(offset) = rest.parse::<i32>() {
                if offset >= 1 && offset < size {
                    return Some(start + offset);
                }
            }
        }
    }
    name.strip_prefix('i').and_then(|rest| rest.parse().ok())
}

/// Map an end-node name to the starter it closes; `EOF` closes the root.
pub fn end_node_starter(end: &str) -> Option<&'static str> {
    match end {
        "ENDSEC" => Some("SECTION"),
        "ENDTAB" => Some("TABLE"),
        "ENDBLK" => Some("BLOCK"),
        "SEQEND" => Some("POLYLINE"),
        "EOF" => Some(ROOT_NAME),
        _ => None,
    }
}

/// Canonical terminator for a starter node, if it has one.
pub fn terminator_for(starter: &str) -> Option<&'static str> {
    match starter {
        "SECTION" => Some("ENDSEC"),
        "TABLE" => Some("ENDTAB"),
        "BLOCK" => Some("ENDBLK"),
        "POLYLINE" => Some("SEQEND"),
        ROOT_NAME => Some("EOF"),
        _ => None,
    }
}

/// True when the node name opens a starter/terminator pair.
pub fn is_starter(name: &str) -> bool {
    terminator_for(name).is_some() && name != ROOT_NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_names() {
        assert_eq!(attr_name(10), "x");
        assert_eq!(attr_name(14), "x4");
        assert_eq!(attr_name(28), "y8");
        assert_eq!(attr_name(30), "z");
        assert_eq!(attr_name(37), "z7");
        assert_eq!(attr_name(40), "float");
        assert_eq!(attr_name(51), "angle1");
        assert_eq!(attr_name(70), "int");
        assert_eq!(attr_name(90), "int_32");
        assert_eq!(attr_name(285), "int_85");
        assert_eq!(attr_name(290), "bool");
    }

    #[test]
    fn test_single_names() {
        assert_eq!(attr_name(2), "name");
        assert_eq!(attr_name(8), "layer");
        assert_eq!(attr_name(38), "elevation");
        assert_eq!(attr_name(48), "linetype_scale");
        assert_eq!(attr_name(62), "color");
        assert_eq!(attr_name(999), "comment");
        assert_eq!(attr_name(210), "extrusion_direction_x");
    }

    #[test]
    fn test_fallback_names() {
        assert_eq!(attr_name(330), "i330");
        assert_eq!(attr_name(1040), "i1040");
    }

    #[test]
    fn test_roundtrip_codes() {
        for code in [
            1, 2, 5, 8, 10, 11, 18, 20, 30, 38, 40, 48, 50, 62, 70, 90, 100,
            105, 210, 280, 290, 330, 370, 999, 1001,
        ] {
            assert_eq!(attr_code(&attr_name(code)), Some(code), "code {code}");
        }
    }

    #[test]
    fn test_int_prefix_disambiguation() {
        assert_eq!(attr_code("int"), Some(70));
        assert_eq!(attr_code("int8"), Some(78));
        assert_eq!(attr_code("int_8"), Some(280));
        assert_eq!(attr_code("int_81"), Some(281));
        assert_eq!(attr_code("int_32"), Some(90));
        assert_eq!(attr_code("int_321"), Some(91));
    }

    #[test]
    fn test_end_node_table() {
        assert_eq!(end_node_starter("ENDSEC"), Some("SECTION"));
        assert_eq!(end_node_starter("SEQEND"), Some("POLYLINE"));
        assert_eq!(end_node_starter("EOF"), Some(ROOT_NAME));
        assert_eq!(end_node_starter("LINE"), None);
        assert_eq!(terminator_for("BLOCK"), Some("ENDBLK"));
        assert!(is_starter("TABLE"));
        assert!(!is_starter("LINE"));
        assert!(!is_starter(ROOT_NAME));
    }
}
