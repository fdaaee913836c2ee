//! # cammrust
//!
//! A toolkit for converting 2D vector drawings between DXF, an XML mirror,
//! an SVG view, and the CAMM-GL III instruction stream of Roland knife
//! cutters, simplifying and optimising the geometry on the way so a
//! trailing-blade cutter traces the figures efficiently and cleanly.
//!
//! ## Pipeline
//!
//! ```rust,ignore
//! use cammrust::pipeline::{dxf_to_camm, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let notifications = dxf_to_camm(std::io::stdin(), std::io::stdout(), &config)?;
//! for note in &notifications {
//!     eprintln!("{note}");
//! }
//! # Ok::<(), cammrust::error::CamError>(())
//! ```
//!
//! ## Architecture
//!
//! - `dxf`: group-code codec, attributed tree, and the tree rewriters
//!   (canonicalise, strip, filter, boil-down, block flattening)
//! - `geom`: polyline stitching, spatial endpoint index, coarsening,
//!   overlap and cut-order sorting
//! - `camm`: stateful CAMM-GL emitter with knife-offset compensation,
//!   plus the tolerant parser and SVG renderer used for verification
//! - `pipeline`: the DXF to CAMM stage sequence and its configuration

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod camm;
pub mod dxf;
pub mod error;
pub mod geom;
pub mod notification;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use error::{CamError, Result};
pub use notification::{Notification, NotificationCollection, NotificationType};
pub use types::{BoundingBox2D, Polyline, Vector2};

// Re-export the main entry points
pub use camm::{render_svg, CammEmitter, KnifeConfig, KnifeCutter, RenderConfig};
pub use dxf::{parse, parse_str, Drawing, Node};
pub use pipeline::{dxf_to_camm, PipelineConfig, UNITS_PER_MM};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexports_compose() {
        let drawing = parse_str("0\nEOF\n").unwrap();
        assert!(drawing.root.children.is_empty());
        assert_eq!(PipelineConfig::default().scale, 1.0);
    }
}
