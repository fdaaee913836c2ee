//! Polyline geometry processing: spatial lookup, stitching, and the
//! cut-order post-processor.

pub mod post;
pub mod spatial;
pub mod stitch;

pub use post::{parse_sort_criteria, SortConfig, SortCriterion};
pub use spatial::EndpointIndex;
pub use stitch::{stitch, StitchConfig};
