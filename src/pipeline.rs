//! The DXF → CAMM-GL pipeline
//!
//! Stage order: parse → canonicalise → boil-down → flatten → strip →
//! extract → stitch → translate/scale → coarsen → bounding boxes → sort →
//! calibration lead-in → bbox frame → overlap → emit.

use crate::camm::emitter::CammEmitter;
use crate::camm::knife::{KnifeConfig, KnifeCutter};
use crate::dxf::{boil, extract, flatten, parser, transform};
use crate::error::Result;
use crate::geom::post::{self, SortConfig, SortCriterion};
use crate::geom::stitch::{stitch, StitchConfig};
use crate::notification::NotificationCollection;
use crate::types::{BoundingBox2D, Polyline, Vector2};
use std::io::{Read, Write};
use tracing::debug;

/// Device resolution: CAMM-GL coordinates per millimetre.
pub const UNITS_PER_MM: f64 = 40.0;

/// The entity kinds the cutter pipeline boils every drawing down to.
pub const CUTTER_KINDS: &[&str] = &["POINT", "LWPOLYLINE"];

/// Everything the DXF → CAMM pipeline can be told.  Millimetre-valued
/// fields are converted to device units at the translate/scale stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Blade trail distance in mm; `0` disables compensation.
    pub offset: f64,
    /// Enter each path at its first point (no trailing-direction lead).
    pub offsetless_start: bool,
    /// Append a cut frame this many mm outside the drawing bounds.
    pub bbox: Option<f64>,
    /// Prepend a lead-in aligning the blade before the first figure.
    pub align_knife: bool,
    /// Overcut length for closed figures, in mm.
    pub overlap: f64,
    /// Suppress header and footer.
    pub raw: bool,
    /// Emit uncompensated polylines in relative coordinates.
    pub relative: bool,
    /// Stitching tolerance in drawing units.
    pub epsilon: f64,
    /// Corner segments longer than this (mm) always pivot the blade.
    pub short_line: f64,
    /// Corners turning less than this (degrees) cut without a pivot.
    pub small_angle: f64,
    /// Coarsening threshold in mm.
    pub coarsify: f64,
    /// Stitch polylines at all.
    pub combine: bool,
    /// Embed cycles sharing a point.
    pub combine_cycles: bool,
    /// Allow reversing a polyline while stitching.
    pub combine_reverse: bool,
    /// Translation in drawing units, applied before scaling.
    pub translate: Vector2,
    /// User scale on top of the mm → device-unit conversion.
    pub scale: f64,
    /// Cut-order criteria; `None` keeps the stitched order.
    pub sort: Option<Vec<SortCriterion>>,
    /// Sort quantisation step in mm.
    pub sort_crudeness: f64,
    /// Treat the output as a live device stream (enables the idle guard).
    pub live_output: bool,
    /// Idle-guard enable.
    pub idle_guard: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            offset: 0.25,
            offsetless_start: false,
            bbox: None,
            align_knife: true,
            overlap: 1.0,
            raw: false,
            relative: false,
            epsilon: 1e-3,
            short_line: 0.5,
            small_angle: 10.0,
            coarsify: 0.1,
            combine: true,
            combine_cycles: false,
            combine_reverse: false,
            translate: Vector2::ZERO,
            scale: 1.0,
            sort: None,
            sort_crudeness: 1.0,
            live_output: false,
            idle_guard: true,
        }
    }
}

/// Run the whole DXF → CAMM-GL pipeline.
pub fn dxf_to_camm<R: Read, W: Write>(
    input: R,
    output: W,
    config: &PipelineConfig,
) -> Result<NotificationCollection> {
    let mut drawing = parser::parse(input)?;
    debug!(nodes = drawing.root.subtree_len(), "parsed DXF tree");

    transform::canonicalise(&mut drawing.root, false, &mut drawing.notifications)?;
    boil::boil_down_tree(&mut drawing.root, CUTTER_KINDS)?;
    flatten::flatten(&mut drawing.root, &mut drawing.notifications)?;
    transform::strip(&mut drawing.root)?;

    let polylines = extract::extract_polylines(&drawing.root, &mut drawing.notifications)?;
    debug!(count = polylines.len(), "extracted polylines");

    let polylines = prepare_polylines(polylines, config);
    debug!(count = polylines.len(), "post-processed polylines");

    emit_polylines(output, &polylines, config)?;
    Ok(drawing.notifications)
}

/// The geometry half of the pipeline: stitch, transform into device
/// units, coarsen, sort, add calibration, frame and overlap.
pub fn prepare_polylines(
    mut polylines: Vec<Polyline>,
    config: &PipelineConfig,
) -> Vec<Polyline> {
    polylines.retain(|p| p.len() >= 2);

    if config.combine {
        polylines = stitch(
            polylines,
            &StitchConfig {
                epsilon: config.epsilon,
                join_cycles: config.combine_cycles,
                reverse_allowed: config.combine_reverse,
            },
        );
    } else {
        for polyline in &mut polylines {
            polyline.ensure_closing_point();
        }
    }

    let unit_scale = config.scale * UNITS_PER_MM;
    for polyline in &mut polylines {
        polyline.translate_scale(config.translate, unit_scale);
    }

    post::coarsen(&mut polylines, config.coarsify * UNITS_PER_MM);

    let boxes = post::bounding_boxes(&polylines);
    let mut items: Vec<(Polyline, BoundingBox2D)> =
        polylines.into_iter().zip(boxes).collect();
    if let Some(criteria) = &config.sort {
        post::sort_polylines(
            &mut items,
            &SortConfig {
                criteria: criteria.clone(),
                crudeness: config.sort_crudeness * UNITS_PER_MM,
            },
        );
    }
    let boxes: Vec<BoundingBox2D> = items.iter().map(|(_, b)| *b).collect();
    let mut polylines: Vec<Polyline> = items.into_iter().map(|(p, _)| p).collect();

    let offset_units = config.offset * UNITS_PER_MM;
    if config.align_knife && offset_units > 0.0 {
        if let Some(lead) = calibration_lead_in(&polylines, offset_units) {
            polylines.insert(0, lead);
        }
    }

    if let Some(margin) = config.bbox {
        if let Some(frame) = post::frame_polyline(&boxes, margin * UNITS_PER_MM) {
            polylines.push(frame);
        }
    }

    post::add_overlap(&mut polylines, config.overlap * UNITS_PER_MM);
    polylines
}

/// Emit prepared polylines as CAMM-GL.
pub fn emit_polylines<W: Write>(
    output: W,
    polylines: &[Polyline],
    config: &PipelineConfig,
) -> Result<()> {
    let mut emitter = if config.live_output {
        CammEmitter::new_live(output)
    } else {
        CammEmitter::new(output)
    };
    emitter.set_idle_guard(config.idle_guard);

    if !config.raw {
        emitter.header()?;
    }

    let mut cutter = KnifeCutter::new(KnifeConfig {
        offset: config.offset * UNITS_PER_MM,
        epsilon: config.epsilon * config.scale * UNITS_PER_MM,
        small_angle: config.small_angle.to_radians(),
        short_line: config.short_line * UNITS_PER_MM,
        offsetless_start: config.offsetless_start,
        relative: config.relative,
    });
    for polyline in polylines {
        cutter.cut(&mut emitter, &polyline.points)?;
    }

    if !config.raw {
        emitter.footer()?;
    }
    Ok(())
}

/// A short lead-in ending at the first figure's start point, along its
/// initial direction, so the blade is aligned when the figure begins.
fn calibration_lead_in(polylines: &[Polyline], offset: f64) -> Option<Polyline> {
    let first = polylines.first()?;
    let start = first.start()?;
    let towards = first.points.iter().copied().find(|p| *p != start)?;
    let direction = (towards - start).normalize();
    Some(Polyline::open(vec![start - direction * (2.0 * offset), start]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(values: &[(f64, f64)]) -> Vec<Vector2> {
        values.iter().map(|&(x, y)| Vector2::new(x, y)).collect()
    }

    #[test]
    fn test_prepare_scales_to_device_units() {
        let config = PipelineConfig {
            align_knife: false,
            overlap: 0.0,
            coarsify: 0.0,
            ..PipelineConfig::default()
        };
        let out = prepare_polylines(
            vec![Polyline::open(pts(&[(0.0, 0.0), (1.0, 0.0)]))],
            &config,
        );
        assert_eq!(out[0].points[1], Vector2::new(40.0, 0.0));
    }

    #[test]
    fn test_calibration_lead_in_prepended() {
        let config = PipelineConfig {
            offset: 0.5,
            overlap: 0.0,
            coarsify: 0.0,
            ..PipelineConfig::default()
        };
        let out = prepare_polylines(
            vec![Polyline::open(pts(&[(1.0, 0.0), (2.0, 0.0)]))],
            &config,
        );
        assert_eq!(out.len(), 2);
        // 2×offset = 40 device units back along (1, 0) from x = 40.
        assert_eq!(out[0].points, pts(&[(0.0, 0.0), (40.0, 0.0)]));
    }

    #[test]
    fn test_frame_appended_after_figures() {
        let config = PipelineConfig {
            align_knife: false,
            overlap: 0.0,
            coarsify: 0.0,
            bbox: Some(1.0),
            ..PipelineConfig::default()
        };
        let out = prepare_polylines(
            vec![Polyline::open(pts(&[(0.0, 0.0), (1.0, 1.0)]))],
            &config,
        );
        let frame = out.last().unwrap();
        assert_eq!(frame.points[0], Vector2::new(-40.0, -40.0));
        assert_eq!(frame.points[2], Vector2::new(80.0, 80.0));
    }

    #[test]
    fn test_end_to_end_line_only() {
        let dxf = "0\nSECTION\n2\nENTITIES\n0\nLINE\n10\n0\n20\n0\n11\n10\n21\n0\n0\nENDSEC\n0\nEOF\n";
        let config = PipelineConfig {
            offset: 0.0,
            align_knife: false,
            overlap: 0.0,
            coarsify: 0.0,
            ..PipelineConfig::default()
        };
        let mut out = Vec::new();
        let notes = dxf_to_camm(dxf.as_bytes(), &mut out, &config).unwrap();
        let camm = String::from_utf8(out).unwrap();
        assert_eq!(camm, "\u{3}IN;PU0,0;PD400,0;PU0,0;SP0;");
        assert!(notes.is_empty());
    }
}
