//! DXF → CAMM-GL III pipeline front-end.

use anyhow::{Context, Result};
use cammrust::geom::post::{parse_sort_criteria, SortCriterion};
use cammrust::pipeline::{dxf_to_camm, PipelineConfig};
use cammrust::types::Vector2;
use clap::Parser;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dxf2camm", version, about = "Convert a DXF drawing into a CAMM-GL III cutting stream")]
struct Args {
    /// Input DXF file; stdin when omitted
    input: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Knife offset in mm (0 disables compensation)
    #[arg(long, default_value_t = 0.25)]
    offset: f64,

    /// Enter each path at its first point instead of offsetting along the
    /// trailing direction
    #[arg(long)]
    offsetless_start: bool,

    /// Cut a frame this many mm outside the drawing bounds
    #[arg(long)]
    bbox: Option<f64>,

    /// Prepend the blade-alignment lead-in (default)
    #[arg(long, overrides_with = "no_align_knife")]
    align_knife: bool,

    /// Suppress the blade-alignment lead-in
    #[arg(long)]
    no_align_knife: bool,

    /// Overcut length for closed figures in mm
    #[arg(long, default_value_t = 1.0)]
    overlap: f64,

    /// Suppress header and footer
    #[arg(long)]
    raw: bool,

    /// Use relative coordinates for uncompensated polylines
    #[arg(long)]
    relative: bool,

    /// Stitching tolerance in drawing units
    #[arg(long, default_value_t = 1e-3)]
    epsilon: f64,

    /// Segments longer than this (mm) always pivot the blade
    #[arg(long = "shortline", default_value_t = 0.5)]
    short_line: f64,

    /// Corners turning less than this (degrees) cut without a pivot
    #[arg(long = "smallangle", default_value_t = 10.0)]
    small_angle: f64,

    /// Drop interior points closer than this (mm)
    #[arg(long, default_value_t = 0.1)]
    coarsify: f64,

    /// Stitch polylines with coinciding endpoints (default)
    #[arg(long, overrides_with = "no_combine")]
    combine: bool,

    /// Do not stitch polylines
    #[arg(long)]
    no_combine: bool,

    /// Embed closed figures sharing a point into their host path
    #[arg(long)]
    combine_cycles: bool,

    /// Allow reversing a polyline while stitching
    #[arg(long)]
    combine_reverse: bool,

    /// Translate the drawing by "x,y" units before scaling
    #[arg(long, value_parser = parse_translate)]
    translate: Option<Vector2>,

    /// Scale factor on top of the mm → device-unit conversion
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Cut-order criteria: comma-separated
    /// {left,bottom,right,top}[-asc|-desc] and box
    #[arg(long, value_parser = parse_sort)]
    sort: Option<SortSpec>,
}

/// Parsed `--sort` criteria; wrapped so clap treats the list as one value.
#[derive(Clone)]
struct SortSpec(Vec<SortCriterion>);

fn parse_translate(raw: &str) -> std::result::Result<Vector2, String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("expected x,y but got '{raw}'"));
    }
    let x = parts[0].trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = parts[1].trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok(Vector2::new(x, y))
}

fn parse_sort(raw: &str) -> std::result::Result<SortSpec, String> {
    parse_sort_criteria(raw)
        .map(SortSpec)
        .map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = PipelineConfig {
        offset: args.offset,
        offsetless_start: args.offsetless_start,
        bbox: args.bbox,
        align_knife: args.align_knife || !args.no_align_knife,
        overlap: args.overlap,
        raw: args.raw,
        relative: args.relative,
        epsilon: args.epsilon,
        short_line: args.short_line,
        small_angle: args.small_angle,
        coarsify: args.coarsify,
        combine: args.combine || !args.no_combine,
        combine_cycles: args.combine_cycles,
        combine_reverse: args.combine_reverse,
        translate: args.translate.unwrap_or(Vector2::ZERO),
        scale: args.scale,
        sort: args.sort.map(|spec| spec.0),
        ..PipelineConfig::default()
    };

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(std::io::stdin()),
    };
    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    let notifications = dxf_to_camm(input, output, &config).context("converting DXF")?;
    for note in &notifications {
        eprintln!("{note}");
    }
    Ok(())
}
