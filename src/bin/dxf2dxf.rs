//! DXF rewriting tool: canonicalise, filter, boil down, flatten, re-emit.

use anyhow::{Context, Result};
use cammrust::dxf::transform::Criterion;
use cammrust::dxf::{boil, flatten, parser, transform, writer};
use clap::Parser;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dxf2dxf", version, about = "Parse, rewrite and re-emit a DXF drawing")]
struct Args {
    /// Input DXF file; stdin when omitted
    input: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Fail on duplicate sections instead of merging them
    #[arg(long)]
    strict: bool,

    /// Delete CLASSES/TABLES, empty BLOCKS/OBJECTS, drop comments
    #[arg(long)]
    strip: bool,

    /// Entity filter: [+|-]KIND[,KIND...]; `-` (drop) is the default
    #[arg(long)]
    filter: Option<String>,

    /// Resolve INSERTs into transformed primitives
    #[arg(long)]
    flatten: bool,

    /// Boil entities down to this comma-separated kind set
    #[arg(long, value_name = "KINDS")]
    boil_down: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(std::io::stdin()),
    };

    let mut drawing = parser::parse(input).context("parsing DXF")?;
    transform::canonicalise(&mut drawing.root, args.strict, &mut drawing.notifications)?;

    if let Some(criterion) = &args.filter {
        transform::filter_entities(&mut drawing.root, Criterion::parse(criterion)?)?;
    }
    if let Some(kinds) = &args.boil_down {
        let acceptable: Vec<&str> = kinds
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        boil::boil_down_tree(&mut drawing.root, &acceptable)?;
    }
    if args.flatten {
        flatten::flatten(&mut drawing.root, &mut drawing.notifications)?;
    }
    if args.strip {
        transform::strip(&mut drawing.root)?;
    }

    for note in &drawing.notifications {
        eprintln!("{note}");
    }

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = writer::DxfWriter::new(output);
    writer.write_tree(&drawing.root).context("emitting DXF")?;
    Ok(())
}
