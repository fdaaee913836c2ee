//! DXF ↔ XML mirror converter.

use anyhow::{Context, Result};
use cammrust::dxf::{parser, transform, writer, xml};
use clap::Parser;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dxf2xml", version, about = "Mirror a DXF drawing as XML (or back with --reverse)")]
struct Args {
    /// Input file; stdin when omitted
    input: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Convert XML back into DXF
    #[arg(long)]
    reverse: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut text = String::new();
    match &args.input {
        Some(path) => {
            File::open(path)
                .with_context(|| format!("opening {}", path.display()))?
                .read_to_string(&mut text)
                .with_context(|| format!("reading {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
        }
    }

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    if args.reverse {
        let root = xml::xml_to_tree(&text).context("parsing XML")?;
        let mut writer = writer::DxfWriter::new(output);
        writer.write_tree(&root).context("emitting DXF")?;
    } else {
        let mut drawing = parser::parse(text.as_bytes()).context("parsing DXF")?;
        transform::canonicalise(&mut drawing.root, false, &mut drawing.notifications)?;
        for note in &drawing.notifications {
            eprintln!("{note}");
        }
        let mut output = output;
        output
            .write_all(xml::tree_to_xml(&drawing.root)?.as_bytes())
            .context("writing XML")?;
    }
    Ok(())
}
