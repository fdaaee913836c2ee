//! CAMM-GL → SVG verification renderer.

use anyhow::{Context, Result};
use cammrust::camm::render::{render_svg, RenderConfig};
use cammrust::notification::NotificationCollection;
use clap::Parser;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "camm2svg", version, about = "Render a CAMM-GL III stream as SVG for inspection")]
struct Args {
    /// Input CAMM-GL file; stdin when omitted
    input: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// One path per pen-down stretch, coloured in cut order
    #[arg(long)]
    split: bool,
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

    let mut notifications = NotificationCollection::new();
    let svg = render_svg(&text, &RenderConfig { split: args.split }, &mut notifications)
        .context("rendering CAMM-GL")?;
    for note in &notifications {
        eprintln!("{note}");
    }

    match &args.output {
        Some(path) => {
            File::create(path)
                .with_context(|| format!("creating {}", path.display()))?
                .write_all(svg.as_bytes())?;
        }
        None => std::io::stdout().write_all(svg.as_bytes())?,
    }
    Ok(())
}
