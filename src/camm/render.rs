//! CAMM-GL rendering into SVG
//!
//! A handler table over the scanned tokens maintains a rendering context
//! (current point, pen state, addressing mode, input window) and
//! contributes SVG path data.  The output group flips the y axis so the
//! device's right-handed coordinates display correctly.

use crate::camm::emitter::fmt_num;
use crate::camm::scan::{tokenise, Token};
use crate::error::Result;
use crate::notification::{NotificationCollection, NotificationType};
use crate::types::{BoundingBox2D, Vector2};
use std::fmt::Write as _;

/// Rendering options.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Break the drawing into one path per pen-down stretch and colour
    /// them around the HSV ring in cut order.
    pub split: bool,
}

/// Commands that are recognised but contribute nothing to the picture.
const RECOGNISED_NOOPS: &[&str] = &["VS", "SP", "SI", "SL", "LB", "WD", "IP", "SC"];
const RECOGNISED_BANG_NOOPS: &[&str] = &["FS", "PG", "ST", "NR"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Absolute,
    Relative,
}

struct RenderContext {
    current: Option<Vector2>,
    pen_down: bool,
    mode: Mode,
    window: Option<(Vector2, Vector2)>,
    bounds: Option<BoundingBox2D>,
    paths: Vec<String>,
    path: String,
    split: bool,
}

impl RenderContext {
    fn new(split: bool) -> Self {
        RenderContext {
            current: None,
            pen_down: false,
            mode: Mode::Absolute,
            window: None,
            bounds: None,
            paths: Vec::new(),
            path: String::new(),
            split,
        }
    }

    fn touch(&mut self, p: Vector2) {
        match &mut self.bounds {
            Some(bounds) => bounds.expand_to_include(p),
            None => self.bounds = Some(BoundingBox2D::from_point(p)),
        }
    }

    fn break_path(&mut self) {
        if !self.path.is_empty() {
            self.paths.push(std::mem::take(&mut self.path));
        }
    }

    fn ensure_start(&mut self) {
        if self.path.is_empty() {
            let at = self.current.unwrap_or(Vector2::ZERO);
            let _ = write!(self.path, "M {} {}", fmt_num(at.x), fmt_num(at.y));
            self.touch(at);
        }
    }

    fn draw_line(&mut self, to: Vector2) {
        self.ensure_start();
        let _ = write!(self.path, " L {} {}", fmt_num(to.x), fmt_num(to.y));
        self.touch(to);
    }

    fn move_only(&mut self, to: Vector2) {
        if self.split {
            self.break_path();
        } else if !self.path.is_empty() {
            let _ = write!(self.path, " M {} {}", fmt_num(to.x), fmt_num(to.y));
        }
        self.current = Some(to);
    }

    fn resolve(&self, p: Vector2) -> Vector2 {
        match self.mode {
            Mode::Absolute => p,
            Mode::Relative => self.current.unwrap_or(Vector2::ZERO) + p,
        }
    }
}

/// Render a CAMM-GL stream into an SVG document.  Unknown or
/// unimplemented commands are reported in `notifications` and skipped.
pub fn render_svg(
    input: &str,
    config: &RenderConfig,
    notifications: &mut NotificationCollection,
) -> Result<String> {
    let tokens = tokenise(input)?;
    let mut ctx = RenderContext::new(config.split);

    for token in tokens {
        handle_token(&mut ctx, token, notifications);
    }
    ctx.break_path();

    Ok(svg_document(&ctx))
}

fn handle_token(
    ctx: &mut RenderContext,
    token: Token,
    notifications: &mut NotificationCollection,
) {
    match token {
        Token::Command { mnemonic, args } => match mnemonic.as_str() {
            "IN" => {
                ctx.break_path();
                ctx.current = Some(Vector2::ZERO);
                ctx.pen_down = false;
                ctx.mode = Mode::Absolute;
            }
            "PA" => pen_move(ctx, Some(Mode::Absolute), None, &args, notifications),
            "PR" => pen_move(ctx, Some(Mode::Relative), None, &args, notifications),
            "PU" => pen_move(ctx, None, Some(false), &args, notifications),
            "PD" => pen_move(ctx, None, Some(true), &args, notifications),
            "AA" => arc(ctx, &args, true, notifications),
            "AR" => arc(ctx, &args, false, notifications),
            "CI" => circle(ctx, &args, notifications),
            "IW" => {
                if args.len() >= 4 {
                    ctx.window = Some((
                        Vector2::new(args[0], args[1]),
                        Vector2::new(args[2], args[3]),
                    ));
                } else {
                    notifications.warn("IW with fewer than four arguments");
                }
            }
            other if RECOGNISED_NOOPS.contains(&other) => {
                notifications.warn(format!("unimplemented command {other}"));
            }
            other => {
                notifications.warn(format!("ignoring unknown command {other}"));
            }
        },
        Token::Text { mnemonic, .. } => {
            notifications.warn(format!("unimplemented command {mnemonic}"));
        }
        Token::SetEscape(_) => {
            // The scanner already switched its terminator.
        }
        Token::Bang { mnemonic, .. } => {
            if RECOGNISED_BANG_NOOPS.contains(&mnemonic.as_str()) {
                notifications.warn(format!("unimplemented command !{mnemonic}"));
            } else {
                notifications.warn(format!("ignoring unknown command !{mnemonic}"));
            }
        }
        Token::Device { code, .. } => {
            notifications.warn(format!("unimplemented device control ESC.{code}"));
        }
        Token::Legacy { letter, .. } => {
            notifications.warn(format!("ignoring mode-1 command {letter}"));
        }
        Token::Bad(ref text) => {
            if !token.is_silent() {
                notifications.notify(
                    NotificationType::Error,
                    format!("bad input '{}'", text.trim()),
                );
            }
        }
    }
}

/// Unified handler behind `PA`/`PR`/`PU`/`PD`: an optional mode change, an
/// optional pen change, then coordinate pairs moved through.
fn pen_move(
    ctx: &mut RenderContext,
    mode: Option<Mode>,
    pen: Option<bool>,
    args: &[f64],
    notifications: &mut NotificationCollection,
) {
    if let Some(mode) = mode {
        ctx.mode = mode;
    }
    if let Some(down) = pen {
        if !down && ctx.pen_down && ctx.split {
            ctx.break_path();
        }
        ctx.pen_down = down;
    }
    if args.len() % 2 == 1 {
        notifications.warn("discarding trailing odd coordinate");
    }
    for pair in args.chunks_exact(2) {
        let to = ctx.resolve(Vector2::new(pair[0], pair[1]));
        if ctx.pen_down {
            if ctx.current.is_none() {
                ctx.current = Some(to);
            }
            ctx.draw_line(to);
            ctx.current = Some(to);
        } else {
            ctx.move_only(to);
        }
    }
}

fn arc(
    ctx: &mut RenderContext,
    args: &[f64],
    absolute: bool,
    notifications: &mut NotificationCollection,
) {
    if args.len() < 3 {
        notifications.warn("arc with fewer than three arguments");
        return;
    }
    let Some(current) = ctx.current else {
        notifications.warn("arc without a current point");
        return;
    };
    let center = if absolute {
        Vector2::new(args[0], args[1])
    } else {
        current + Vector2::new(args[0], args[1])
    };
    let sweep = args[2];
    let radius = current.distance(&center);
    let spoke = current - center;
    let theta = sweep.to_radians();
    let (sin, cos) = (theta.sin(), theta.cos());
    let end = center
        + Vector2::new(
            spoke.x * cos - spoke.y * sin,
            spoke.x * sin + spoke.y * cos,
        );

    if ctx.pen_down {
        ctx.ensure_start();
        let large = if sweep.abs() % 360.0 > 180.0 { 1 } else { 0 };
        let flag = if sweep > 0.0 { 1 } else { 0 };
        let _ = write!(
            ctx.path,
            " A {r} {r} 0 {large} {flag} {x} {y}",
            r = fmt_num(radius),
            x = fmt_num(end.x),
            y = fmt_num(end.y)
        );
        ctx.touch(center + Vector2::new(radius, radius));
        ctx.touch(center - Vector2::new(radius, radius));
    }
    ctx.current = Some(end);
}

fn circle(
    ctx: &mut RenderContext,
    args: &[f64],
    notifications: &mut NotificationCollection,
) {
    let Some(&radius) = args.first() else {
        notifications.warn("CI without a radius");
        return;
    };
    let Some(center) = ctx.current else {
        notifications.warn("CI without a current point");
        return;
    };
    let start = center + Vector2::new(radius, 0.0);
    let opposite = center - Vector2::new(radius, 0.0);
    ctx.ensure_start();
    let _ = write!(
        ctx.path,
        " M {sx} {sy} A {r} {r} 0 1 0 {ox} {oy} A {r} {r} 0 1 0 {sx} {sy} M {cx} {cy}",
        r = fmt_num(radius.abs()),
        sx = fmt_num(start.x),
        sy = fmt_num(start.y),
        ox = fmt_num(opposite.x),
        oy = fmt_num(opposite.y),
        cx = fmt_num(center.x),
        cy = fmt_num(center.y)
    );
    ctx.touch(center + Vector2::new(radius.abs(), radius.abs()));
    ctx.touch(center - Vector2::new(radius.abs(), radius.abs()));
}

fn svg_document(ctx: &RenderContext) -> String {
    // The viewBox covers the input window when the stream declared one,
    // the accumulated bounds otherwise; y is negated for the group flip.
    let (min, max) = match (ctx.window, ctx.bounds) {
        (Some((a, b)), _) => (a, b),
        (None, Some(bounds)) => (bounds.min, bounds.max),
        (None, None) => (Vector2::ZERO, Vector2::new(1.0, 1.0)),
    };
    let width = (max.x - min.x).max(1.0);
    let height = (max.y - min.y).max(1.0);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\">",
        fmt_num(min.x),
        fmt_num(-max.y),
        fmt_num(width),
        fmt_num(height)
    );
    let _ = writeln!(svg, "  <g transform=\"scale(1 -1)\">");
    let count = ctx.paths.len().max(1);
    for (i, path) in ctx.paths.iter().enumerate() {
        let stroke = if ctx.split {
            let hue = (i * 360) / count;
            format!("hsl({hue}, 90%, 40%)")
        } else {
            "black".to_string()
        };
        let _ = writeln!(
            svg,
            "    <path d=\"{path}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"1\"/>"
        );
    }
    let _ = writeln!(svg, "  </g>");
    svg.push_str("</svg>\n");
    svg
}
