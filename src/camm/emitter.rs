//! CAMM-GL III command emitter
//!
//! A stateful scheduler: every public operation is dispatched by first
//! emitting the minimal setter commands for its unmet preconditions, then
//! the operation itself, then recording its declared post-conditions.
//!
//! When the sink is a live device stream, a pen-down state older than the
//! device's idle timeout is refreshed with an extra `PD` before the next
//! command, because the cutter auto-lifts an idle blade.

use crate::camm::state::{ops, Cond, MachineState, Mode, OpSpec, SetOp};
use crate::error::Result;
use crate::types::Vector2;
use std::io::Write;
use std::time::{Duration, Instant};

/// Idle time after which the device lifts the pen by itself.
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// CAMM-GL command writer with tracked machine state.
pub struct CammEmitter<W: Write> {
    out: W,
    /// Sink capability: a live stream gets the idle guard, a buffer never
    /// does.
    live_stream: bool,
    /// Idle guard enable (configuration).
    idle_guard: bool,
    idle_timeout: Duration,
    state: MachineState,
    last_emit: Option<Instant>,
}

impl<W: Write> CammEmitter<W> {
    /// Emitter over a buffer-like sink (no idle guard).
    pub fn new(out: W) -> Self {
        CammEmitter {
            out,
            live_stream: false,
            idle_guard: true,
            idle_timeout: IDLE_TIMEOUT,
            state: MachineState::default(),
            last_emit: None,
        }
    }

    /// Emitter over a live device stream; enables the idle guard.
    pub fn new_live(out: W) -> Self {
        CammEmitter {
            live_stream: true,
            ..CammEmitter::new(out)
        }
    }

    /// Disable or re-enable the idle guard.
    pub fn set_idle_guard(&mut self, enabled: bool) {
        self.idle_guard = enabled;
    }

    #[cfg(test)]
    pub(crate) fn set_idle_timeout(&mut self, timeout: Duration) {
        self.idle_timeout = timeout;
    }

    /// Tracked machine state (for inspection).
    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Take the sink back.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_raw(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.last_emit = Some(Instant::now());
        Ok(())
    }

    /// Write a command, refreshing a stale pen-down state first when the
    /// sink is live.  Best-effort: the guard itself never raises an error
    /// beyond the write.
    fn emit(&mut self, command: &str) -> Result<()> {
        if self.live_stream
            && self.idle_guard
            && self.state.pen_down == Some(true)
            && self
                .last_emit
                .map_or(false, |at| at.elapsed() > self.idle_timeout)
        {
            self.write_raw("PD;")?;
        }
        self.write_raw(command)
    }

    /// Issue the minimal setter for one condition.
    pub fn apply(&mut self, op: SetOp) -> Result<()> {
        match op {
            SetOp::Pen(true) => self.emit("PD;")?,
            SetOp::Pen(false) => self.emit("PU;")?,
            SetOp::Mode(Mode::Absolute) => self.emit("PA;")?,
            SetOp::Mode(Mode::Relative) => self.emit("PR;")?,
            SetOp::Speed(v) => {
                let cmd = format!("VS{};", fmt_num(v));
                self.emit(&cmd)?;
            }
            SetOp::Tool(t) => {
                let cmd = format!("SP{};", t);
                self.emit(&cmd)?;
            }
            SetOp::Force(f) => {
                let cmd = format!("!FS{}\n", f);
                self.emit(&cmd)?;
            }
            SetOp::CharSize(w, h) => {
                let cmd = format!("SI{},{};", fmt_num(w), fmt_num(h));
                self.emit(&cmd)?;
            }
            SetOp::CharSlant(s) => {
                let cmd = format!("SL{};", fmt_num(s));
                self.emit(&cmd)?;
            }
        }
        match op {
            SetOp::Pen(down) => self.state.pen_down = Some(down),
            SetOp::Mode(mode) => self.state.mode = Some(mode),
            SetOp::Speed(v) => self.state.speed = Some(v),
            SetOp::Tool(t) => self.state.tool = Some(t),
            SetOp::Force(f) => self.state.force = Some(f),
            SetOp::CharSize(w, h) => self.state.char_size = Some((w, h)),
            SetOp::CharSlant(s) => self.state.char_slant = Some(s),
        }
        Ok(())
    }

    /// Satisfy any unmet preconditions with minimal setters.
    fn require(&mut self, conds: &[Cond]) -> Result<()> {
        for &cond in conds {
            if !self.state.satisfies(cond) {
                match cond {
                    Cond::Pen(down) => self.apply(SetOp::Pen(down))?,
                    Cond::Mode(mode) => self.apply(SetOp::Mode(mode))?,
                }
            }
        }
        Ok(())
    }

    /// Dispatch one operation: preconditions, command, post-conditions.
    fn run_op(&mut self, spec: &OpSpec, command: &str) -> Result<()> {
        self.require(spec.requires)?;
        self.emit(command)?;
        for &cond in spec.post {
            self.state.establish(cond);
        }
        Ok(())
    }

    /// Initialise the device.  The leading escape byte resets a cutter
    /// left in label mode.
    pub fn header(&mut self) -> Result<()> {
        let escape = self.state.escape;
        let command = format!("{escape}IN;");
        self.run_op(&ops::HEADER, &command)
    }

    /// Park the carriage and deselect the tool.
    pub fn footer(&mut self) -> Result<()> {
        self.run_op(&ops::FOOTER, "PU0,0;")?;
        self.apply(SetOp::Tool(0))
    }

    /// Raise the tool.
    pub fn tool_up(&mut self) -> Result<()> {
        self.run_op(&ops::TOOL_UP, "PU;")
    }

    /// Lower the tool.
    pub fn tool_down(&mut self) -> Result<()> {
        self.run_op(&ops::TOOL_DOWN, "PD;")
    }

    /// Pen-up move to an absolute position.
    pub fn moveto(&mut self, p: Vector2) -> Result<()> {
        let command = format!("PU{},{};", fmt_num(p.x), fmt_num(p.y));
        self.run_op(&ops::MOVETO, &command)
    }

    /// Pen-down move to an absolute position.
    pub fn lineto(&mut self, p: Vector2) -> Result<()> {
        let command = format!("PD{},{};", fmt_num(p.x), fmt_num(p.y));
        self.run_op(&ops::LINETO, &command)
    }

    /// Pen-down move through several absolute positions.
    pub fn polylineto(&mut self, points: &[Vector2]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let command = format!("PD{};", join_coords(points));
        self.run_op(&ops::POLYLINETO, &command)
    }

    /// Pen-up move by a relative offset.
    pub fn moveto_relative(&mut self, delta: Vector2) -> Result<()> {
        let command = format!("PU{},{};", fmt_num(delta.x), fmt_num(delta.y));
        self.run_op(&ops::MOVETO_RELATIVE, &command)
    }

    /// Pen-down move by a relative offset.
    pub fn lineto_relative(&mut self, delta: Vector2) -> Result<()> {
        let command = format!("PD{},{};", fmt_num(delta.x), fmt_num(delta.y));
        self.run_op(&ops::LINETO_RELATIVE, &command)
    }

    /// Pen-down move through several relative offsets.
    pub fn polylineto_relative(&mut self, deltas: &[Vector2]) -> Result<()> {
        if deltas.is_empty() {
            return Ok(());
        }
        let command = format!("PD{};", join_coords(deltas));
        self.run_op(&ops::POLYLINETO_RELATIVE, &command)
    }

    /// Full circle of the given radius around the current position.
    pub fn circle(&mut self, radius: f64) -> Result<()> {
        let command = format!("CI{};", fmt_num(radius));
        self.run_op(&ops::CIRCLE, &command)
    }

    /// Arc around an absolute centre, sweeping `angle` degrees.
    pub fn arc(&mut self, center: Vector2, angle: f64) -> Result<()> {
        let command = format!(
            "AA{},{},{};",
            fmt_num(center.x),
            fmt_num(center.y),
            fmt_num(angle)
        );
        self.run_op(&ops::ARC, &command)
    }

    /// Arc around a centre relative to the current position.
    pub fn arc_relative(&mut self, center: Vector2, angle: f64) -> Result<()> {
        let command = format!(
            "AR{},{},{};",
            fmt_num(center.x),
            fmt_num(center.y),
            fmt_num(angle)
        );
        self.run_op(&ops::ARC_RELATIVE, &command)
    }

    /// Label text, terminated with the current escape byte.
    pub fn label(&mut self, text: &str) -> Result<()> {
        let escape = self.state.escape;
        let command = format!("LB{text}{escape}");
        self.run_op(&ops::LABEL, &command)
    }

    /// Velocity in device speed units.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        self.apply(SetOp::Speed(speed))
    }

    /// Tool slot.
    pub fn set_tool(&mut self, tool: u8) -> Result<()> {
        self.apply(SetOp::Tool(tool))
    }

    /// Blade force.
    pub fn set_force(&mut self, force: i32) -> Result<()> {
        self.apply(SetOp::Force(force))
    }
}

fn join_coords(points: &[Vector2]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Format a coordinate: up to six decimals, trailing zeros trimmed.
pub fn fmt_num(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
