//! Knife-offset compensation
//!
//! A drag-knife blade trails the carriage by a constant offset along the
//! direction of travel.  To keep the blade on the real geometry the
//! carriage must aim past each target point, and corners must pivot the
//! blade with a small arc centred on the blade position.

use crate::camm::emitter::CammEmitter;
use crate::error::Result;
use crate::types::Vector2;
use std::io::Write;

/// Cutting parameters.
#[derive(Debug, Clone)]
pub struct KnifeConfig {
    /// Blade trail distance; `0` disables compensation entirely.
    pub offset: f64,
    /// Points closer than this to the blade are skipped.
    pub epsilon: f64,
    /// Corners turning less than this (radians) need no pivot arc.
    pub small_angle: f64,
    /// Segments longer than this always pivot, however small the turn.
    pub short_line: f64,
    /// Enter each path at its first point instead of offsetting the
    /// carriage along the trailing direction.
    pub offsetless_start: bool,
    /// Emit uncompensated polylines in relative coordinates.
    pub relative: bool,
}

impl Default for KnifeConfig {
    fn default() -> Self {
        KnifeConfig {
            offset: 0.0,
            epsilon: 1e-4,
            small_angle: 10f64.to_radians(),
            short_line: 0.5,
            offsetless_start: false,
            relative: false,
        }
    }
}

/// Tracks the blade across polylines so consecutive paths keep their
/// trailing direction.
pub struct KnifeCutter {
    config: KnifeConfig,
    knife: Option<Vector2>,
    direction: Option<Vector2>,
}

impl KnifeCutter {
    /// Create a cutter with the given parameters.
    pub fn new(config: KnifeConfig) -> Self {
        KnifeCutter {
            config,
            knife: None,
            direction: None,
        }
    }

    /// Cut one polyline, compensating for the blade offset when enabled.
    pub fn cut<W: Write>(
        &mut self,
        emitter: &mut CammEmitter<W>,
        points: &[Vector2],
    ) -> Result<()> {
        let Some(&first) = points.first() else {
            return Ok(());
        };

        if self.config.offset <= 0.0 {
            return self.cut_plain(emitter, first, &points[1..]);
        }

        // Enter the path: with a known trailing direction the carriage
        // aims past the first point so the blade lands exactly on it.
        match self.direction {
            Some(direction) if !self.config.offsetless_start => {
                emitter.moveto(first + direction * self.config.offset)?;
            }
            _ => {
                emitter.moveto(first)?;
                self.direction = None;
            }
        }
        self.knife = Some(first);

        let eps2 = self.config.epsilon * self.config.epsilon;
        for &target in &points[1..] {
            let knife = self.knife.expect("set on path entry");
            if target.distance_squared(&knife) <= eps2 {
                continue;
            }
            let segment = target - knife;
            let direction = segment.normalize();

            match self.direction {
                None => {
                    // Cold start: a short cut along the segment swings the
                    // blade into the travel direction without moving it off
                    // the start point.
                    emitter.lineto(knife + direction * self.config.offset)?;
                }
                Some(prior) => {
                    let turn = prior.angle_to(&direction);
                    let pivot = turn.abs() > self.config.small_angle
                        || segment.length() > self.config.short_line;
                    if pivot && turn.abs() > 1e-9 {
                        emitter.arc(knife, turn.to_degrees())?;
                    }
                }
            }

            // Aim past the target; the trailing blade stops on it.
            emitter.lineto(target + direction * self.config.offset)?;
            self.knife = Some(target);
            self.direction = Some(direction);
        }
        Ok(())
    }

    fn cut_plain<W: Write>(
        &mut self,
        emitter: &mut CammEmitter<W>,
        first: Vector2,
        rest: &[Vector2],
    ) -> Result<()> {
        emitter.moveto(first)?;
        if self.config.relative {
            let mut position = first;
            let deltas: Vec<Vector2> = rest
                .iter()
                .map(|&p| {
                    let delta = p - position;
                    position = p;
                    delta
                })
                .collect();
            emitter.polylineto_relative(&deltas)?;
        } else {
            emitter.polylineto(rest)?;
        }
        if let Some(&last) = rest.last() {
            self.knife = Some(last);
        } else {
            self.knife = Some(first);
        }
        self.direction = None;
        Ok(())
    }
}
