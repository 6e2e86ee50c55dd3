//! Freehand area capture.
//!
//! `AreaDrawing` is the gesture state machine: `Idle -> Drawing -> Idle`, with
//! the pointer release deciding between a committed polygon and an aborted
//! gesture. It only owns the sample buffer; publishing the resulting
//! [`Selection`] and toggling map panning is the page's job.

use crate::geometry::{distance_sq_deg, AreaPolygon, MIN_POLYGON_POINTS};
use crate::models::{BoundingBox, GeoPoint};

/// The area POIs are searched in. Exactly one is active at a time.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Selection {
    #[default]
    None,
    Viewport(BoundingBox),
    PolygonArea(AreaPolygon),
}

impl Selection {
    /// `None` and `Viewport` both follow the map viewport.
    pub fn is_viewport_driven(&self) -> bool {
        !matches!(self, Selection::PolygonArea(_))
    }

    pub fn polygon(&self) -> Option<&AreaPolygon> {
        match self {
            Selection::PolygonArea(p) => Some(p),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Selection::None => "none",
            Selection::Viewport(_) => "viewport",
            Selection::PolygonArea(_) => "polygon",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawPhase {
    Idle,
    Drawing,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GestureOutcome {
    Committed(AreaPolygon),
    Aborted { samples: usize },
}

impl GestureOutcome {
    /// The selection this outcome publishes.
    pub fn into_selection(self) -> Selection {
        match self {
            GestureOutcome::Committed(polygon) => Selection::PolygonArea(polygon),
            GestureOutcome::Aborted { .. } => Selection::None,
        }
    }
}

pub struct AreaDrawing {
    phase: DrawPhase,
    buffer: Vec<GeoPoint>,
    pointer_held: bool,
    tolerance_sq: f64,
}

impl AreaDrawing {
    /// `tolerance_deg` is the minimum spacing between recorded samples;
    /// zero records every event.
    pub fn new(tolerance_deg: f64) -> Self {
        Self {
            phase: DrawPhase::Idle,
            buffer: Vec::new(),
            pointer_held: false,
            tolerance_sq: tolerance_deg * tolerance_deg,
        }
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn is_drawing(&self) -> bool {
        self.phase == DrawPhase::Drawing
    }

    /// Enter `Drawing` with an empty buffer. Calling it while already drawing
    /// restarts the buffer; returns `true` in that case.
    pub fn begin(&mut self) -> bool {
        let restarted = self.is_drawing();
        self.phase = DrawPhase::Drawing;
        self.buffer.clear();
        self.pointer_held = false;
        restarted
    }

    pub fn pointer_down(&mut self, point: GeoPoint) -> bool {
        if !self.is_drawing() {
            return false;
        }
        self.pointer_held = true;
        self.record(point)
    }

    pub fn pointer_move(&mut self, point: GeoPoint) -> bool {
        if !self.is_drawing() || !self.pointer_held {
            return false;
        }
        self.record(point)
    }

    /// Finish the gesture. `None` when no gesture was in progress.
    pub fn pointer_up(&mut self) -> Option<GestureOutcome> {
        if !self.is_drawing() {
            return None;
        }
        let points = std::mem::take(&mut self.buffer);
        self.phase = DrawPhase::Idle;
        self.pointer_held = false;

        let samples = points.len();
        if samples < MIN_POLYGON_POINTS {
            return Some(GestureOutcome::Aborted { samples });
        }
        Some(
            AreaPolygon::closed_from(points)
                .map(GestureOutcome::Committed)
                .unwrap_or(GestureOutcome::Aborted { samples }),
        )
    }

    /// Leave `Drawing` without producing a selection.
    pub fn cancel(&mut self) -> bool {
        let was_drawing = self.is_drawing();
        self.phase = DrawPhase::Idle;
        self.buffer.clear();
        self.pointer_held = false;
        was_drawing
    }

    /// Open polyline of the samples so far.
    pub fn preview(&self) -> &[GeoPoint] {
        &self.buffer
    }

    fn record(&mut self, point: GeoPoint) -> bool {
        if !point.is_finite() {
            return false;
        }
        if let Some(last) = self.buffer.last() {
            if self.tolerance_sq > 0.0 && distance_sq_deg(last, &point) < self.tolerance_sq {
                return false;
            }
        }
        self.buffer.push(point);
        true
    }
}
