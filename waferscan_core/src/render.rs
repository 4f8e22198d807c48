//! Schematic renderer: pure projection from cycle state to draw commands.
//!
//! `render_schematic` computes the full command list for one frame; a thin
//! executor (the [`DrawSurface`] impl) replays those commands onto a real
//! drawing backend. Keeping the projection pure means every visual rule -
//! sweep position, marker colors, critical emphasis, labels - is unit
//! testable without any rendering backend.

use crate::cycle::CycleState;
use crate::fixtures::{DefectRecord, Severity};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Wafer disk background fill.
const WAFER_FILL: [u8; 4] = [30, 41, 59, 255];
/// Wafer disk border stroke.
const WAFER_BORDER: [u8; 4] = [148, 163, 184, 255];
/// Horizontal grid lines.
const GRID_MAJOR: [u8; 4] = [71, 85, 105, 160];
/// Vertical grid lines (lightweight).
const GRID_MINOR: [u8; 4] = [71, 85, 105, 90];
/// Scan sweep line.
const SWEEP_LINE: [u8; 4] = [34, 211, 238, 255];
/// Semi-transparent "already scanned" fill above the sweep.
const SCANNED_FILL: [u8; 4] = [34, 211, 238, 40];
/// Text labels (defect tags and wafer caption).
const LABEL_COLOR: [u8; 4] = [226, 232, 240, 255];

/// Extra stroked-outline radius for critical defect emphasis.
const CRITICAL_RING_OFFSET: f64 = 5.0;
/// Vertical gap between the disk and the wafer caption.
const CAPTION_OFFSET: f64 = 20.0;

/// Fixed drawing-surface geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
    pub width: f64,
    pub height: f64,
    pub wafer_radius: f64,
    pub grid_spacing: f64,
}

impl SurfaceSpec {
    /// Center of the wafer disk: the surface midpoint.
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Top-left corner of the disk's bounding box.
    pub fn bounding_top_left(&self) -> Point2<f64> {
        let c = self.center();
        Point2::new(c.x - self.wafer_radius, c.y - self.wafer_radius)
    }

    /// Maps fixture-relative defect coordinates into surface coordinates.
    pub fn defect_position(&self, defect: &DefectRecord) -> Point2<f64> {
        let c = self.center();
        Point2::new(
            c.x + defect.x - self.wafer_radius,
            c.y + defect.y - self.wafer_radius,
        )
    }
}

impl Default for SurfaceSpec {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 400.0,
            wafer_radius: 150.0,
            grid_spacing: 25.0,
        }
    }
}

/// One drawing primitive. Colors are RGBA.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Clear the whole surface.
    Clear,
    /// Filled disk with a stroked border.
    Disk {
        center: Point2<f64>,
        radius: f64,
        fill: [u8; 4],
        stroke: [u8; 4],
    },
    /// Straight line segment.
    Line {
        from: Point2<f64>,
        to: Point2<f64>,
        color: [u8; 4],
    },
    /// Axis-aligned filled rectangle.
    FillRect {
        min: Point2<f64>,
        max: Point2<f64>,
        color: [u8; 4],
    },
    /// Circle marker, filled or stroked.
    Circle {
        center: Point2<f64>,
        radius: f64,
        color: [u8; 4],
        filled: bool,
    },
    /// Short text label anchored at a point.
    Label {
        anchor: Point2<f64>,
        text: String,
        color: [u8; 4],
        centered: bool,
    },
}

/// The slice of cycle state the renderer projects from.
#[derive(Clone, Copy, Debug)]
pub struct RenderView<'a> {
    pub wafer_id: u32,
    pub progress: u8,
    pub running: bool,
    pub defects: &'a [DefectRecord],
}

impl<'a> RenderView<'a> {
    pub fn from_state(state: &'a CycleState) -> Self {
        Self {
            wafer_id: state.current_wafer_id,
            progress: state.progress,
            running: state.running,
            defects: &state.revealed_defects,
        }
    }
}

/// Thin executor seam: replays draw commands onto a concrete backend.
pub trait DrawSurface {
    fn apply(&mut self, cmd: &DrawCommand);

    fn replay(&mut self, cmds: &[DrawCommand]) {
        for cmd in cmds {
            self.apply(cmd);
        }
    }
}

/// Computes the draw-command list for one frame.
///
/// Re-evaluated on every observable state change. Command order is part of
/// the contract: clear, disk, grid, sweep (while running), defect markers in
/// list order, wafer caption.
pub fn render_schematic(view: &RenderView<'_>, spec: &SurfaceSpec) -> Vec<DrawCommand> {
    let mut cmds = Vec::new();
    let center = spec.center();
    let r = spec.wafer_radius;
    let top_left = spec.bounding_top_left();

    cmds.push(DrawCommand::Clear);

    cmds.push(DrawCommand::Disk {
        center,
        radius: r,
        fill: WAFER_FILL,
        stroke: WAFER_BORDER,
    });

    // Square grid over the disk bounding box. Lines outside the disk are an
    // accepted visual artifact; the grid is not clipped to the circle.
    let span = 2.0 * r;
    let steps = (span / spec.grid_spacing) as u32;
    for i in 0..=steps {
        let offset = i as f64 * spec.grid_spacing;
        cmds.push(DrawCommand::Line {
            from: Point2::new(top_left.x, top_left.y + offset),
            to: Point2::new(top_left.x + span, top_left.y + offset),
            color: GRID_MAJOR,
        });
        cmds.push(DrawCommand::Line {
            from: Point2::new(top_left.x + offset, top_left.y),
            to: Point2::new(top_left.x + offset, top_left.y + span),
            color: GRID_MINOR,
        });
    }

    if view.running {
        let sweep_y = top_left.y + view.progress as f64 / 100.0 * span;
        cmds.push(DrawCommand::FillRect {
            min: top_left,
            max: Point2::new(top_left.x + span, sweep_y),
            color: SCANNED_FILL,
        });
        cmds.push(DrawCommand::Line {
            from: Point2::new(top_left.x, sweep_y),
            to: Point2::new(top_left.x + span, sweep_y),
            color: SWEEP_LINE,
        });
    }

    for (index, defect) in view.defects.iter().enumerate() {
        let pos = spec.defect_position(defect);
        let color = defect.severity.color();

        cmds.push(DrawCommand::Circle {
            center: pos,
            radius: defect.size_um,
            color,
            filled: true,
        });

        // Static emphasis ring for critical defects; no pulsing.
        if defect.severity == Severity::Critical {
            cmds.push(DrawCommand::Circle {
                center: pos,
                radius: defect.size_um + CRITICAL_RING_OFFSET,
                color,
                filled: false,
            });
        }

        cmds.push(DrawCommand::Label {
            anchor: Point2::new(pos.x + defect.size_um + 2.0, pos.y - defect.size_um - 2.0),
            text: format!("D{}", index + 1),
            color: LABEL_COLOR,
            centered: false,
        });
    }

    cmds.push(DrawCommand::Label {
        anchor: Point2::new(center.x, center.y + r + CAPTION_OFFSET),
        text: format!("WAFER-{:03}", view.wafer_id),
        color: LABEL_COLOR,
        centered: true,
    });

    cmds
}
