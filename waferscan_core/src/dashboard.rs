//! WaferScan TUI Dashboard Module
//! ===============================
//!
//! Interactive terminal dashboard for the scan-cycle simulation. Uses
//! Ratatui for rendering; the schematic pane replays the pure draw-command
//! projection through a canvas-backed [`DrawSurface`] executor.
//!
//! Enable with the `dashboard` feature flag.
//!
//! Controls:
//! - `s` - start scan
//! - `n` - next wafer (reset)
//! - `q` / Esc - quit

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle as CanvasCircle, Context, Line as CanvasLine, Rectangle},
        Block, Borders, Gauge, Paragraph, Row, Table,
    },
    Frame, Terminal,
};
use waferscan_env::{EnvError, InspectionContext};

use crate::cycle::{Phase, ScanCycleController};
use crate::metrics::InspectionSummary;
use crate::render::{render_schematic, DrawCommand, DrawSurface, RenderView, SurfaceSpec};

// =============================================================================
// CANVAS EXECUTOR
// =============================================================================

/// Vertical spacing of the rasterized fill chords, in surface units.
const FILL_CHORD_STEP: f64 = 6.0;

/// Replays draw commands onto a ratatui canvas context.
///
/// The canvas y-axis points up while draw commands use screen coordinates
/// (y down), so every y is flipped. Terminal cells have no alpha channel;
/// translucent colors degrade to a proportionally dimmed RGB.
struct CanvasSurface<'a, 'b> {
    ctx: &'a mut Context<'b>,
    height: f64,
}

impl CanvasSurface<'_, '_> {
    fn flip(&self, y: f64) -> f64 {
        self.height - y
    }
}

fn to_color(rgba: [u8; 4]) -> Color {
    let [r, g, b, a] = rgba;
    let dim = |v: u8| ((v as u16 * a as u16) / 255) as u8;
    Color::Rgb(dim(r), dim(g), dim(b))
}

impl DrawSurface for CanvasSurface<'_, '_> {
    fn apply(&mut self, cmd: &DrawCommand) {
        match cmd {
            // The canvas starts each frame empty.
            DrawCommand::Clear => {}
            DrawCommand::Disk {
                center,
                radius,
                fill,
                stroke,
            } => {
                // Rasterize the fill as horizontal chords, then stroke the rim.
                let mut dy = -radius + FILL_CHORD_STEP;
                while dy < *radius {
                    let half = (radius * radius - dy * dy).sqrt();
                    self.ctx.draw(&CanvasLine {
                        x1: center.x - half,
                        y1: self.flip(center.y + dy),
                        x2: center.x + half,
                        y2: self.flip(center.y + dy),
                        color: to_color(*fill),
                    });
                    dy += FILL_CHORD_STEP;
                }
                self.ctx.draw(&CanvasCircle {
                    x: center.x,
                    y: self.flip(center.y),
                    radius: *radius,
                    color: to_color(*stroke),
                });
            }
            DrawCommand::Line { from, to, color } => {
                self.ctx.draw(&CanvasLine {
                    x1: from.x,
                    y1: self.flip(from.y),
                    x2: to.x,
                    y2: self.flip(to.y),
                    color: to_color(*color),
                });
            }
            DrawCommand::FillRect { min, max, color } => {
                self.ctx.draw(&Rectangle {
                    x: min.x,
                    y: self.flip(max.y),
                    width: max.x - min.x,
                    height: max.y - min.y,
                    color: to_color(*color),
                });
            }
            DrawCommand::Circle {
                center,
                radius,
                color,
                filled,
            } => {
                self.ctx.draw(&CanvasCircle {
                    x: center.x,
                    y: self.flip(center.y),
                    radius: *radius,
                    color: to_color(*color),
                });
                if *filled && *radius > 2.0 {
                    self.ctx.draw(&CanvasCircle {
                        x: center.x,
                        y: self.flip(center.y),
                        radius: radius / 2.0,
                        color: to_color(*color),
                    });
                }
            }
            DrawCommand::Label {
                anchor,
                text,
                color,
                centered,
            } => {
                let x = if *centered {
                    anchor.x - text.len() as f64 * 2.5
                } else {
                    anchor.x
                };
                self.ctx.print(
                    x,
                    self.flip(anchor.y),
                    Line::styled(text.clone(), Style::default().fg(to_color(*color))),
                );
            }
        }
    }
}

// =============================================================================
// INSPECTION DASHBOARD
// =============================================================================

/// TUI dashboard wrapping a scan-cycle controller.
pub struct InspectionDashboard<C: InspectionContext> {
    controller: ScanCycleController,
    ctx: Arc<C>,
    spec: SurfaceSpec,
    frame_count: usize,
}

impl<C: InspectionContext> InspectionDashboard<C> {
    /// Creates a dashboard over the given controller and clock.
    pub fn new(controller: ScanCycleController, ctx: Arc<C>) -> Self {
        Self {
            controller,
            ctx,
            spec: SurfaceSpec::default(),
            frame_count: 0,
        }
    }

    /// Run the TUI main loop (blocks until 'q' pressed).
    pub fn run(&mut self) -> Result<(), EnvError> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // A draw or input error mid-loop must not leave the shell in raw
        // mode, so the restore sequence runs before the result propagates.
        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), EnvError> {
        loop {
            // Fire any tick/reveal deadlines that came due since last frame
            self.controller.poll(self.ctx.now());

            terminal.draw(|f| self.ui(f))?;
            self.frame_count += 1;

            // Handle input (non-blocking with 50ms timeout)
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('s') => self.controller.start(self.ctx.now()),
                        KeyCode::Char('n') => self.controller.reset(),
                        _ => {}
                    }
                }
            }
        }
    }

    /// Render the UI
    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(10),   // Schematic + side panel
                Constraint::Length(1), // Footer
            ])
            .split(f.area());

        // === HEADER ===
        let (phase_text, phase_color) = match self.controller.phase() {
            Phase::Idle => ("IDLE", Color::DarkGray),
            Phase::Scanning => ("SCANNING", Color::Cyan),
            Phase::Revealing => ("REVEALING", Color::Yellow),
            Phase::Complete => ("COMPLETE", Color::Green),
        };
        let state = self.controller.state();
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "WaferScan Inspection Dashboard",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  |  "),
            Span::styled(
                format!("WAFER-{:03}", state.current_wafer_id),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  |  "),
            Span::styled(
                phase_text,
                Style::default().fg(phase_color).add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(header, chunks[0]);

        // === BODY ===
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        self.schematic_pane(f, body[0]);
        self.side_panel(f, body[1]);

        // === FOOTER ===
        let footer = Paragraph::new("s: start scan | n: next wafer | q: quit")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(footer, chunks[2]);
    }

    fn schematic_pane(&self, f: &mut Frame, area: ratatui::layout::Rect) {
        let view = RenderView::from_state(self.controller.state());
        let cmds = render_schematic(&view, &self.spec);
        let (width, height) = (self.spec.width, self.spec.height);

        let canvas = Canvas::default()
            .block(Block::default().title("Wafer Schematic").borders(Borders::ALL))
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(move |ctx| {
                let mut surface = CanvasSurface { ctx, height };
                surface.replay(&cmds);
            });
        f.render_widget(canvas, area);
    }

    fn side_panel(&self, f: &mut Frame, area: ratatui::layout::Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Progress gauge
                Constraint::Length(6), // Summary
                Constraint::Min(4),    // Defect table
            ])
            .split(area);

        let state = self.controller.state();
        let summary = InspectionSummary::from_state(state);

        // Progress gauge
        let gauge_color = if state.running {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let gauge = Gauge::default()
            .block(Block::default().title("Scan Progress").borders(Borders::ALL))
            .gauge_style(Style::default().fg(gauge_color))
            .percent(state.progress as u16)
            .label(format!("{}%", state.progress));
        f.render_widget(gauge, chunks[0]);

        // Summary read-outs
        let yield_color = if summary.yield_rate >= 95.0 {
            Color::Green
        } else if summary.yield_rate >= 90.0 {
            Color::Yellow
        } else {
            Color::Red
        };
        let summary_text = vec![
            Line::from(format!("Elapsed:   {} ms", summary.elapsed_ms)),
            Line::from(format!("Defects:   {}", summary.defect_count)),
            Line::from(vec![
                Span::raw("Yield:     "),
                Span::styled(
                    format!("{:.1}%", summary.yield_rate),
                    Style::default().fg(yield_color),
                ),
            ]),
            Line::from(format!("Processed: {}", summary.wafers_processed)),
        ];
        let summary_widget = Paragraph::new(summary_text)
            .block(Block::default().title("Summary").borders(Borders::ALL));
        f.render_widget(summary_widget, chunks[1]);

        // Per-defect detail table
        let header_cells = ["#", "Category", "Severity", "Size", "Position"]
            .iter()
            .map(|h| Span::styled(*h, Style::default().add_modifier(Modifier::BOLD)));
        let header = Row::new(header_cells).height(1);

        let rows: Vec<Row> = state
            .revealed_defects
            .iter()
            .enumerate()
            .map(|(i, d)| {
                Row::new(vec![
                    Span::raw(format!("D{}", i + 1)),
                    Span::raw(d.category.label()),
                    Span::styled(d.severity.label(), Style::default().fg(to_color(d.severity.color()))),
                    Span::raw(format!("{:.0} um", d.size_um)),
                    Span::raw(format!("({:.0}, {:.0})", d.x, d.y)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Length(13),
                Constraint::Length(9),
                Constraint::Length(7),
                Constraint::Length(12),
            ],
        )
        .header(header)
        .block(Block::default().title("Defects").borders(Borders::ALL));
        f.render_widget(table, chunks[2]);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_alpha_dimming() {
        assert_eq!(to_color([255, 255, 255, 255]), Color::Rgb(255, 255, 255));
        // Translucent colors dim proportionally on terminal cells
        assert_eq!(to_color([255, 0, 255, 51]), Color::Rgb(51, 0, 51));
    }
}
