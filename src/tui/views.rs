use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine, Rectangle};
use ratatui::widgets::*;

use crate::config::CanvasConfig;
use crate::draw::{DrawCommand, Rgba, TextAlign, WidgetState};
use crate::frame::FrameView;

const WIRE_SEGMENTS: usize = 16;
const PORT_RADIUS: f64 = 6.0;
const CONSOLE_ROWS: usize = 6;
const ERROR_ROWS: u16 = 7;

/// Render one frame. Returns the area the canvas was drawn into, which the
/// host uses to map mouse cells back to canvas coordinates.
pub fn render_frame(frame: &mut Frame, view: &FrameView<'_>, canvas: &CanvasConfig) -> Rect {
    let console_rows = view.console.len().min(CONSOLE_ROWS);
    let console_height = if console_rows == 0 { 0 } else { console_rows as u16 + 2 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(console_height),
        ])
        .split(frame.area());

    render_status_bar(frame, chunks[0], view);

    let error = view.message.filter(|_| view.show_error);
    let canvas_area = if let Some(message) = error {
        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(ERROR_ROWS)])
            .split(chunks[1]);
        render_error_panel(frame, main[1], message);
        main[0]
    } else {
        chunks[1]
    };

    let inner = render_canvas(frame, canvas_area, view, canvas);

    if console_height > 0 {
        render_console(frame, chunks[2], view.console);
    }

    inner
}

fn render_status_bar(frame: &mut Frame, area: Rect, view: &FrameView<'_>) {
    let entry = view
        .entry
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut spans = vec![
        Span::styled(" luminos ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(format!(" {:?} | {} | frame {} ", view.state, entry, view.frame)),
    ];
    if view.message.is_some() && !view.show_error {
        spans.push(Span::styled(
            "| error (F4) ",
            Style::default().fg(Color::Red).bold(),
        ));
    }
    spans.push(Span::styled(
        "| F4 errors  F5 reload  Ctrl+Q quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_canvas(frame: &mut Frame, area: Rect, view: &FrameView<'_>, canvas: &CanvasConfig) -> Rect {
    let block = Block::default().borders(Borders::ALL).title("Canvas");
    let inner = block.inner(area);

    let width = f64::from(canvas.width);
    let height = f64::from(canvas.height);
    let cell_width = width / f64::from(inner.width.max(1));
    let widget = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for command in &view.draw.commands {
                paint_command(ctx, command, height, cell_width);
            }
            ctx.print(
                f64::from(view.pointer.x),
                height - f64::from(view.pointer.y),
                Span::styled("+", Style::default().fg(Color::White).bold()),
            );
        });
    frame.render_widget(widget, area);

    inner
}

fn paint_command(ctx: &mut Context<'_>, command: &DrawCommand, height: f64, cell_width: f64) {
    // Scripts draw with y growing downwards
    let flip = |y: f32| height - f64::from(y);

    match command {
        DrawCommand::Node {
            x,
            y,
            w,
            h,
            state,
            title,
            color,
        } => {
            let color = state_color(*state, *color);
            ctx.draw(&Rectangle {
                x: f64::from(*x),
                y: flip(*y + *h),
                width: f64::from(*w),
                height: f64::from(*h),
                color,
            });
            ctx.print(
                f64::from(*x) + 4.0,
                flip(*y) - 4.0,
                Span::styled(title.clone(), Style::default().fg(color)),
            );
        }
        DrawCommand::Port { x, y, state, color } => {
            ctx.draw(&Circle {
                x: f64::from(*x),
                y: flip(*y),
                radius: PORT_RADIUS,
                color: state_color(*state, *color),
            });
        }
        DrawCommand::Wire {
            x0,
            y0,
            x1,
            y1,
            start,
            end,
        } => {
            let color = wire_color(*start, *end);
            for (ax, ay, bx, by) in wire_segments(
                (f64::from(*x0), flip(*y0)),
                (f64::from(*x1), flip(*y1)),
            ) {
                ctx.draw(&CanvasLine {
                    x1: ax,
                    y1: ay,
                    x2: bx,
                    y2: by,
                    color,
                });
            }
        }
        DrawCommand::Text {
            x,
            y,
            text,
            color,
            style,
        } => {
            let span_width = text.chars().count() as f64 * cell_width;
            ctx.print(
                aligned_x(f64::from(*x), style.align, span_width),
                flip(*y),
                Span::styled(text.clone(), Style::default().fg(rgb(*color))),
            );
        }
    }
}

fn render_error_panel(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(message.to_string())
        .block(
            Block::default()
                .title("Error (F4 to hide)")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_console(frame: &mut Frame, area: Rect, lines: &[String]) {
    let start = lines.len().saturating_sub(CONSOLE_ROWS);
    let items: Vec<ListItem> = lines[start..]
        .iter()
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    let list = List::new(items)
        .block(Block::default().title("Console").borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(list, area);
}

fn rgb(color: Rgba) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

fn state_color(state: WidgetState, color: Rgba) -> Color {
    match state {
        WidgetState::Default => rgb(color),
        WidgetState::Hover => Color::LightCyan,
        WidgetState::Active => Color::Yellow,
    }
}

fn wire_color(start: WidgetState, end: WidgetState) -> Color {
    if start == WidgetState::Active || end == WidgetState::Active {
        Color::Yellow
    } else if start == WidgetState::Hover || end == WidgetState::Hover {
        Color::LightCyan
    } else {
        Color::Gray
    }
}

/// Straight segments approximating the horizontal-tangent bezier between two
/// ports.
/// Left edge of a text span anchored at `x`. Font size has no terminal
/// counterpart and is not applied.
pub fn aligned_x(x: f64, align: TextAlign, span_width: f64) -> f64 {
    match align {
        TextAlign::Left => x,
        TextAlign::Center => x - span_width / 2.0,
        TextAlign::Right => x - span_width,
    }
}

pub fn wire_segments(from: (f64, f64), to: (f64, f64)) -> Vec<(f64, f64, f64, f64)> {
    let bend = ((to.0 - from.0).abs() / 2.0).max(40.0);
    let c0 = (from.0 + bend, from.1);
    let c1 = (to.0 - bend, to.1);

    let point = |t: f64| {
        let u = 1.0 - t;
        let x = u * u * u * from.0 + 3.0 * u * u * t * c0.0 + 3.0 * u * t * t * c1.0 + t * t * t * to.0;
        let y = u * u * u * from.1 + 3.0 * u * u * t * c0.1 + 3.0 * u * t * t * c1.1 + t * t * t * to.1;
        (x, y)
    };

    (0..WIRE_SEGMENTS)
        .map(|i| {
            let (ax, ay) = point(i as f64 / WIRE_SEGMENTS as f64);
            let (bx, by) = point((i + 1) as f64 / WIRE_SEGMENTS as f64);
            (ax, ay, bx, by)
        })
        .collect()
}

/// Map a terminal cell to canvas coordinates. Cells outside `area` are
/// clamped to its edge.
pub fn cell_to_canvas(area: Rect, canvas: &CanvasConfig, column: u16, row: u16) -> (f32, f32) {
    if area.width == 0 || area.height == 0 {
        return (0.0, 0.0);
    }
    let col = column.clamp(area.x, area.x + area.width - 1) - area.x;
    let row = row.clamp(area.y, area.y + area.height - 1) - area.y;
    let x = (f32::from(col) + 0.5) * canvas.width / f32::from(area.width);
    let y = (f32::from(row) + 0.5) * canvas.height / f32::from(area.height);
    (x, y)
}
