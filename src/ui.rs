use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};

use crate::cell::ColumnKind;
use crate::domain::HELP_TEXT;
use crate::model::TabularModel;
use crate::view::{MenuAction, Mode, ScopeTable};

pub fn draw<M: TabularModel>(frame: &mut Frame, view: &mut ScopeTable<M>) {
    view.ensure_widths();
    let [table_area, status_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

    draw_table(frame, table_area, view);
    draw_status(frame, status_area, view);

    match view.mode {
        Mode::Menu => draw_menu(frame, view),
        Mode::Help => draw_help(frame),
        Mode::Table => {}
    }
}

fn draw_table<M: TabularModel>(frame: &mut Frame, area: Rect, view: &mut ScopeTable<M>) {
    let block = Block::default().borders(Borders::ALL).title(" Scope ");
    let inner = block.inner(area);
    // First inner line is the header; clicks translate against the rest.
    view.data_area = Rect {
        x: inner.x,
        y: inner.y.saturating_add(1),
        width: inner.width,
        height: inner.height.saturating_sub(1),
    };

    let header_cells: Vec<Cell> = (0..view.column_count)
        .map(|col| {
            let name = view.model().column_name(col).unwrap_or("").to_string();
            let indicator = match view.sort {
                Some((sort_col, ascending)) if sort_col == col => {
                    if ascending { "▲" } else { "▼" }
                }
                _ => "",
            };
            let style = if col == view.cursor_column {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Cell::from(Span::styled(format!("{}{}", name, indicator), style))
        })
        .collect();
    let header = Row::new(header_cells).height(1);

    // One renderer per column, picked from the model's type classification.
    let kinds: Vec<ColumnKind> = (0..view.column_count)
        .map(|col| view.model().column_kind(col))
        .collect();

    // Rows keep the default background; the highlight row is the only one
    // that gets the selection style.
    let rows: Vec<Row> = view
        .order
        .iter()
        .enumerate()
        .map(|(view_row, &model_row)| {
            let cells: Vec<Cell> = (0..view.column_count)
                .map(|col| render_cell(view.cell_text(model_row, col), kinds[col]))
                .collect();
            let style = if view.marked.contains(&view_row) {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(cells).style(style).height(1)
        })
        .collect();

    let mut constraints: Vec<Constraint> = view
        .widths
        .iter()
        .map(|&w| Constraint::Length(w))
        .collect();
    constraints.push(Constraint::Fill(1));

    let table = Table::new(rows, constraints)
        .header(header)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    if view.row_count > 0 {
        view.ratatui_state.select(Some(view.cursor));
    } else {
        view.ratatui_state.select(None);
    }
    frame.render_stateful_widget(table, area, &mut view.ratatui_state);
}

/// Numeric and timestamp columns render right aligned, everything else
/// (booleans included, they show as checkboxes) left aligned.
fn render_cell(text: String, kind: ColumnKind) -> Cell<'static> {
    match kind {
        ColumnKind::Integer | ColumnKind::Float | ColumnKind::Timestamp => {
            Cell::from(Text::from(text).alignment(Alignment::Right))
        }
        ColumnKind::Boolean | ColumnKind::Text => Cell::from(text),
    }
}

fn draw_status<M: TabularModel>(frame: &mut Frame, area: Rect, view: &ScopeTable<M>) {
    let line = Line::from(vec![
        Span::styled(
            format!(
                " {} rows, {} checked ",
                view.row_count,
                view.checked_count()
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("| {} ", view.status_message)),
        Span::styled("| ?: help  m: menu  q: quit", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_menu<M: TabularModel>(frame: &mut Frame, view: &ScopeTable<M>) {
    let width = MenuAction::ALL
        .iter()
        .map(|a| a.label().len())
        .max()
        .unwrap_or(0) as u16
        + 4;
    // 5 actions, two separators, two border lines
    let height: u16 = 9;
    let area = anchored_rect(view.menu_anchor, width, height, frame.area());

    let inner_width = width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for (idx, action) in MenuAction::ALL.iter().enumerate() {
        let style = if idx == view.menu_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(" {:w$}", action.label(), w = inner_width.saturating_sub(1)),
            style,
        )));
        // Group the all-row and selected-row actions like the menu entries
        // they mirror.
        if idx == 1 || idx == 3 {
            lines.push(Line::from("─".repeat(inner_width)));
        }
    }

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Scope ")),
        area,
    );
}

fn draw_help(frame: &mut Frame) {
    let area = centered_rect(48, 16, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(HELP_TEXT)
            .block(Block::default().borders(Borders::ALL).title(" Help ")),
        area,
    );
}

fn anchored_rect(anchor: (u16, u16), width: u16, height: u16, bounds: Rect) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    let x = anchor
        .0
        .min(bounds.x + bounds.width.saturating_sub(width));
    let y = anchor
        .1
        .min(bounds.y + bounds.height.saturating_sub(height));
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn centered_rect(width: u16, height: u16, bounds: Rect) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    Rect {
        x: bounds.x + (bounds.width - width) / 2,
        y: bounds.y + (bounds.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_rect_clamps_to_bounds() {
        let bounds = Rect::new(0, 0, 80, 24);
        let r = anchored_rect((78, 22), 20, 9, bounds);
        assert_eq!(r.x + r.width, 80);
        assert_eq!(r.y + r.height, 24);
        let r = anchored_rect((5, 5), 20, 9, bounds);
        assert_eq!((r.x, r.y), (5, 5));
    }

    #[test]
    fn centered_rect_never_exceeds_bounds() {
        let bounds = Rect::new(0, 0, 30, 10);
        let r = centered_rect(48, 16, bounds);
        assert!(r.width <= bounds.width && r.height <= bounds.height);
    }
}
