use arboard::Clipboard;
use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;
use tracing::{debug, trace};

use crate::cell::CellValue;
use crate::domain::{Message, ScopeConfig};
use crate::model::{FLAG_COLUMN, ModelEvent, TabularModel};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Table,
    Menu,
    Help,
}

/// The five bulk actions offered by the scope context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CheckAll,
    UncheckAll,
    CheckSelected,
    UncheckSelected,
    InvertSelection,
}

impl MenuAction {
    pub const ALL: [MenuAction; 5] = [
        MenuAction::CheckAll,
        MenuAction::UncheckAll,
        MenuAction::CheckSelected,
        MenuAction::UncheckSelected,
        MenuAction::InvertSelection,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::CheckAll => "Check all rows",
            MenuAction::UncheckAll => "Uncheck all rows",
            MenuAction::CheckSelected => "Check all selected rows",
            MenuAction::UncheckSelected => "Uncheck all selected rows",
            MenuAction::InvertSelection => "Invert selection",
        }
    }
}

/// Table view bound to a [`TabularModel`].
///
/// Keeps its own row ordering (user sortable) decoupled from the model's
/// storage order: `order[view_index] == model_index`. Shape metadata is
/// cached and re-queried when the model reports a structural change.
pub struct ScopeTable<M: TabularModel> {
    model: M,
    events: Receiver<ModelEvent>,
    config: ScopeConfig,
    pub status: Status,
    // Cached shape, only refreshed through model events
    pub(crate) row_count: usize,
    pub(crate) column_count: usize,
    pub(crate) order: Vec<usize>,
    pub(crate) sort: Option<(usize, bool)>,
    pub(crate) cursor: usize,
    pub(crate) cursor_column: usize,
    pub(crate) marked: BTreeSet<usize>,
    pub(crate) mode: Mode,
    pub(crate) menu_cursor: usize,
    pub(crate) menu_anchor: (u16, u16),
    pub(crate) status_message: String,
    pub(crate) widths: Vec<u16>,
    widths_dirty: bool,
    pub(crate) ratatui_state: TableState,
    // Set by the UI on every draw; used to translate mouse clicks.
    pub(crate) data_area: Rect,
}

const COLUMN_WIDTH_MARGIN: usize = 1;

impl Default for ScopeTable<crate::model::ScopeModel> {
    fn default() -> Self {
        Self::new(crate::model::ScopeModel::empty(), ScopeConfig::default())
    }
}

impl<M: TabularModel> ScopeTable<M> {
    pub fn new(mut model: M, config: ScopeConfig) -> Self {
        let events = model.subscribe();
        let mut view = ScopeTable {
            model,
            events,
            config,
            status: Status::READY,
            row_count: 0,
            column_count: 0,
            order: Vec::new(),
            sort: None,
            cursor: 0,
            cursor_column: 0,
            marked: BTreeSet::new(),
            mode: Mode::Table,
            menu_cursor: 0,
            menu_anchor: (0, 0),
            status_message: "Started stv!".to_string(),
            widths: Vec::new(),
            widths_dirty: true,
            ratatui_state: TableState::default(),
            data_area: Rect::default(),
        };
        view.requery_shape();
        view
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Replaces the model's header and content, in that order. The view
    /// refreshes itself from the resulting change notifications.
    pub fn set_model(&mut self, header: Vec<String>, rows: Vec<Vec<CellValue>>) {
        self.model.set_header(header);
        self.model.set_content(rows);
        self.pump_events();
    }

    /// Drains pending model notifications and refreshes cached state.
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            trace!(?event, "model event");
            match event {
                ModelEvent::StructureChanged => self.requery_shape(),
                ModelEvent::RowsInserted { .. } => self.reset_rows(),
                ModelEvent::CellUpdated { .. } => self.widths_dirty = true,
            }
        }
    }

    fn requery_shape(&mut self) {
        self.column_count = self.model.column_count();
        if self.cursor_column >= self.column_count {
            self.cursor_column = self.column_count.saturating_sub(1);
        }
        self.reset_rows();
    }

    fn reset_rows(&mut self) {
        self.row_count = self.model.row_count();
        self.order = (0..self.row_count).collect();
        self.sort = None;
        self.marked.clear();
        if self.cursor >= self.row_count {
            self.cursor = self.row_count.saturating_sub(1);
        }
        self.ratatui_state = TableState::default();
        self.widths_dirty = true;
        debug!(
            rows = self.row_count,
            columns = self.column_count,
            "view shape refreshed"
        );
    }

    pub fn update(&mut self, message: Message) {
        match self.mode {
            Mode::Table => match message {
                Message::Quit => self.status = Status::QUITTING,
                Message::MoveUp => self.move_cursor_up(1),
                Message::MoveDown => self.move_cursor_down(1),
                Message::MovePageUp => self.move_cursor_up(self.page_size()),
                Message::MovePageDown => self.move_cursor_down(self.page_size()),
                Message::MoveBeginning => self.move_cursor_to(0),
                Message::MoveEnd => self.move_cursor_to(self.row_count.saturating_sub(1)),
                Message::MoveLeft => {
                    self.cursor_column = self.cursor_column.saturating_sub(1);
                }
                Message::MoveRight => {
                    if self.cursor_column + 1 < self.column_count {
                        self.cursor_column += 1;
                    }
                }
                Message::ToggleFlag | Message::Enter => self.toggle_cursor_flag(),
                Message::ToggleMark => self.toggle_mark(),
                Message::Exit => {
                    self.marked.clear();
                    self.set_status_message("Marks cleared");
                }
                Message::OpenMenu => {
                    let anchor = (
                        self.data_area.x + 2,
                        self.data_area.y + self.cursor_screen_offset(),
                    );
                    self.open_menu(anchor);
                }
                Message::RightClick(x, y) => self.open_menu((x, y)),
                Message::LeftClick(x, y) => self.click_row(x, y),
                Message::SortAscending => self.sort_by(self.cursor_column, true),
                Message::SortDescending => self.sort_by(self.cursor_column, false),
                Message::CopyChecked => self.copy_checked(),
                Message::Help => self.mode = Mode::Help,
            },
            Mode::Menu => match message {
                Message::Quit => self.status = Status::QUITTING,
                Message::MoveUp => {
                    self.menu_cursor =
                        (self.menu_cursor + MenuAction::ALL.len() - 1) % MenuAction::ALL.len();
                }
                Message::MoveDown => {
                    self.menu_cursor = (self.menu_cursor + 1) % MenuAction::ALL.len();
                }
                Message::Enter => {
                    let action = MenuAction::ALL[self.menu_cursor];
                    self.mode = Mode::Table;
                    self.apply(action);
                }
                Message::Exit | Message::LeftClick(..) => self.mode = Mode::Table,
                Message::RightClick(x, y) => self.open_menu((x, y)),
                _ => (),
            },
            Mode::Help => match message {
                Message::Quit => self.status = Status::QUITTING,
                Message::Exit | Message::Enter | Message::Help => self.mode = Mode::Table,
                _ => (),
            },
        }
    }

    // ------------------------- bulk actions ------------------------- //

    pub fn apply(&mut self, action: MenuAction) {
        trace!(?action, "menu action");
        match action {
            MenuAction::CheckAll => self.update_all_rows(true),
            MenuAction::UncheckAll => self.update_all_rows(false),
            MenuAction::CheckSelected => self.update_selected_rows(true),
            MenuAction::UncheckSelected => self.update_selected_rows(false),
            MenuAction::InvertSelection => self.invert_all_rows(),
        }
        self.set_status_message(action.label());
    }

    /// Sets the flag column of every row, in model order.
    fn update_all_rows(&mut self, value: bool) {
        for row in 0..self.model.row_count() {
            self.model.set_value(CellValue::Bool(value), row, FLAG_COLUMN);
        }
    }

    /// Sets the flag column of every selected row. Selected view rows are
    /// translated into model rows first, so the action is correct under any
    /// active sort order.
    fn update_selected_rows(&mut self, value: bool) {
        let rows: Vec<usize> = self
            .selected_view_rows()
            .into_iter()
            .map(|view_row| self.order[view_row])
            .collect();
        for row in rows {
            self.model.set_value(CellValue::Bool(value), row, FLAG_COLUMN);
        }
    }

    /// Negates the flag column of every row, in model order.
    fn invert_all_rows(&mut self) {
        for row in 0..self.model.row_count() {
            let flag = self.model.value_at(row, FLAG_COLUMN).as_bool();
            self.model.set_value(CellValue::Bool(!flag), row, FLAG_COLUMN);
        }
    }

    /// The rows a "selected" bulk action applies to: the marked rows, or
    /// the cursor row when nothing is marked.
    fn selected_view_rows(&self) -> Vec<usize> {
        if !self.marked.is_empty() {
            self.marked.iter().copied().collect()
        } else if self.row_count > 0 {
            vec![self.cursor]
        } else {
            Vec::new()
        }
    }

    fn toggle_cursor_flag(&mut self) {
        if self.row_count == 0 {
            return;
        }
        let row = self.order[self.cursor];
        if self.model.is_editable(row, FLAG_COLUMN) {
            let flag = self.model.value_at(row, FLAG_COLUMN).as_bool();
            self.model.set_value(CellValue::Bool(!flag), row, FLAG_COLUMN);
        }
    }

    fn toggle_mark(&mut self) {
        if self.row_count == 0 {
            return;
        }
        if !self.marked.remove(&self.cursor) {
            self.marked.insert(self.cursor);
        }
    }

    // --------------------------- sorting ---------------------------- //

    /// Reorders the view without touching model storage. Marks and the
    /// cursor keep following their model rows.
    pub fn sort_by(&mut self, column: usize, ascending: bool) {
        if self.row_count == 0 || column >= self.column_count {
            return;
        }
        let cursor_row = self.order.get(self.cursor).copied();
        let marked_rows: Vec<usize> = self.marked.iter().map(|&v| self.order[v]).collect();

        let mut order = std::mem::take(&mut self.order);
        order.sort_by(|&a, &b| {
            let cmp = self
                .model
                .value_at(a, column)
                .partial_cmp(self.model.value_at(b, column))
                .unwrap_or(Ordering::Equal);
            if ascending { cmp } else { cmp.reverse() }
        });
        self.order = order;
        self.sort = Some((column, ascending));

        self.marked = marked_rows
            .into_iter()
            .filter_map(|row| self.order.iter().position(|&m| m == row))
            .collect();
        if let Some(row) = cursor_row
            && let Some(view_row) = self.order.iter().position(|&m| m == row)
        {
            self.cursor = view_row;
        }
        let name = self.model.column_name(column).unwrap_or("?").to_string();
        self.set_status_message(format!(
            "Sorted by {} ({})",
            name,
            if ascending { "asc" } else { "desc" }
        ));
    }

    // ------------------------- navigation --------------------------- //

    fn move_cursor_up(&mut self, size: usize) {
        self.move_cursor_to(self.cursor.saturating_sub(size));
    }

    fn move_cursor_down(&mut self, size: usize) {
        if self.row_count > 0 {
            self.move_cursor_to(std::cmp::min(self.cursor + size, self.row_count - 1));
        }
    }

    fn move_cursor_to(&mut self, view_row: usize) {
        if self.row_count > 0 {
            self.cursor = std::cmp::min(view_row, self.row_count - 1);
        }
    }

    fn page_size(&self) -> usize {
        std::cmp::max(self.data_area.height as usize, 1)
    }

    fn cursor_screen_offset(&self) -> u16 {
        let offset = self.cursor.saturating_sub(self.ratatui_state.offset());
        u16::try_from(offset).unwrap_or(u16::MAX)
    }

    fn open_menu(&mut self, anchor: (u16, u16)) {
        self.mode = Mode::Menu;
        self.menu_cursor = 0;
        self.menu_anchor = anchor;
    }

    fn click_row(&mut self, x: u16, y: u16) {
        let area = self.data_area;
        if x < area.x || x >= area.x + area.width || y < area.y || y >= area.y + area.height {
            return;
        }
        let view_row = self.ratatui_state.offset() + (y - area.y) as usize;
        if view_row < self.row_count {
            self.cursor = view_row;
        }
    }

    // ----------------------- export helpers ------------------------- //

    pub fn checked_count(&self) -> usize {
        (0..self.model.row_count())
            .filter(|&row| self.model.value_at(row, FLAG_COLUMN).as_bool())
            .count()
    }

    /// Checked rows as CSV, header first, flag column omitted.
    pub fn checked_csv(&self) -> String {
        if self.column_count <= 1 {
            return String::new();
        }
        let mut lines = Vec::new();
        let header: Vec<String> = (1..self.column_count)
            .map(|col| wrap_cell_content(self.model.column_name(col).unwrap_or("")))
            .collect();
        lines.push(header.join(","));
        for row in 0..self.model.row_count() {
            if self.model.value_at(row, FLAG_COLUMN).as_bool() {
                let cells: Vec<String> = (1..self.column_count)
                    .map(|col| wrap_cell_content(&self.model.value_at(row, col).to_string()))
                    .collect();
                lines.push(cells.join(","));
            }
        }
        lines.join("\n") + "\n"
    }

    fn copy_checked(&mut self) {
        let content = self.checked_csv();
        match Clipboard::new().and_then(|mut cb| cb.set_text(content)) {
            Ok(_) => {
                self.set_status_message(format!("Copied {} checked rows", self.checked_count()));
            }
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Clipboard unavailable");
            }
        }
    }

    // ------------------------- rendering data ----------------------- //

    pub(crate) fn cell_text(&self, model_row: usize, col: usize) -> String {
        if col == FLAG_COLUMN {
            if self.model.value_at(model_row, col).as_bool() {
                "[x]".to_string()
            } else {
                "[ ]".to_string()
            }
        } else {
            self.model
                .value_at(model_row, col)
                .format_with(self.config.float_precision)
        }
    }

    pub(crate) fn ensure_widths(&mut self) {
        if !self.widths_dirty {
            return;
        }
        self.widths = (0..self.column_count)
            .map(|col| {
                let header = self.model.column_name(col).map(str::len).unwrap_or(0);
                let cells = (0..self.model.row_count())
                    .map(|row| self.cell_text(row, col).chars().count())
                    .max()
                    .unwrap_or(0);
                let width = std::cmp::max(header, cells) + COLUMN_WIDTH_MARGIN;
                std::cmp::min(width, self.config.max_column_width) as u16
            })
            .collect();
        self.widths_dirty = false;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }
}

/// CSV style quoting for clipboard/stdout export.
fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.chars().any(|c| c == '"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace("\"", "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScopeModel;

    fn sample_view() -> ScopeTable<ScopeModel> {
        let model = ScopeModel::new(
            vec!["Host".into(), "Port".into()],
            vec![
                vec![CellValue::Text("api".into()), CellValue::Int(80)],
                vec![CellValue::Text("db".into()), CellValue::Int(5432)],
                vec![CellValue::Text("cache".into()), CellValue::Int(6379)],
                vec![CellValue::Text("proxy".into()), CellValue::Int(8080)],
                vec![CellValue::Text("mail".into()), CellValue::Int(25)],
            ],
        );
        ScopeTable::new(model, ScopeConfig::default())
    }

    fn flags<M: TabularModel>(view: &ScopeTable<M>) -> Vec<bool> {
        (0..view.model().row_count())
            .map(|row| view.model().value_at(row, FLAG_COLUMN).as_bool())
            .collect()
    }

    #[test]
    fn check_all_rows_sets_every_flag() {
        let mut view = sample_view();
        view.apply(MenuAction::InvertSelection); // start from a mixed state
        view.apply(MenuAction::CheckAll);
        assert_eq!(flags(&view), vec![true; 5]);
        view.apply(MenuAction::UncheckAll);
        assert_eq!(flags(&view), vec![false; 5]);
    }

    #[test]
    fn invert_twice_restores_flags() {
        let mut view = sample_view();
        view.model.set_value(CellValue::Bool(true), 1, FLAG_COLUMN);
        view.model.set_value(CellValue::Bool(true), 3, FLAG_COLUMN);
        let before = flags(&view);
        view.apply(MenuAction::InvertSelection);
        assert_eq!(flags(&view), vec![true, false, true, false, true]);
        view.apply(MenuAction::InvertSelection);
        assert_eq!(flags(&view), before);
    }

    #[test]
    fn selected_rows_translate_through_sort_order() {
        let mut view = sample_view();
        // Descending by Port: 8080, 6379, 5432, 80, 25
        view.sort_by(2, false);
        assert_eq!(view.order, vec![3, 2, 1, 0, 4]);

        // Marks land on view rows 2 and 4 after the sort
        view.marked.clear();
        view.marked.insert(2);
        view.marked.insert(4);
        view.apply(MenuAction::CheckSelected);

        // Model rows 1 (db) and 4 (mail) must be the checked ones
        assert_eq!(flags(&view), vec![false, true, false, false, true]);
    }

    #[test]
    fn unmarked_selection_falls_back_to_cursor() {
        let mut view = sample_view();
        view.sort_by(2, false);
        view.cursor = 0; // view row 0 == model row 3 (proxy)
        view.apply(MenuAction::CheckSelected);
        assert_eq!(flags(&view), vec![false, false, false, true, false]);
        view.apply(MenuAction::UncheckSelected);
        assert_eq!(flags(&view), vec![false; 5]);
    }

    #[test]
    fn sort_keeps_marks_on_their_model_rows() {
        let mut view = sample_view();
        view.marked.insert(1); // model row 1 (db)
        view.sort_by(2, false);
        let marked_models: Vec<usize> = view.marked.iter().map(|&v| view.order[v]).collect();
        assert_eq!(marked_models, vec![1]);
    }

    #[test]
    fn set_model_resets_order_and_marks() {
        let mut view = sample_view();
        view.sort_by(2, false);
        view.marked.insert(0);
        view.set_model(
            vec!["Name".into()],
            vec![
                vec![CellValue::Text("a".into())],
                vec![CellValue::Text("b".into())],
            ],
        );
        assert_eq!(view.row_count, 2);
        assert_eq!(view.column_count, 2);
        assert_eq!(view.order, vec![0, 1]);
        assert!(view.marked.is_empty());
        assert_eq!(view.sort, None);
    }

    #[test]
    fn toggle_flag_goes_through_editability() {
        let mut view = sample_view();
        view.update(Message::ToggleFlag);
        view.pump_events();
        assert_eq!(flags(&view)[0], true);
        view.update(Message::ToggleFlag);
        view.pump_events();
        assert_eq!(flags(&view)[0], false);
    }

    #[test]
    fn menu_enter_applies_selected_action() {
        let mut view = sample_view();
        view.update(Message::OpenMenu);
        assert_eq!(view.mode, Mode::Menu);
        view.update(Message::Enter); // first entry: check all rows
        assert_eq!(view.mode, Mode::Table);
        view.pump_events();
        assert_eq!(flags(&view), vec![true; 5]);
    }

    #[test]
    fn checked_csv_exports_header_and_checked_rows() {
        let mut view = sample_view();
        view.model.set_value(CellValue::Bool(true), 1, FLAG_COLUMN);
        let csv = view.checked_csv();
        assert_eq!(csv, "Host,Port\ndb,5432\n");
    }

    #[test]
    fn csv_quoting() {
        assert_eq!(wrap_cell_content("plain"), "plain");
        assert_eq!(wrap_cell_content("a b"), "\"a b\"");
        assert_eq!(wrap_cell_content("a,b"), "\"a,b\"");
        assert_eq!(wrap_cell_content("say \"hi\" now"), "\"say \"\"hi\"\" now\"");
    }

    #[test]
    fn float_cells_render_with_configured_precision() {
        let model = ScopeModel::new(
            vec!["Score".into()],
            vec![vec![CellValue::Float(3.14159)], vec![CellValue::Float(2.0)]],
        );
        let view = ScopeTable::new(
            model,
            ScopeConfig {
                float_precision: 3,
                ..ScopeConfig::default()
            },
        );
        assert_eq!(view.cell_text(0, 1), "3.142");
        assert_eq!(view.cell_text(1, 1), "2.000");
    }

    #[test]
    fn cursor_screen_offset_saturates_on_huge_tables() {
        let mut view = sample_view();
        view.row_count = usize::MAX;
        view.cursor = u16::MAX as usize + 10;
        assert_eq!(view.cursor_screen_offset(), u16::MAX);
    }

    #[test]
    fn checkbox_cells_render_as_boxes() {
        let mut view = sample_view();
        assert_eq!(view.cell_text(0, 0), "[ ]");
        view.model.set_value(CellValue::Bool(true), 0, FLAG_COLUMN);
        assert_eq!(view.cell_text(0, 0), "[x]");
        assert_eq!(view.cell_text(0, 1), "api");
    }
}
