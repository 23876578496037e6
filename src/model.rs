use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

use crate::cell::{CellValue, ColumnKind};

/// Change notifications published by a [`TabularModel`].
///
/// `StructureChanged` invalidates any cached shape (counts, names) held by a
/// view; `RowsInserted`/`CellUpdated` are content level and keep the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    StructureChanged,
    RowsInserted { first: usize, last: usize },
    CellUpdated { row: usize, col: usize },
}

/// The query/mutate contract a table view renders against.
///
/// Shape queries (`row_count`, `column_count`, `column_name`) are fail safe:
/// they never panic, out of range lookups are logged and answered with a
/// default. `value_at`/`set_value` trust the caller to stay within the
/// reported bounds and panic otherwise.
pub trait TabularModel {
    fn row_count(&self) -> usize;
    fn column_count(&self) -> usize;
    fn column_name(&self, col: usize) -> Option<&str>;
    fn value_at(&self, row: usize, col: usize) -> &CellValue;
    fn is_editable(&self, row: usize, col: usize) -> bool;
    fn set_value(&mut self, value: CellValue, row: usize, col: usize);
    fn set_header(&mut self, columns: Vec<String>);
    fn set_content(&mut self, rows: Vec<Vec<CellValue>>);
    fn column_kind(&self, col: usize) -> ColumnKind;
    /// Subscription point for change notifications. Events are sent
    /// synchronously at mutation time; subscribers drain at their leisure.
    fn subscribe(&mut self) -> Receiver<ModelEvent>;
}

pub const FLAG_COLUMN: usize = 0;
const FLAG_COLUMN_NAME: &str = "Process";

/// Authoritative store of scope rows: a caller supplied header plus a fixed
/// leading "Process" column holding one boolean inclusion flag per row.
pub struct ScopeModel {
    header: Vec<String>,
    content: Vec<Vec<CellValue>>,
    column_count: usize,
    row_count: usize,
    listeners: Vec<Sender<ModelEvent>>,
}

impl ScopeModel {
    pub fn new(header: Vec<String>, content: Vec<Vec<CellValue>>) -> Self {
        let mut model = ScopeModel {
            header: Self::build_header(header),
            content: Self::build_content(content),
            column_count: 0,
            row_count: 0,
            listeners: Vec::new(),
        };
        model.column_count = model.header.len();
        model.row_count = model.content.len();
        model.emit(ModelEvent::StructureChanged);
        if model.row_count > 0 {
            model.emit(ModelEvent::RowsInserted {
                first: 0,
                last: model.row_count - 1,
            });
        }
        model
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    fn build_header(columns: Vec<String>) -> Vec<String> {
        let mut header = vec![FLAG_COLUMN_NAME.to_string()];
        header.extend(columns);
        header
    }

    fn build_content(rows: Vec<Vec<CellValue>>) -> Vec<Vec<CellValue>> {
        rows.into_iter()
            .map(|item| {
                let mut row = vec![CellValue::Bool(false)];
                row.extend(item);
                row
            })
            .collect()
    }

    fn emit(&mut self, event: ModelEvent) {
        // Sends are synchronous; subscribers that went away are dropped.
        self.listeners.retain(|tx| tx.send(event).is_ok());
    }
}

impl TabularModel for ScopeModel {
    fn row_count(&self) -> usize {
        self.row_count
    }

    fn column_count(&self) -> usize {
        self.column_count
    }

    fn column_name(&self, col: usize) -> Option<&str> {
        if col < self.header.len() {
            Some(&self.header[col])
        } else {
            warn!(col, columns = self.header.len(), "column name out of range");
            None
        }
    }

    fn value_at(&self, row: usize, col: usize) -> &CellValue {
        &self.content[row][col]
    }

    fn is_editable(&self, _row: usize, col: usize) -> bool {
        col == FLAG_COLUMN
    }

    fn set_value(&mut self, value: CellValue, row: usize, col: usize) {
        self.content[row][col] = value;
        self.emit(ModelEvent::CellUpdated { row, col });
    }

    /// Replaces the caller supplied part of the header. Row content is kept
    /// as is; the column count follows the new header.
    fn set_header(&mut self, columns: Vec<String>) {
        self.header = Self::build_header(columns);
        self.column_count = self.header.len();
        self.row_count = self.content.len();
        debug!(
            columns = self.column_count,
            rows = self.row_count,
            "header replaced"
        );
        self.emit(ModelEvent::StructureChanged);
    }

    /// Replaces all rows, giving every row a fresh unchecked flag.
    fn set_content(&mut self, rows: Vec<Vec<CellValue>>) {
        self.content = Self::build_content(rows);
        self.row_count = self.content.len();
        debug!(rows = self.row_count, "content replaced");
        if self.row_count > 0 {
            self.emit(ModelEvent::RowsInserted {
                first: 0,
                last: self.row_count - 1,
            });
        }
    }

    /// Single sample inference: the kind of row 0's cell stands for the
    /// whole column. An empty table classifies everything as text.
    fn column_kind(&self, col: usize) -> ColumnKind {
        if self.row_count >= 1 {
            self.content[0][col].kind()
        } else {
            ColumnKind::Text
        }
    }

    fn subscribe(&mut self) -> Receiver<ModelEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_content() -> Vec<Vec<CellValue>> {
        vec![
            vec![CellValue::Text("api".into()), CellValue::Int(80)],
            vec![CellValue::Text("db".into()), CellValue::Int(5432)],
            vec![CellValue::Text("cache".into()), CellValue::Int(6379)],
        ]
    }

    #[test]
    fn empty_model_has_only_the_flag_column() {
        let model = ScopeModel::empty();
        assert_eq!(model.row_count(), 0);
        assert_eq!(model.column_count(), 1);
        assert_eq!(model.column_name(0), Some("Process"));
        assert_eq!(model.column_name(1), None);
    }

    #[test]
    fn construction_prepends_process_column() {
        let model = ScopeModel::new(vec!["Host".into(), "Port".into()], sample_content());
        assert_eq!(model.column_count(), 3);
        assert_eq!(model.row_count(), 3);
        assert_eq!(model.column_name(0), Some("Process"));
        assert_eq!(model.column_name(1), Some("Host"));
        assert_eq!(model.column_name(2), Some("Port"));
        assert_eq!(model.column_name(3), None);
    }

    #[test]
    fn content_rows_start_unchecked_and_shifted() {
        let model = ScopeModel::new(vec!["Host".into(), "Port".into()], sample_content());
        for row in 0..model.row_count() {
            assert_eq!(model.value_at(row, 0), &CellValue::Bool(false));
        }
        assert_eq!(model.value_at(1, 1), &CellValue::Text("db".into()));
        assert_eq!(model.value_at(1, 2), &CellValue::Int(5432));
    }

    #[test]
    fn only_flag_column_is_editable() {
        let model = ScopeModel::new(vec!["Host".into()], vec![vec![CellValue::Text("a".into())]]);
        assert!(model.is_editable(0, 0));
        assert!(!model.is_editable(0, 1));
    }

    #[test]
    fn set_header_counts_process_column() {
        let mut model = ScopeModel::new(vec!["Host".into()], sample_content());
        model.set_header(vec!["A".into(), "B".into(), "C".into()]);
        // The header includes the prepended flag column, and so does the count.
        assert_eq!(model.column_count(), 4);
        assert_eq!(model.column_name(0), Some("Process"));
        assert_eq!(model.column_name(3), Some("C"));
        // Row content untouched by a header swap
        assert_eq!(model.row_count(), 3);
    }

    #[test]
    fn set_content_resets_flags() {
        let mut model = ScopeModel::new(vec!["Host".into(), "Port".into()], sample_content());
        model.set_value(CellValue::Bool(true), 0, 0);
        model.set_content(sample_content());
        for row in 0..model.row_count() {
            assert_eq!(model.value_at(row, 0), &CellValue::Bool(false));
        }
    }

    #[test]
    fn column_kind_samples_first_row() {
        let content = vec![vec![
            CellValue::Bool(true),
            CellValue::Int(1),
            CellValue::Float(1.5),
            CellValue::Text("x".into()),
        ]];
        let model = ScopeModel::new(
            vec!["B".into(), "I".into(), "F".into(), "S".into()],
            content,
        );
        assert_eq!(model.column_kind(0), ColumnKind::Boolean); // flag column
        assert_eq!(model.column_kind(1), ColumnKind::Boolean);
        assert_eq!(model.column_kind(2), ColumnKind::Integer);
        assert_eq!(model.column_kind(3), ColumnKind::Float);
        assert_eq!(model.column_kind(4), ColumnKind::Text);
    }

    #[test]
    fn column_kind_defaults_to_text_when_empty() {
        let model = ScopeModel::new(vec!["Host".into()], Vec::new());
        assert_eq!(model.column_kind(0), ColumnKind::Text);
        assert_eq!(model.column_kind(1), ColumnKind::Text);
    }

    #[test]
    fn mutations_notify_subscribers() {
        let mut model = ScopeModel::new(vec!["Host".into()], Vec::new());
        let events = model.subscribe();

        model.set_header(vec!["Host".into(), "Port".into()]);
        assert_eq!(events.try_recv(), Ok(ModelEvent::StructureChanged));

        model.set_content(vec![
            vec![CellValue::Text("a".into()), CellValue::Int(1)],
            vec![CellValue::Text("b".into()), CellValue::Int(2)],
        ]);
        assert_eq!(
            events.try_recv(),
            Ok(ModelEvent::RowsInserted { first: 0, last: 1 })
        );

        model.set_value(CellValue::Bool(true), 1, 0);
        assert_eq!(
            events.try_recv(),
            Ok(ModelEvent::CellUpdated { row: 1, col: 0 })
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn empty_content_inserts_nothing() {
        let mut model = ScopeModel::new(vec!["Host".into()], Vec::new());
        let events = model.subscribe();
        model.set_content(Vec::new());
        assert!(events.try_recv().is_err());
    }
}
