use polars::error::PolarsError;
use std::io::Error;

// Crate wide error type. File loading goes through polars, terminal IO
// through std::io, everything else gets its own variant.
#[derive(Debug)]
pub enum ScopeError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl From<Error> for ScopeError {
    fn from(err: Error) -> Self {
        ScopeError::IoError(err)
    }
}

impl From<PolarsError> for ScopeError {
    fn from(err: PolarsError) -> Self {
        ScopeError::PolarsError(err)
    }
}

#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub float_precision: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        ScopeConfig {
            event_poll_time: 100,
            max_column_width: 40,
            float_precision: 2,
        }
    }
}

// Messages produced by the controller and consumed by the view.
// The view dispatches them depending on its current mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    ToggleFlag,
    ToggleMark,
    OpenMenu,
    Enter,
    Exit,
    SortAscending,
    SortDescending,
    CopyChecked,
    Help,
    LeftClick(u16, u16),
    RightClick(u16, u16),
}

pub const HELP_TEXT: &str = "\
stv - scope table viewer

  Up/Down, PgUp/PgDn   move the cursor
  Home/End             first / last row
  Left/Right           choose the sort column
  s / S                sort ascending / descending
  Space                toggle the Process flag of the current row
  v                    mark / unmark the current row
  Esc                  clear marks, close popups
  m / right click      open the scope menu
  c                    copy checked rows to the clipboard
  ?                    this help
  q                    quit and print checked rows
";
