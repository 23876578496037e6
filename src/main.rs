use std::io::stdout;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod cell;
mod controller;
mod domain;
mod loader;
mod model;
mod ui;
mod view;

use controller::Controller;
use domain::{ScopeConfig, ScopeError};
use model::ScopeModel;
use view::{ScopeTable, Status};

/// View scope data in a table and pick the rows to process.
#[derive(Parser, Debug)]
#[command(name = "stv", version, about)]
struct Args {
    /// Scope data file (csv, parquet, arrow/ipc)
    path: String,

    /// Append diagnostics to this file (stdout belongs to the table)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Maximum rendered column width
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Fractional digits shown for float cells
    #[arg(long, default_value_t = 2)]
    float_precision: usize,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(checked) => {
            // The checked rows are the program's output.
            print!("{checked}");
            ExitCode::SUCCESS
        }
    }
}

fn run() -> Result<String, ScopeError> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let path: PathBuf = shellexpand::full(&args.path)
        .map_err(|e| ScopeError::LoadingFailed(e.to_string()))?
        .into_owned()
        .into();
    let (header, rows) = loader::load(&path)?;

    let cfg = ScopeConfig {
        event_poll_time: args.poll_ms,
        max_column_width: args.max_column_width,
        float_precision: args.float_precision,
    };
    let model = ScopeModel::new(header, rows);
    let mut view = ScopeTable::new(model, cfg.clone());
    let controller = Controller::new(&cfg);

    let (mut terminal, _guard) = TerminalGuard::enter()?;

    while view.status != Status::QUITTING {
        view.pump_events();
        terminal.draw(|f| ui::draw(f, &mut view))?;
        if let Some(message) = controller.handle_event()? {
            view.update(message);
        }
    }

    Ok(view.checked_csv())
}

/// Owns the terminal session. Dropping it disables mouse capture and
/// restores the terminal, so a draw or poll error mid-session cannot
/// leave the user's terminal in raw mode with the mouse captured.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<(ratatui::DefaultTerminal, TerminalGuard), ScopeError> {
        let terminal = ratatui::init();
        let guard = TerminalGuard;
        execute!(stdout(), EnableMouseCapture)?;
        Ok((terminal, guard))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The guard drops on every exit path, including error returns before a
    // session was fully set up, so teardown must not panic without one.
    #[test]
    fn terminal_guard_drop_is_safe_without_a_session() {
        drop(TerminalGuard);
    }
}

fn init_logging(path: Option<&Path>) -> Result<(), ScopeError> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::options().create(true).append(true).open(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
