use chrono::DateTime;
use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::cell::CellValue;
use crate::domain::ScopeError;

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_type: FileType,
}

/// Loads a tabular file into a header and typed rows, ready to feed a
/// [`crate::model::ScopeModel`]. The flag column is not part of this data;
/// the model prepends it.
pub fn load(path: &Path) -> Result<(Vec<String>, Vec<Vec<CellValue>>), ScopeError> {
    let file_info = get_file_info(path)?;
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Columns are extracted in parallel, one rayon task per column.
    let start_time = Instant::now();
    let df = frame.collect()?;
    let names = df.get_column_names_str();
    let header: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let columns: Vec<Vec<CellValue>> = names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<_, PolarsError>>()?;

    let rows = transpose(&columns, df.height());
    info!(
        rows = rows.len(),
        columns = header.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "loaded scope data"
    );
    for (name, column) in header.iter().zip(columns.iter()) {
        debug!(%name, cells = column.len(), "column");
    }
    Ok((header, rows))
}

fn transpose(columns: &[Vec<CellValue>], nrows: usize) -> Vec<Vec<CellValue>> {
    (0..nrows)
        .map(|r| columns.iter().map(|c| c[r].clone()).collect())
        .collect()
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<CellValue>, PolarsError> {
    let column = df.column(col_name)?;
    match column.dtype() {
        DataType::Boolean => Ok(column
            .bool()?
            .into_iter()
            .map(|v| CellValue::Bool(v.unwrap_or(false)))
            .collect()),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let col = column.cast(&DataType::Int64)?;
            Ok(col
                .i64()?
                .into_iter()
                .map(|v| CellValue::Int(v.unwrap_or(0)))
                .collect())
        }
        DataType::Float32 | DataType::Float64 => {
            let col = column.cast(&DataType::Float64)?;
            Ok(col
                .f64()?
                .into_iter()
                .map(|v| CellValue::Float(v.unwrap_or(0.0)))
                .collect())
        }
        DataType::Date | DataType::Datetime(_, _) => {
            let col = column.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
            Ok(col
                .datetime()?
                .physical()
                .into_iter()
                .map(|v| {
                    v.and_then(DateTime::from_timestamp_millis)
                        .map(|dt| CellValue::Timestamp(dt.naive_utc()))
                        .unwrap_or_else(|| CellValue::Text("∅".to_string()))
                })
                .collect())
        }
        _ => {
            let col = column.cast(&DataType::String)?;
            Ok(col
                .str()?
                .into_iter()
                .map(|v| match v {
                    Some(s) => {
                        CellValue::Text(s.replace("\r\n", " ↵ ").replace("\n", " ↵ "))
                    }
                    None => CellValue::Text("∅".to_string()),
                })
                .collect())
        }
    }
}

fn detect_file_type(path: &Path) -> Result<FileType, ScopeError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(ScopeError::UnknownFileType),
    }
}

fn get_file_info(path: &Path) -> Result<FileInfo, ScopeError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScopeError::FileNotFound,
        ErrorKind::PermissionDenied => ScopeError::PermissionDenied,
        _ => ScopeError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(ScopeError::LoadingFailed("Not a file!".into()));
    }
    let file_type = detect_file_type(path)?;
    Ok(FileInfo {
        path: path.to_path_buf(),
        file_type,
    })
}

fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.as_path().into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(
        PlPath::Local(path.as_path().into()),
        ScanArgsParquet::default(),
    )
}

fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.as_path().into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
