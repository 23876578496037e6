use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;

/// A single typed table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

/// Column classification used to pick a renderer for a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Timestamp,
    Text,
}

impl CellValue {
    pub fn kind(&self) -> ColumnKind {
        match self {
            CellValue::Bool(_) => ColumnKind::Boolean,
            CellValue::Int(_) => ColumnKind::Integer,
            CellValue::Float(_) => ColumnKind::Float,
            CellValue::Timestamp(_) => ColumnKind::Timestamp,
            CellValue::Text(_) => ColumnKind::Text,
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, CellValue::Bool(true))
    }

    /// Renders the value for display, floats with a fixed number of
    /// fractional digits. Other variants ignore the precision.
    pub fn format_with(&self, precision: usize) -> String {
        match self {
            CellValue::Float(v) => format!("{v:.precision$}"),
            other => other.to_string(),
        }
    }
}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (CellValue::Bool(a), CellValue::Bool(b)) => a.partial_cmp(b),
            (CellValue::Int(a), CellValue::Int(b)) => a.partial_cmp(b),
            (CellValue::Float(a), CellValue::Float(b)) => a.partial_cmp(b),
            // Mixed numeric columns compare through f64
            (CellValue::Int(a), CellValue::Float(b)) => (*a as f64).partial_cmp(b),
            (CellValue::Float(a), CellValue::Int(b)) => a.partial_cmp(&(*b as f64)),
            (CellValue::Timestamp(a), CellValue::Timestamp(b)) => a.partial_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(v) => write!(f, "{}", v),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Text(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(CellValue::Bool(true).kind(), ColumnKind::Boolean);
        assert_eq!(CellValue::Int(42).kind(), ColumnKind::Integer);
        assert_eq!(CellValue::Float(1.5).kind(), ColumnKind::Float);
        assert_eq!(CellValue::Text("a".into()).kind(), ColumnKind::Text);
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(CellValue::Timestamp(ts).kind(), ColumnKind::Timestamp);
    }

    #[test]
    fn mixed_numeric_ordering() {
        assert_eq!(
            CellValue::Int(2).partial_cmp(&CellValue::Float(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            CellValue::Float(0.5).partial_cmp(&CellValue::Int(1)),
            Some(Ordering::Less)
        );
        // Incomparable variants yield None
        assert_eq!(
            CellValue::Text("a".into()).partial_cmp(&CellValue::Int(1)),
            None
        );
    }

    #[test]
    fn float_formatting_uses_fixed_precision() {
        assert_eq!(CellValue::Float(3.14159).format_with(2), "3.14");
        assert_eq!(CellValue::Float(2.0).format_with(2), "2.00");
        assert_eq!(CellValue::Float(0.6666).format_with(3), "0.667");
        // Only floats care about the precision knob
        assert_eq!(CellValue::Int(7).format_with(3), "7");
        assert_eq!(CellValue::Text("a".into()).format_with(3), "a");
    }

    #[test]
    fn timestamp_display() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        assert_eq!(
            CellValue::Timestamp(ts).to_string(),
            "2024-03-04 05:06:07"
        );
    }
}
