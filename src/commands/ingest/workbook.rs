use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDateTime;

use super::*;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum RawCell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl RawCell {
    pub(super) fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// First worksheet of a workbook: the header row plus every data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct RawTable {
    pub(super) headers: Vec<String>,
    pub(super) rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub(super) fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|candidate| candidate == header)
    }
}

pub(super) fn read_first_sheet(path: &Path) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .with_context(|| format!("workbook has no sheets: {}", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("failed to read sheet {sheet_name} in {}", path.display()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(RawTable::default());
    };

    Ok(RawTable {
        headers: header_row.iter().map(header_text).collect(),
        rows: rows
            .map(|row| row.iter().map(raw_cell).collect::<Vec<_>>())
            .filter(|row| !row.iter().all(RawCell::is_empty))
            .collect(),
    })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(value) => value.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Int(value) => RawCell::Int(*value),
        Data::Float(value) => RawCell::Float(*value),
        Data::String(value) => RawCell::Text(value.clone()),
        Data::Bool(value) => RawCell::Bool(*value),
        Data::DateTime(value) => value
            .as_datetime()
            .map(RawCell::DateTime)
            .unwrap_or(RawCell::Empty),
        Data::DateTimeIso(value) | Data::DurationIso(value) => RawCell::Text(value.clone()),
        Data::Error(_) | Data::Empty => RawCell::Empty,
    }
}
