use anyhow::{anyhow, Context};
use calamine::{open_workbook, Data, Reader, Xlsx};
use serde_json::Value;
use std::path::Path;

/// Absolute sheet row holding the real column labels; the two rows above
/// it are title/metadata and are ignored.
const HEADER_ROW: usize = 2;

pub const ATTENDANCE_COLUMN: &str = "Attendance";
pub const SUBMISSION_COLUMN: &str = "Submission";

/// Recognized source columns, as an explicit table instead of literals
/// buried in the selection code. Every field can be overridden per load.
#[derive(Debug, Clone)]
pub struct ColumnRules {
    /// Exact label of the identifier column.
    pub identifier: String,
    /// Exact label of the student-name column.
    pub name: String,
    /// Case-insensitive substring marking time-extension columns.
    pub extra_time_contains: String,
    /// Exact labels of the accommodation columns, in output order.
    pub accommodations: Vec<String>,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            identifier: "No.".to_string(),
            name: "Student Name".to_string(),
            extra_time_contains: "extra time".to_string(),
            accommodations: vec![
                "Separate Room".to_string(),
                "Enlarged Exam".to_string(),
                "Exam Read Aloud".to_string(),
            ],
        }
    }
}

/// Normalized student table: selected columns in order, one Vec of cell
/// values per student, row order preserved from the source file.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct Roster {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Index of the name column within `columns`, when present.
    pub name_column: Option<usize>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read the first sheet of an xlsx workbook and build the normalized
/// roster. Any failure here leaves no partially populated table behind.
pub fn load_roster(path: &Path, rules: &ColumnRules) -> anyhow::Result<Roster> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("failed to open workbook {}", path.to_string_lossy()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no sheets"))?
        .context("failed to read first sheet")?;

    let (row_offset, _) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .ok_or_else(|| anyhow!("sheet is empty"))?;
    if row_offset > HEADER_ROW {
        return Err(anyhow!("header row not found (sheet starts below row 3)"));
    }
    let header_rel = HEADER_ROW - row_offset;

    let mut rows = range.rows().skip(header_rel);
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| anyhow!("header row not found"))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    if header.iter().all(|label| label.is_empty()) {
        return Err(anyhow!("header row is empty"));
    }

    let data: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Ok(build_roster(&header, data, rules))
}

/// Pure core of the loader: drop fully empty rows, select/ reorder the
/// recognized columns, and insert the blank tracking columns.
pub fn build_roster(header: &[String], rows: Vec<Vec<Value>>, rules: &ColumnRules) -> Roster {
    let rows: Vec<Vec<Value>> = rows
        .into_iter()
        .filter(|row| !row.iter().all(is_blank))
        .collect();

    let find = |label: &str| header.iter().position(|h| h == label);
    let needle = rules.extra_time_contains.to_lowercase();

    // Identifier and name first, then time-extension columns in source
    // order, then the accommodation columns in rules order. Absent columns
    // are skipped silently.
    let mut selected: Vec<usize> = Vec::new();
    selected.extend(find(&rules.identifier));
    selected.extend(find(&rules.name));
    selected.extend(
        header
            .iter()
            .enumerate()
            .filter(|(_, h)| !needle.is_empty() && h.to_lowercase().contains(&needle))
            .map(|(idx, _)| idx),
    );
    selected.extend(rules.accommodations.iter().filter_map(|label| find(label)));

    let mut columns: Vec<String> = selected.iter().map(|&idx| header[idx].clone()).collect();
    let mut rows: Vec<Vec<Value>> = rows
        .into_iter()
        .map(|row| {
            selected
                .iter()
                .map(|&idx| row.get(idx).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    // The name column keeps its index; tracking columns go right after it.
    let name_column = columns.iter().position(|c| *c == rules.name);
    if let Some(pos) = name_column {
        columns.insert(pos + 1, ATTENDANCE_COLUMN.to_string());
        columns.insert(pos + 2, SUBMISSION_COLUMN.to_string());
        for row in &mut rows {
            row.insert(pos + 1, Value::Null);
            row.insert(pos + 2, Value::Null);
        }
    }

    Roster {
        columns,
        rows,
        name_column,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Value::String(d.to_string()),
            None => Value::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}
