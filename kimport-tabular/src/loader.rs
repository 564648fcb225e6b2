//! CSV loading into [`SourceTable`]s.
//!
//! The loader reads every record as text, then runs a per-column inference
//! pass to pick the narrowest faithful type: integer, float, boolean, or
//! string. Values that look numeric but carry leading zeros (`"007"`) keep
//! the whole column textual so legacy codes survive unchanged.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::batch::{Column, ColumnBatch, FieldType};
use crate::error::{Result, TabularError};
use crate::table::SourceTable;

/// Options for reading CSV sources.
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub delimiter: u8,
    /// Cell values (compared case-insensitively after trimming) treated as null,
    /// in addition to empty cells.
    pub null_tokens: Vec<String>,
    /// Infer numeric/boolean column types; when false every column is a string.
    pub infer_types: bool,
    /// Run the narrowing pass after loading.
    pub optimize: bool,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_tokens: vec!["NA".to_string(), "NaN".to_string(), "null".to_string()],
            infer_types: true,
            optimize: true,
        }
    }
}

#[derive(Default, Clone)]
struct ValueStats {
    non_null: usize,
    integer: usize,
    float: usize,
    boolean: usize,
    leading_zero: bool,
}

impl ValueStats {
    fn observe(&mut self, value: &str) {
        self.non_null += 1;
        if parse_bool(value).is_some() {
            self.boolean += 1;
            return;
        }
        if has_leading_zero(value) {
            self.leading_zero = true;
        }
        if value.parse::<i64>().is_ok() {
            self.integer += 1;
            self.float += 1;
        } else if is_plain_float(value) {
            self.float += 1;
        }
    }

    fn field_type(&self) -> FieldType {
        if self.non_null == 0 || self.leading_zero {
            FieldType::String
        } else if self.integer == self.non_null {
            FieldType::Int64
        } else if self.float == self.non_null {
            FieldType::Float64
        } else if self.boolean == self.non_null {
            FieldType::Boolean
        } else {
            FieldType::String
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn has_leading_zero(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.")
}

/// Decimal notation only: `inf`, `nan` and exponents stay textual.
fn is_plain_float(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut seen_dot = false;
    let mut seen_digit = false;
    for ch in digits.chars() {
        match ch {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit && value.parse::<f64>().is_ok()
}

/// Read a CSV document into a named source table.
pub fn read_csv<R: Read>(
    name: impl Into<String>,
    reader: R,
    options: &CsvReadOptions,
) -> Result<SourceTable> {
    let name = name.into();
    let csv_error = |line: u64, err: csv::Error| TabularError::Csv {
        table: name.clone(),
        line,
        message: err.to_string(),
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| csv_error(1, e))?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{FEFF}').to_string())
        .collect();

    let mut seen = rustc_hash::FxHashSet::default();
    if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(TabularError::DuplicateColumn {
            table: name.clone(),
            column: dup.clone(),
        });
    }

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut stats = vec![ValueStats::default(); headers.len()];

    for record in rdr.records() {
        let record = record.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            csv_error(line, e)
        })?;
        for (idx, field) in record.iter().enumerate() {
            let trimmed = field.trim();
            let is_null = trimmed.is_empty()
                || options
                    .null_tokens
                    .iter()
                    .any(|t| trimmed.eq_ignore_ascii_case(t));
            if is_null {
                raw[idx].push(None);
            } else {
                stats[idx].observe(trimmed);
                raw[idx].push(Some(field.to_string()));
            }
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .zip(&stats)
        .map(|((header, values), stat)| {
            let field_type = if options.infer_types {
                stat.field_type()
            } else {
                FieldType::String
            };
            (header, typed_column(values, field_type))
        })
        .collect();

    let batch = ColumnBatch::from_columns(columns)?;
    let batch = if options.optimize { batch.narrow() } else { batch };

    tracing::debug!(
        table = %name,
        rows = batch.num_rows,
        columns = batch.schema.num_fields(),
        approx_bytes = batch.byte_size(),
        "loaded CSV source table"
    );

    Ok(SourceTable::new(name, batch))
}

/// Read a CSV file into a named source table.
pub fn read_csv_path(
    name: impl Into<String>,
    path: impl AsRef<Path>,
    options: &CsvReadOptions,
) -> Result<SourceTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| TabularError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    read_csv(name, std::io::BufReader::new(file), options)
}

fn typed_column(values: Vec<Option<String>>, field_type: FieldType) -> Column {
    match field_type {
        FieldType::Int64 => Column::Int64(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect(),
        ),
        FieldType::Float64 => Column::Float64(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.trim().parse().ok()))
                .collect(),
        ),
        FieldType::Boolean => Column::Boolean(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| parse_bool(s.trim())))
                .collect(),
        ),
        _ => Column::String(values),
    }
}
