//! Delimited Text Ingestion
//!
//! Turns an uploaded byte stream into a [`Table`]. The first record is the
//! header. Fields may be wrapped in double quotes, in which case the delimiter
//! and newlines lose their meaning and `""` stands for a literal quote.
//!
//! Column types are inferred from the present cells: all integers gives an
//! `Int` column, all numbers a `Float` column, all `true`/`false` a `Bool`
//! column, anything else `Text`. A column with no present cell at all is a
//! `Float` column so statistics on it report missing data, not a type error.
//!
//! Parsing is all-or-nothing: any error returns [`DatasetParseError`] and no
//! partial table.
//!
//! [`write`] goes the other way, for downloading a processed table.

use std::fmt::Write as _;

use serde::Deserialize;

use super::table::{Column, Table};
use crate::error::DatasetParseError;

/// How delimited text is interpreted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvOptions {
    /// Field separator.
    pub delimiter: char,
    /// Cell contents that mean "no value".
    pub missing_tokens: Vec<String>,
    /// Strip whitespace around unquoted cells and headers. Text inside quotes
    /// is kept as written.
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            missing_tokens: ["", "NA", "NaN", "null"].map(String::from).to_vec(),
            trim: true,
        }
    }
}

impl CsvOptions {
    fn is_missing(&self, cell: &str) -> bool {
        self.missing_tokens.iter().any(|token| token == cell)
    }
}

/// A record together with the line it started on.
type Record = (usize, Vec<String>);

/// Parse delimited text into a table.
pub fn parse(bytes: &[u8], options: &CsvOptions) -> Result<Table, DatasetParseError> {
    let text = std::str::from_utf8(bytes).map_err(|err| {
        let line = 1 + bytes[..err.valid_up_to()]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        DatasetParseError::new(line, "input is not valid UTF-8")
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = split_records(text, options)?.into_iter();
    let Some((header_line, header)) = records.next() else {
        return Err(DatasetParseError::new(1, "missing header row"));
    };

    for (i, name) in header.iter().enumerate() {
        if name.is_empty() {
            return Err(DatasetParseError::new(
                header_line,
                format!("column {} has an empty name", i + 1),
            ));
        }
        if header[..i].contains(name) {
            return Err(DatasetParseError::new(
                header_line,
                format!("duplicate column name '{name}'"),
            ));
        }
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    for (line, fields) in records {
        if fields.len() != header.len() {
            return Err(DatasetParseError::new(
                line,
                format!("expected {} fields, found {}", header.len(), fields.len()),
            ));
        }
        for (column, field) in cells.iter_mut().zip(fields) {
            column.push(field);
        }
    }

    let mut table = Table::new();
    for (name, column) in header.into_iter().zip(cells) {
        let column = infer(column, options);
        table = table
            .with_column(name, column)
            .map_err(|err| DatasetParseError::new(header_line, err.to_string()))?;
    }
    Ok(table)
}

fn split_records(text: &str, options: &CsvOptions) -> Result<Vec<Record>, DatasetParseError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = Field::default();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.text.push('"');
                }
                '"' => {
                    in_quotes = false;
                    field.quoted = Some(field.text.len());
                }
                '\n' => {
                    line += 1;
                    field.text.push('\n');
                }
                _ => field.text.push(c),
            }
            continue;
        }

        match c {
            // Whitespace before an opening quote is padding when trimming.
            '"' if field.quoted.is_none()
                && (field.text.is_empty() || (options.trim && field.text.trim().is_empty())) =>
            {
                field.text.clear();
                in_quotes = true;
                quote_line = line;
            }
            c if c == options.delimiter => fields.push(field.finish(options.trim)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(field.finish(options.trim));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            _ => field.text.push(c),
        }
    }

    if in_quotes {
        return Err(DatasetParseError::new(quote_line, "unterminated quoted field"));
    }
    if !field.text.is_empty() || field.quoted.is_some() || !fields.is_empty() {
        fields.push(field.finish(options.trim));
        push_record(&mut records, record_line, fields);
    }
    Ok(records)
}

/// A field being read. `quoted` is the length of the text when its closing
/// quote was seen.
#[derive(Default)]
struct Field {
    text: String,
    quoted: Option<usize>,
}

impl Field {
    /// Take the field's text, trimming only what lies outside quotes.
    fn finish(&mut self, trim: bool) -> String {
        let mut text = std::mem::take(&mut self.text);
        match self.quoted.take() {
            Some(len) if trim && text[len..].trim().is_empty() => text.truncate(len),
            Some(_) => {}
            None if trim => text = text.trim().to_owned(),
            None => {}
        }
        text
    }
}

fn push_record(records: &mut Vec<Record>, line: usize, fields: Vec<String>) {
    // blank line
    if fields.len() == 1 && fields[0].trim().is_empty() {
        return;
    }
    records.push((line, fields));
}

fn infer(cells: Vec<String>, options: &CsvOptions) -> Column {
    let present = || cells.iter().filter(|c| !options.is_missing(c));

    if present().next().is_none() {
        return Column::Float(vec![None; cells.len()]);
    }
    if present().all(|c| c.parse::<i64>().is_ok()) {
        return Column::Int(cells.iter().map(|c| cell(c, options)).collect());
    }
    if present().all(|c| c.parse::<f64>().is_ok()) {
        return Column::Float(cells.iter().map(|c| cell(c, options)).collect());
    }
    if present().all(|c| parse_bool(c).is_some()) {
        return Column::Bool(
            cells
                .iter()
                .map(|c| (!options.is_missing(c)).then(|| parse_bool(c)).flatten())
                .collect(),
        );
    }
    Column::Text(
        cells
            .into_iter()
            .map(|c| (!options.is_missing(&c)).then_some(c))
            .collect(),
    )
}

fn cell<T: std::str::FromStr>(raw: &str, options: &CsvOptions) -> Option<T> {
    if options.is_missing(raw) {
        None
    } else {
        raw.parse().ok()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Render a table as delimited text with a header row. Missing cells are
/// empty; fields that would not read back verbatim are quoted.
pub fn write(table: &Table, options: &CsvOptions) -> String {
    let mut out = String::new();
    let delimiter = options.delimiter.to_string();

    let header: Vec<String> = table
        .column_names()
        .map(|name| escape(name, options.delimiter))
        .collect();
    out.push_str(&header.join(&delimiter));
    out.push('\n');

    let columns: Vec<&Column> = table.columns().map(|(_, column)| column).collect();
    for row in 0..table.row_count() {
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                out.push(options.delimiter);
            }
            write_cell(&mut out, column, row, options.delimiter);
        }
        out.push('\n');
    }
    out
}

fn write_cell(out: &mut String, column: &Column, row: usize, delimiter: char) {
    // Writing to a String cannot fail.
    let _ = match column {
        Column::Int(cells) => match cells.get(row).copied().flatten() {
            Some(v) => write!(out, "{v}"),
            None => Ok(()),
        },
        // Debug keeps the decimal point, so the column reads back as floats.
        Column::Float(cells) => match cells.get(row).copied().flatten() {
            Some(v) => write!(out, "{v:?}"),
            None => Ok(()),
        },
        Column::Bool(cells) => match cells.get(row).copied().flatten() {
            Some(v) => write!(out, "{v}"),
            None => Ok(()),
        },
        Column::Text(cells) => match cells.get(row).and_then(Option::as_deref) {
            Some(v) => write!(out, "{}", escape(v, delimiter)),
            None => Ok(()),
        },
    };
}

fn escape(field: &str, delimiter: char) -> String {
    let needs_quotes = field.is_empty()
        || field.contains([delimiter, '"', '\n', '\r'])
        || field.trim() != field;
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
