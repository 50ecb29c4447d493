//! Command-line front end: loads a CSV file into a session, wires a small
//! statistics dashboard over it and prints every outcome through one of the
//! render sinks.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tally_core::data::{Predicate, Table};
use tally_core::render::{ChartKind, ChartSpec, JsonLinesSink, MsgPackSink, TextSink, View};
use tally_core::{ComputeError, Session, SessionConfig, Value};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Format {
    Text,
    Json,
    Msgpack,
}

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Summarize a CSV file")]
struct Args {
    /// CSV file to load.
    #[clap(index = 1)]
    file: PathBuf,

    /// Numeric column to summarize.
    #[clap(long, short)]
    column: Option<String>,

    /// Keep only rows whose column value lies in `MIN..=MAX`.
    #[clap(long, num_args = 2, value_names = ["MIN", "MAX"], requires = "column")]
    range: Option<Vec<f64>>,

    /// JSON session configuration.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Overrides the configured field delimiter.
    #[clap(long)]
    delimiter: Option<char>,

    #[clap(long, value_enum, default_value = "text")]
    format: Format,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SessionConfig::from_path(path)?,
        None => SessionConfig::default(),
    };
    if let Some(delimiter) = args.delimiter {
        config.csv.delimiter = delimiter;
    }

    let mut session = Session::new(config);
    wire(&mut session, args.column.as_deref())?;

    match args.format {
        Format::Text => session.attach(TextSink::new(io::stdout())),
        Format::Json => session.attach(JsonLinesSink::new(io::stdout())),
        Format::Msgpack => session.attach(MsgPackSink::new(io::stdout())),
    }

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    tracing::debug!(file = %args.file.display(), bytes = bytes.len(), "read dataset");

    // Stage the selection first so the upload drives a single pass.
    if let Some(column) = &args.column {
        session.stage("column", column.as_str())?;
    }
    if let Some(range) = &args.range {
        session.stage("range", range.clone())?;
    }
    session
        .upload("dataset", &bytes)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    Ok(())
}

/// Inputs: the dataset, the selected column and an optional value range.
fn wire(session: &mut Session, column: Option<&str>) -> tally_core::Result<()> {
    session.declare("dataset", Table::new())?;
    session.declare("column", Value::Null)?;
    session.declare("range", Value::Null)?;

    session.add_node("shape", ["dataset"], |args| {
        let table = args.get("dataset")?.as_table()?;
        Ok(format!("{} rows x {} columns", table.row_count(), table.column_count()).into())
    })?;
    session.add_node("describe", ["dataset"], |args| {
        Ok(args.get("dataset")?.as_table()?.describe().into())
    })?;
    session.add_node("selected", ["dataset", "column", "range"], |args| {
        let table = args.get("dataset")?.as_table()?;
        let column = args.get("column")?;
        if column.is_null() {
            return Err(ComputeError::insufficient("a selected column"));
        }
        let range = args.get("range")?;
        if range.is_null() {
            return Ok(Value::Table(table.clone()));
        }
        let bounds = range.numbers()?;
        let (Some(Some(min)), Some(Some(max))) = (bounds.first(), bounds.get(1)) else {
            return Err(ComputeError::failed("range needs a lower and an upper bound"));
        };
        let predicate = Predicate::Between {
            column: column.as_str()?.to_owned(),
            min: *min,
            max: *max,
        };
        Ok(table.filter(&[predicate])?.into())
    })?;
    session.add_node("summary", ["selected", "column"], |args| {
        let table = args.get("selected")?.as_table()?;
        Ok(table.summary(args.get("column")?.as_str()?)?.into())
    })?;

    session.bind(
        "shape",
        View::Metric {
            label: "Shape".into(),
        },
    )?;
    session.bind("describe", View::Table)?;
    session.bind(
        "summary",
        View::Metric {
            label: "Summary".into(),
        },
    )?;
    if let Some(column) = column {
        session.bind(
            "selected",
            View::Chart(ChartSpec::new(ChartKind::Histogram, column)),
        )?;
    }
    Ok(())
}
