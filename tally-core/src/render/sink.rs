//! Render sinks.
//!
//! A sink is the one-way end of a recompute pass: it receives each outcome
//! together with the view bound to the node and displays, records or
//! forwards it. Sinks never feed anything back into the graph, and a sink
//! that fails to write only logs the failure.

use std::io::Write;

use serde::Serialize;

use super::view::View;
use crate::data::Table;
use crate::error::TallyError;
use crate::graph::{NodeId, Outcome};
use crate::value::Value;

/// How prominently an outcome should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    /// Not enough data, e.g. zero rows after filtering.
    Info,
    /// The computation failed.
    Warning,
    /// Skipped because something upstream failed.
    Unavailable,
}

/// One outcome on its way to a sink.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub node: &'a NodeId,
    pub view: Option<&'a View>,
    pub outcome: &'a Outcome,
}

impl<'a> Frame<'a> {
    pub fn severity(&self) -> Severity {
        match self.outcome {
            Ok(_) => Severity::Ok,
            Err(err) if err.is_insufficient_data() => Severity::Info,
            Err(TallyError::Unavailable { .. }) => Severity::Unavailable,
            Err(_) => Severity::Warning,
        }
    }

    /// Serializable form used by the encoding sinks.
    pub fn record(&self) -> FrameRecord<'a> {
        let (value, error) = match self.outcome {
            Ok(value) => (Some(value.as_ref()), None),
            Err(err) => (None, Some(err)),
        };
        FrameRecord {
            node: self.node,
            view: self.view,
            severity: self.severity(),
            value,
            error,
        }
    }
}

/// Wire shape of a frame.
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub node: &'a NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<&'a View>,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a TallyError>,
}

/// A consumer of recompute outcomes.
pub trait RenderSink: Send {
    fn render(&mut self, frame: &Frame<'_>);
}

/// Keeps every frame in memory. Useful for tests and for callers that want
/// to inspect a pass after the fact.
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Vec<(NodeId, Option<View>, Outcome)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[(NodeId, Option<View>, Outcome)] {
        &self.frames
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.frames.iter().map(|(id, _, _)| id.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl RenderSink for RecordingSink {
    fn render(&mut self, frame: &Frame<'_>) {
        self.frames
            .push((frame.node.clone(), frame.view.cloned(), frame.outcome.clone()));
    }
}

/// Writes each frame as one line of JSON.
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSink for JsonLinesSink<W> {
    fn render(&mut self, frame: &Frame<'_>) {
        let written = serde_json::to_writer(&mut self.out, &frame.record())
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(err) = written {
            tracing::warn!(node = %frame.node, error = %err, "failed to write frame");
        }
    }
}

/// Writes each frame as a MessagePack map, back to back.
pub struct MsgPackSink<W> {
    out: W,
}

impl<W: Write + Send> MsgPackSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSink for MsgPackSink<W> {
    fn render(&mut self, frame: &Frame<'_>) {
        let record = frame.record();
        let mut serializer = rmp_serde::Serializer::new(&mut self.out).with_struct_map();
        if let Err(err) = record.serialize(&mut serializer) {
            tracing::warn!(node = %frame.node, error = %err, "failed to write frame");
        }
    }
}

/// Human-readable lines, one per frame.
pub struct TextSink<W> {
    out: W,
}

impl<W: Write + Send> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSink for TextSink<W> {
    fn render(&mut self, frame: &Frame<'_>) {
        let label = match frame.view {
            Some(View::Metric { label }) => label.as_str(),
            _ => frame.node.as_str(),
        };
        let written = match (frame.outcome, frame.severity()) {
            (Ok(value), _) => match &**value {
                Value::Table(table) => write_table(&mut self.out, label, table),
                value => writeln!(self.out, "{label}: {value}"),
            },
            (Err(err), Severity::Info) => writeln!(self.out, "{label}: (info) {err}"),
            (Err(err), Severity::Unavailable) => writeln!(self.out, "{label}: (unavailable) {err}"),
            (Err(err), _) => writeln!(self.out, "{label}: (warning) {err}"),
        };
        if let Err(err) = written {
            tracing::warn!(node = %frame.node, error = %err, "failed to write frame");
        }
    }
}

/// Rows printed per table before the rest is summarized.
const MAX_TABLE_ROWS: usize = 20;

/// A label line, then the header and rows of `table` in aligned columns.
fn write_table(out: &mut impl Write, label: &str, table: &Table) -> std::io::Result<()> {
    let shown = table.row_count().min(MAX_TABLE_ROWS);
    let columns: Vec<Vec<String>> = table
        .columns()
        .map(|(name, column)| {
            let mut cells = vec![name.to_owned()];
            cells.extend((0..shown).map(|row| match column.cell(row) {
                Some(Value::Null) | None => String::new(),
                Some(cell) => cell.to_string(),
            }));
            cells
        })
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .map(|cells| cells.iter().map(|c| c.chars().count()).max().unwrap_or(0))
        .collect();

    writeln!(out, "{label}:")?;
    for line in 0..=shown {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(cells, &width)| format!("{:<width$}", cells[line]))
            .collect();
        writeln!(out, "{}", cells.join("  ").trim_end())?;
    }
    if table.row_count() > shown {
        writeln!(out, "({} more rows)", table.row_count() - shown)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error::ComputeError;

    fn ok(value: Value) -> Outcome {
        Ok(Arc::new(value))
    }

    #[test]
    fn severity_follows_error_kind() {
        let node = NodeId::from("mean");
        let cases = [
            (ok(Value::Float(1.0)), Severity::Ok),
            (
                Err(TallyError::Computation {
                    node: node.clone(),
                    cause: ComputeError::insufficient("mean"),
                }),
                Severity::Info,
            ),
            (
                Err(TallyError::Computation {
                    node: node.clone(),
                    cause: ComputeError::NonNumericColumn {
                        column: "city".into(),
                    },
                }),
                Severity::Warning,
            ),
            (
                Err(TallyError::Unavailable {
                    node: node.clone(),
                    upstream: "filtered".into(),
                }),
                Severity::Unavailable,
            ),
        ];
        for (outcome, expected) in &cases {
            let frame = Frame {
                node: &node,
                view: None,
                outcome,
            };
            assert_eq!(frame.severity(), *expected);
        }
    }

    #[test]
    fn json_lines_sink_writes_one_line_per_frame() {
        let node = NodeId::from("total");
        let view = View::Metric {
            label: "Total".into(),
        };
        let outcome = ok(Value::Int(3));
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.render(&Frame {
            node: &node,
            view: Some(&view),
            outcome: &outcome,
        });
        sink.render(&Frame {
            node: &node,
            view: None,
            outcome: &outcome,
        });

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(
            first,
            serde_json::json!({
                "node": "total",
                "view": { "view": "metric", "label": "Total" },
                "severity": "ok",
                "value": { "type": "int", "value": 3 }
            })
        );
    }

    #[test]
    fn msgpack_sink_writes_maps() {
        let node = NodeId::from("total");
        let outcome = ok(Value::Int(3));
        let mut sink = MsgPackSink::new(Vec::new());
        sink.render(&Frame {
            node: &node,
            view: None,
            outcome: &outcome,
        });

        let bytes = sink.into_inner();
        let decoded: serde_json::Value = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded["node"], "total");
        assert_eq!(decoded["severity"], "ok");
    }

    #[test]
    fn text_sink_prints_table_cells() {
        use crate::data::Column;

        let table = Table::new()
            .with_column(
                "city",
                Column::Text(vec![Some("Recife".into()), Some("Natal".into())]),
            )
            .unwrap()
            .with_column("sales", Column::Int(vec![Some(100), None]))
            .unwrap();
        let node = NodeId::from("cities");
        let outcome = ok(table.into());
        let mut sink = TextSink::new(Vec::new());
        sink.render(&Frame {
            node: &node,
            view: Some(&View::Table),
            outcome: &outcome,
        });
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "cities:\ncity    sales\nRecife  100\nNatal\n"
        );
    }

    #[test]
    fn text_sink_caps_long_tables() {
        use crate::data::Column;

        let table = Table::new()
            .with_column("n", Column::Int((0..25).map(Some).collect()))
            .unwrap();
        let node = NodeId::from("numbers");
        let outcome = ok(table.into());
        let mut sink = TextSink::new(Vec::new());
        sink.render(&Frame {
            node: &node,
            view: Some(&View::Table),
            outcome: &outcome,
        });
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 1 + MAX_TABLE_ROWS + 1);
        assert_eq!(lines[2], "0");
        assert_eq!(lines.last(), Some(&"(5 more rows)"));
    }

    #[test]
    fn text_sink_uses_metric_label() {
        let node = NodeId::from("mean_sales");
        let view = View::Metric {
            label: "Average sales".into(),
        };
        let outcome = ok(Value::Float(250.0));
        let mut sink = TextSink::new(Vec::new());
        sink.render(&Frame {
            node: &node,
            view: Some(&view),
            outcome: &outcome,
        });
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "Average sales: 250\n"
        );
    }
}
