//! Declarative view descriptions attached to nodes.

use serde::{Deserialize, Serialize};

/// How a node's result should be displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// A data grid.
    Table,
    /// A single headline number.
    Metric { label: String },
    /// A chart over a table result.
    Chart(ChartSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Histogram,
    Map,
}

/// Chart kind plus the fields it plots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, x: impl Into<String>) -> Self {
        Self {
            kind,
            x: x.into(),
            y: None,
            color: None,
        }
    }

    pub fn y(mut self, field: impl Into<String>) -> Self {
        self.y = Some(field.into());
        self
    }

    pub fn color(mut self, field: impl Into<String>) -> Self {
        self.color = Some(field.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_view_serializes_flat() {
        let view = View::Chart(ChartSpec::new(ChartKind::Line, "year").y("value"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "view": "chart", "kind": "line", "x": "year", "y": "value" })
        );
    }
}
