use std::collections::HashMap;
use url::Url;

/// A single cell of a provider row.
///
/// The Sheets API hands back untyped JSON; only string cells can carry a
/// shortcut or a destination, everything else is kept as-is so it can be
/// reported and skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Other(serde_json::Value),
}

impl Cell {
    /// The cell's text if it is a non-empty string.
    pub fn non_empty_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Cell {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Cell::Text(s),
            other => Cell::Other(other),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_owned())
    }
}

/// One row as returned by the provider: `[shortcut, destination, ...]`.
pub type Row = Vec<Cell>;

/// Lowercased shortcut -> parsed destination.
pub type ShortcutMap = HashMap<String, Url>;
