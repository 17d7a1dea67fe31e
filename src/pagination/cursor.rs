//! Cursor state carried inside continuation tokens

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::{CompiledQuery, CursorMode, SqlParam};

/// Where the next page starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CursorState {
    /// First page
    Start,
    /// Ordering values of the last row delivered, one per order key, as
    /// stored; NULLs included
    Keyset { values: Vec<SqlParam> },
    /// Rows already delivered
    Offset { offset: u64 },
}

impl CursorState {
    /// Cursor for the page after `page`, given the last row delivered on it.
    ///
    /// Falls back to an offset cursor when the query is not keyset-paginated
    /// or a key value on the last row does not match its declared kind.
    pub fn after(
        query: &CompiledQuery,
        last_row: &Map<String, Value>,
        page_size: u32,
        page: u32,
    ) -> CursorState {
        if query.cursor_mode == CursorMode::Keyset {
            let values = query
                .order_by
                .iter()
                .map(|key| {
                    let column = query.columns.get(key.column)?;
                    let value = last_row.get(&column.name)?;
                    SqlParam::cursor_value(column.kind, value)
                })
                .collect::<Option<Vec<_>>>();
            if let Some(values) = values {
                return CursorState::Keyset { values };
            }
        }
        CursorState::Offset {
            offset: u64::from(page) * u64::from(page_size),
        }
    }

    /// Pagination mode used to fetch with this cursor
    pub fn mode(&self, query: &CompiledQuery) -> CursorMode {
        match self {
            CursorState::Start => query.cursor_mode,
            CursorState::Keyset { .. } => CursorMode::Keyset,
            CursorState::Offset { .. } => CursorMode::Offset,
        }
    }
}
