//! Compiled query and page window rendering

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::ValueKind;
use crate::pagination::{CursorState, PaginationError, PaginationResult};
use crate::plan::{Direction, Operation};

use super::params::{SqlParam, SqlQuery};

/// How successive pages are located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorMode {
    /// Last-seen ordering values; requires a unique, non-null ordering key
    Keyset,
    /// Row offset; may skip or repeat rows under concurrent writes
    Offset,
}

impl CursorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorMode::Keyset => "keyset",
            CursorMode::Offset => "offset",
        }
    }
}

/// Result column, keyed by logical field name or aggregate alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputColumn {
    pub name: String,
    pub kind: ValueKind,
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    /// SQL expression: a physical column or a quoted alias
    pub expr: String,
    /// Index into the output columns, used to read cursor values from rows
    pub column: usize,
    pub direction: Direction,
    /// The expression may evaluate to NULL
    pub nullable: bool,
}

impl OrderKey {
    fn render(&self) -> String {
        format!("{} {}", self.expr, self.direction.as_sql())
    }

    /// Condition for rows strictly after `value` on this key, or `None` when
    /// no row can follow it. SQLite sorts NULL before every value, so NULLs
    /// come first ascending and last descending.
    fn after(&self, value: &SqlParam, params: &mut Vec<SqlParam>) -> Option<String> {
        match (value, self.direction) {
            (SqlParam::Null, Direction::Asc) => Some(format!("{} IS NOT NULL", self.expr)),
            (SqlParam::Null, Direction::Desc) => None,
            (value, Direction::Asc) => {
                params.push(value.clone());
                Some(format!("{} > ?", self.expr))
            }
            (value, Direction::Desc) => {
                params.push(value.clone());
                if self.nullable {
                    Some(format!("({} < ? OR {} IS NULL)", self.expr, self.expr))
                } else {
                    Some(format!("{} < ?", self.expr))
                }
            }
        }
    }

    /// Condition for rows tied with `value` on this key
    fn tied(&self, value: &SqlParam, params: &mut Vec<SqlParam>) -> String {
        match value {
            SqlParam::Null => format!("{} IS NULL", self.expr),
            value => {
                params.push(value.clone());
                format!("{} = ?", self.expr)
            }
        }
    }
}

/// Statement pieces kept apart so the keyset predicate can join the WHERE list
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatementParts {
    pub select: String,
    pub conditions: Vec<String>,
    pub group_by: Vec<String>,
}

/// Output of the compiler
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub entity: String,
    pub operation: Operation,
    pub base: SqlQuery,
    pub columns: Vec<OutputColumn>,
    pub order_by: Vec<OrderKey>,
    pub cursor_mode: CursorMode,
    pub fingerprint: String,
    pub generation: u64,
    pub(crate) parts: StatementParts,
}

impl CompiledQuery {
    pub(crate) fn assemble(parts: &StatementParts, order_by: &[OrderKey]) -> String {
        Self::render(parts, order_by, None)
    }

    fn render(parts: &StatementParts, order_by: &[OrderKey], keyset: Option<&str>) -> String {
        let mut sql = parts.select.clone();

        let mut conditions: Vec<&str> = parts.conditions.iter().map(String::as_str).collect();
        if let Some(keyset) = keyset {
            conditions.push(keyset);
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !parts.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&parts.group_by.join(", "));
        }

        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let keys: Vec<String> = order_by.iter().map(OrderKey::render).collect();
            sql.push_str(&keys.join(", "));
        }

        sql
    }

    /// Whether a cursor can locate a page of this query
    pub fn accepts(&self, cursor: &CursorState) -> bool {
        match cursor {
            CursorState::Keyset { values } => {
                self.cursor_mode == CursorMode::Keyset && values.len() == self.order_by.len()
            }
            CursorState::Start | CursorState::Offset { .. } => true,
        }
    }

    /// Renders the statement for one page.
    ///
    /// Fetches `page_size + 1` rows so the caller can tell whether another
    /// page exists. Window parameters follow the base parameters. A keyset
    /// cursor that does not match the ordering is `StaleQuery`.
    pub fn page_statement(
        &self,
        page_size: u32,
        cursor: &CursorState,
    ) -> PaginationResult<SqlQuery> {
        if !self.accepts(cursor) {
            return Err(PaginationError::StaleQuery);
        }
        let mut params = self.base.params.clone();

        let mut sql = match cursor {
            CursorState::Keyset { values } => {
                let (predicate, keyset_params) = self.keyset_predicate(values);
                params.extend(keyset_params);
                Self::render(&self.parts, &self.order_by, Some(&predicate))
            }
            CursorState::Start | CursorState::Offset { .. } => self.base.sql.clone(),
        };

        sql.push_str(" LIMIT ?");
        params.push(SqlParam::Integer(i64::from(page_size) + 1));

        if let CursorState::Offset { offset } = cursor {
            sql.push_str(" OFFSET ?");
            params.push(SqlParam::Integer(i64::try_from(*offset).unwrap_or(i64::MAX)));
        }

        Ok(SqlQuery { sql, params })
    }

    /// `((k1 op ?) OR (k1 = ? AND k2 op ?) OR ...)`, with NULL-aware terms
    /// for nullable keys.
    fn keyset_predicate(&self, values: &[SqlParam]) -> (String, Vec<SqlParam>) {
        let mut branches = Vec::with_capacity(self.order_by.len());
        let mut params = Vec::new();

        for (i, key) in self.order_by.iter().enumerate() {
            let mut branch_params = Vec::new();
            let mut terms = Vec::with_capacity(i + 1);
            for (prefix, value) in self.order_by[..i].iter().zip(values) {
                terms.push(prefix.tied(value, &mut branch_params));
            }
            let Some(after) = key.after(&values[i], &mut branch_params) else {
                continue;
            };
            terms.push(after);
            branches.push(format!("({})", terms.join(" AND ")));
            params.extend(branch_params);
        }

        if branches.is_empty() {
            return ("(0)".to_string(), params);
        }
        (format!("({})", branches.join(" OR ")), params)
    }
}

/// SHA-256 over the SQL text, the canonical parameter encoding and the
/// output column names, base64url without padding.
pub fn fingerprint(query: &SqlQuery, columns: &[OutputColumn]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.sql.as_bytes());
    hasher.update([0u8]);
    for column in columns {
        hasher.update((column.name.len() as u64).to_be_bytes());
        hasher.update(column.name.as_bytes());
        hasher.update(column.kind.as_str().as_bytes());
        hasher.update([0u8]);
    }
    for param in &query.params {
        match param {
            SqlParam::Text(s) => {
                hasher.update(b"t");
                hasher.update((s.len() as u64).to_be_bytes());
                hasher.update(s.as_bytes());
            }
            SqlParam::Integer(i) => {
                hasher.update(b"i");
                hasher.update(i.to_be_bytes());
            }
            SqlParam::Real(f) => {
                hasher.update(b"r");
                hasher.update(f.to_bits().to_be_bytes());
            }
            SqlParam::Bool(b) => {
                hasher.update(b"b");
                hasher.update([u8::from(*b)]);
            }
            SqlParam::Null => hasher.update(b"n"),
        }
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
