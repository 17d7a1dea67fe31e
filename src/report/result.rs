//! Caller-facing query result

use serde::Serialize;
use serde_json::{Map, Value};

use crate::compiler::CursorMode;

use super::codes::{ErrorCode, QueryFailure};

/// Rows for `list` plans, aggregate rows for `aggregate` plans
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryData {
    Rows { rows: Vec<Map<String, Value>> },
    Aggregates { aggregates: Vec<Map<String, Value>> },
}

impl QueryData {
    pub fn len(&self) -> usize {
        match self {
            QueryData::Rows { rows } => rows.len(),
            QueryData::Aggregates { aggregates } => aggregates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records in result order
    pub fn records(&self) -> &[Map<String, Value>] {
        match self {
            QueryData::Rows { rows } => rows,
            QueryData::Aggregates { aggregates } => aggregates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub execution_time_ms: u64,
    pub rows_returned: usize,
    pub pagination_mode: CursorMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    /// Present only when `has_more`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_token: Option<String>,
    pub has_more: bool,
    pub current_page: u32,
}

/// Outcome of one plan submission or page fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QueryResult {
    Success {
        data: QueryData,
        metadata: ResultMetadata,
        pagination: PaginationInfo,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        error_code: ErrorCode,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl QueryResult {
    /// Builds an error result from any failure.
    pub fn failed(failure: impl Into<QueryFailure>, request_id: Option<String>) -> Self {
        let failure = failure.into();
        QueryResult::Error {
            error_code: failure.code,
            message: failure.message,
            request_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success { .. })
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            QueryResult::Error { error_code, .. } => Some(*error_code),
            QueryResult::Success { .. } => None,
        }
    }

    pub fn data(&self) -> Option<&QueryData> {
        match self {
            QueryResult::Success { data, .. } => Some(data),
            QueryResult::Error { .. } => None,
        }
    }

    pub fn pagination(&self) -> Option<&PaginationInfo> {
        match self {
            QueryResult::Success { pagination, .. } => Some(pagination),
            QueryResult::Error { .. } => None,
        }
    }

    pub fn metadata(&self) -> Option<&ResultMetadata> {
        match self {
            QueryResult::Success { metadata, .. } => Some(metadata),
            QueryResult::Error { .. } => None,
        }
    }

    /// HTTP status for this result
    pub fn http_status(&self) -> u16 {
        self.error_code().map_or(200, |code| code.http_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanError;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let mut row = Map::new();
        row.insert("status".into(), json!("PAID"));
        let result = QueryResult::Success {
            data: QueryData::Rows { rows: vec![row] },
            metadata: ResultMetadata {
                execution_time_ms: 3,
                rows_returned: 1,
                pagination_mode: CursorMode::Offset,
                request_id: Some("req-1".into()),
            },
            pagination: PaginationInfo {
                query_token: Some("tok".into()),
                has_more: true,
                current_page: 1,
            },
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["rows"][0]["status"], "PAID");
        assert_eq!(value["metadata"]["executionTimeMs"], 3);
        assert_eq!(value["metadata"]["paginationMode"], "offset");
        assert_eq!(value["pagination"]["queryToken"], "tok");
        assert_eq!(value["pagination"]["hasMore"], true);
        assert_eq!(value["pagination"]["currentPage"], 1);
    }

    #[test]
    fn test_error_shape() {
        let result = QueryResult::failed(
            PlanError::unknown_entity("Refund"),
            Some("req-9".into()),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "error",
                "errorCode": "UNKNOWN_ENTITY",
                "message": "Entity 'Refund' is not declared in the catalog",
                "requestId": "req-9"
            })
        );
        assert_eq!(result.http_status(), 400);
    }

    #[test]
    fn test_aggregate_data_shape() {
        let data = QueryData::Aggregates { aggregates: vec![] };
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"aggregates": []})
        );
    }

    #[test]
    fn test_last_page_omits_token() {
        let info = PaginationInfo {
            query_token: None,
            has_more: false,
            current_page: 3,
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"hasMore": false, "currentPage": 3})
        );
    }
}
