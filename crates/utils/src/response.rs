use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PaginationMeta {
    pub fn new(total_items: i64, page: u32, limit: u32) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total_pages = (total_items.max(0) + i64::from(limit) - 1) / i64::from(limit);
        Self {
            page,
            limit,
            total_items,
            total_pages,
            has_next_page: i64::from(page) < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub details: Option<serde_json::Value>,
}

/// Envelope shared by every JSON response of the API.
///
/// Payloads are dynamic records, so only the envelope parts derive `TS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            timestamp: Utc::now(),
            data: Some(data),
            error: None,
            meta: None,
        }
    }

    pub fn paginated(data: T, meta: PaginationMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::success(data)
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::error_with_details(code, message, None)
    }

    pub fn error_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            timestamp: Utc::now(),
            data: None,
            error: Some(ErrorInfo {
                code: code.into(),
                message: message.into(),
                details,
            }),
            meta: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_meta_middle_page() {
        let meta = PaginationMeta::new(25, 2, 10);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_previous_page);
    }

    #[test]
    fn test_pagination_meta_empty() {
        let meta = PaginationMeta::new(0, 1, 10);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_previous_page);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let response: ApiResponse<()> = ApiResponse::error("NOT_FOUND", "Project with ID 3 not found");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert!(json.get("data").is_none());
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let response = ApiResponse::paginated(vec![1, 2], PaginationMeta::new(2, 1, 10));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["meta"]["totalItems"], 2);
        assert_eq!(json["meta"]["hasNextPage"], false);
    }

    #[test]
    fn test_envelope_parts_export_to_typescript() {
        assert!(PaginationMeta::decl().contains("totalItems"));
        assert!(ErrorInfo::decl().contains("details?"));
    }
}
