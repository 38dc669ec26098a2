use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pagination metadata
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Meta {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub total_results: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Meta {
    pub fn new(page: u32, per_page: u32, total_pages: u32, total_results: u32) -> Self {
        Self {
            page,
            per_page,
            total_pages,
            total_results,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Success envelope for every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            timestamp: Utc::now(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_flags() {
        let first = Meta::new(1, 20, 3, 55);
        assert!(first.has_next);
        assert!(!first.has_prev);

        let last = Meta::new(3, 20, 3, 55);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn test_envelope_omits_missing_meta() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2], "done")).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert!(body.get("meta").is_none());
    }
}
