//! The JSON envelope every endpoint answers with.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    fn empty(status: ResponseStatus) -> Self {
        Self {
            status,
            data: None,
            message: None,
            errors: None,
            pagination: None,
        }
    }

    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::empty(ResponseStatus::Success)
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::success(data)
        }
    }

    /// Success with a message and no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty(ResponseStatus::Success)
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::empty(ResponseStatus::Error)
        }
    }

    pub fn error_with_fields(message: &str, errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::error(message)
        }
    }
}
