use serde::{Deserialize, Serialize};

use crate::ErrorCode;

/// `{"data": ...}` success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `{"data": [...], "meta": {limit, offset, count}}` pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedEnvelope<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub limit: u32,
    pub offset: u32,
    pub count: usize,
}

impl<T> PaginatedEnvelope<T> {
    pub fn new(data: Vec<T>, limit: u32, offset: u32) -> Self {
        let count = data.len();
        Self {
            data,
            meta: PaginationMeta {
                limit,
                offset,
                count,
            },
        }
    }
}

/// `{"error": {code, message, request_id}}` failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.as_str().to_string(),
                message: message.into(),
                request_id: request_id.into(),
            },
        }
    }
}
