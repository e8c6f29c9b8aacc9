//! REST record-store client for the sitesched panel
//!
//! The hosted backing store exposes a PostgREST-style API. This crate wraps
//! the small slice of it the panel needs: filtered and ordered reads,
//! inserts, field-level updates, and deletes, all scoped to one table per
//! client instance.
//!
//! # Features
//!
//! - Query API (`select`, `insert`, `update`, `delete`)
//! - Filtering (`eq`, `in_list`, comparison operators)
//! - Ordering and row limits
//! - Project scoping (`scope_project`)

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Structured error details returned by the store API
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Unified error type for record-store operations
#[derive(Error, Debug)]
pub enum RecordStoreError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: ApiErrorDetails,
        status: reqwest::StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError {
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// Sort direction for `order`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Client for one table of the hosted record store
///
/// Instances are cheap to build; filter and ordering methods consume and
/// return `self` so a query reads as a chain ending in `execute`, `insert`,
/// `update`, or `delete`.
#[derive(Clone)]
pub struct RecordStoreClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: HashMap<String, String>,
}

impl RecordStoreClient {
    /// Create a new client bound to one table
    pub fn new(base_url: &str, api_key: &str, table: &str, http_client: Client) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(api_key) {
            headers.insert("apikey", key);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: HashMap::new(),
        }
    }

    /// Add a custom header to every request this client sends
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, RecordStoreError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            RecordStoreError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            RecordStoreError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Attach a bearer token for authenticated requests
    pub fn with_auth(self, token: &str) -> Result<Self, RecordStoreError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    /// Choose the columns to return
    pub fn select(mut self, columns: &str) -> Self {
        self.query_params
            .insert("select".to_string(), columns.to_string());
        self
    }

    /// Equality filter
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("eq.{}", value));
        self
    }

    /// Greater-than filter
    pub fn gt(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("gt.{}", value));
        self
    }

    /// Greater-than-or-equal filter
    pub fn gte(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("gte.{}", value));
        self
    }

    /// Less-than filter
    pub fn lt(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("lt.{}", value));
        self
    }

    /// Less-than-or-equal filter
    pub fn lte(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .insert(column.to_string(), format!("lte.{}", value));
        self
    }

    /// Membership filter: column value must be one of `values`
    pub fn in_list(mut self, column: &str, values: &[&str]) -> Self {
        let value_list = values.join(",");
        self.query_params
            .insert(column.to_string(), format!("in.({})", value_list));
        self
    }

    /// Scope the query to one project
    ///
    /// Every table in the store carries a `project_id` column; all panel
    /// reads and writes go through this filter.
    pub fn scope_project(self, project_id: &str) -> Self {
        self.eq("project_id", project_id)
    }

    /// Sort the result set by one column
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        let order_str = match order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        self.query_params
            .insert("order".to_string(), format!("{}.{}", column, order_str));
        self
    }

    /// Sort by two columns, primary first
    pub fn order_by2(mut self, primary: &str, secondary: &str, order: SortOrder) -> Self {
        let order_str = match order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        self.query_params.insert(
            "order".to_string(),
            format!("{}.{},{}.{}", primary, order_str, secondary, order_str),
        );
        self
    }

    /// Limit the number of returned rows
    pub fn limit(mut self, count: i32) -> Self {
        self.query_params
            .insert("limit".to_string(), count.to_string());
        self
    }

    fn build_url(&self) -> Result<String, RecordStoreError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;

        for (key, value) in &self.query_params {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(url.to_string())
    }

    /// Headers with `Prefer: return=representation` for mutating requests
    fn mutation_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );
        headers
    }

    /// Turn a non-success response into a typed error
    async fn error_from_response(response: reqwest::Response) -> RecordStoreError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());

        match serde_json::from_str::<ApiErrorDetails>(&error_text) {
            Ok(details) => RecordStoreError::ApiError { details, status },
            Err(_) => RecordStoreError::UnparsedApiError {
                message: error_text,
                status,
            },
        }
    }

    /// Parse a mutation response body, tolerating empty 204-style bodies
    async fn mutation_result(response: reqwest::Response) -> Result<Value, RecordStoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body_text = response.text().await.map_err(|e| {
            RecordStoreError::DeserializationError(format!("Failed to read response body: {}", e))
        })?;

        if body_text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&body_text)
                .map_err(|e| RecordStoreError::DeserializationError(e.to_string()))
        }
    }

    /// Fetch the rows matching the accumulated filters
    pub async fn execute<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Vec<T>, RecordStoreError> {
        let url = self.build_url()?;
        log::debug!("record store GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(RecordStoreError::NetworkError)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| RecordStoreError::DeserializationError(e.to_string()))
    }

    /// Insert one row or, given a JSON array, several rows
    pub async fn insert<T: Serialize>(&self, values: T) -> Result<Value, RecordStoreError> {
        let url = self.build_url()?;
        log::debug!("record store POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.mutation_headers())
            .json(&values)
            .send()
            .await
            .map_err(RecordStoreError::NetworkError)?;

        Self::mutation_result(response).await
    }

    /// Update the rows matching the accumulated filters
    pub async fn update<T: Serialize>(&self, values: T) -> Result<Value, RecordStoreError> {
        let url = self.build_url()?;
        log::debug!("record store PATCH {}", url);

        let response = self
            .http_client
            .patch(&url)
            .headers(self.mutation_headers())
            .json(&values)
            .send()
            .await
            .map_err(RecordStoreError::NetworkError)?;

        Self::mutation_result(response).await
    }

    /// Delete the rows matching the accumulated filters
    pub async fn delete(&self) -> Result<Value, RecordStoreError> {
        let url = self.build_url()?;
        log::debug!("record store DELETE {}", url);

        let response = self
            .http_client
            .delete(&url)
            .headers(self.mutation_headers())
            .send()
            .await
            .map_err(RecordStoreError::NetworkError)?;

        Self::mutation_result(response).await
    }
}
