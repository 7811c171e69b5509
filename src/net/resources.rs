//! Course resource endpoints on the shared authenticated client.
//!
//! Every call goes through [`ApiClient`], so the session's `401` interceptor
//! sees these responses like any other.

#[cfg(test)]
#[path = "resources_test.rs"]
mod resources_test;

use std::fmt;
use std::str::FromStr;

use super::client::{ApiClient, ApiError};
use super::types::{Page, Resource};

pub const RESOURCES_PATH: &str = "/api/resources";

/// Ordering of search results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Relevance,
    Date,
    Name,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
            Self::Name => "name",
        }
    }
}

/// How multiple search terms combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    And,
    Or,
}

impl MatchMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} {value:?}")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

impl FromStr for SortOrder {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "date" => Ok(Self::Date),
            "name" => Ok(Self::Name),
            _ => Err(ParseOptionError { kind: "sort order", value: s.to_owned() }),
        }
    }
}

impl FromStr for MatchMode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            _ => Err(ParseOptionError { kind: "match mode", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of `GET /api/resources/search`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
    pub sort: SortOrder,
    pub mode: MatchMode,
}

impl SearchQuery {
    /// Query for `q` with the server's defaults: first page of ten, by relevance, all terms.
    #[must_use]
    pub fn new(q: impl Into<String>) -> Self {
        Self { q: q.into(), page: 1, size: 10, sort: SortOrder::default(), mode: MatchMode::default() }
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("q".to_owned(), self.q.clone()),
            ("page".to_owned(), self.page.to_string()),
            ("size".to_owned(), self.size.to_string()),
            ("sort".to_owned(), self.sort.as_str().to_owned()),
            ("mode".to_owned(), self.mode.as_str().to_owned()),
        ]
    }
}

/// Resource endpoints.
#[derive(Clone)]
pub struct ResourceApi {
    api: ApiClient,
}

impl ResourceApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All resources, newest first as the server orders them.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or schema mismatch.
    pub async fn list(&self) -> Result<Vec<Resource>, ApiError> {
        self.api.get_json(RESOURCES_PATH).await
    }

    /// One page of full-text search results.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or schema mismatch.
    pub async fn search(&self, query: &SearchQuery) -> Result<Page<Resource>, ApiError> {
        let path = format!("{RESOURCES_PATH}/search");
        self.api.get_json_with_query(&path, query.to_pairs()).await
    }

    /// Delete a resource the current user uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.api.delete(&format!("{RESOURCES_PATH}/{id}")).await?;
        tracing::info!(resource_id = id, "resource deleted");
        Ok(())
    }

    /// Raw bytes of one attachment.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn download(&self, id: i64, attachment_id: i64) -> Result<Vec<u8>, ApiError> {
        self.api
            .get_bytes(&format!("{RESOURCES_PATH}/{id}/download/{attachment_id}"))
            .await
    }
}
