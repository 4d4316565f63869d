use async_trait::async_trait;
use serde_json::Value;

use crate::core::query::filter::{Filter, Match, Order};
use crate::core::query::key::Collection;
use crate::error::Result;

/// One record as the backend sees it.
pub type Row = serde_json::Map<String, Value>;

/// A fully resolved read against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectRequest {
    pub collection: Collection,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub single: bool,
}

impl SelectRequest {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            single: false,
        }
    }
}

/// The hosted relational backend, or anything that speaks its contract.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Rows as a JSON array, or one row as an object when `single` is set.
    async fn select(&self, request: &SelectRequest) -> Result<Value>;

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>>;

    async fn update(&self, collection: Collection, patch: Row, matcher: &Match) -> Result<Vec<Row>>;

    async fn delete(&self, collection: Collection, matcher: &Match) -> Result<Vec<Row>>;

    /// Invoke a named remote procedure on behalf of `caller`, the session's
    /// user id. The hosted backend identifies the caller by bearer token.
    async fn call(&self, procedure: &str, params: Value, caller: Option<&str>) -> Result<Value>;

    fn name(&self) -> &'static str;
}
