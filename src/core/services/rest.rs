//! PostgREST-compatible HTTP backend.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::query::filter::{validate_projection, Match};
use crate::core::query::key::Collection;
use crate::core::services::backend::{Backend, Row, SelectRequest};
use crate::error::{BackendError, HerdbookError, NetworkError, Result};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

#[derive(Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    access_token: Option<String>,
    max_attempts: u32,
}

impl RestBackend {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        access_token: Option<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self> {
        url::Url::parse(base_url).map_err(NetworkError::Url)?;

        let version = env!("CARGO_PKG_VERSION");
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("herdbook/{}", version))
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            max_attempts: max_attempts.max(1),
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table_name())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        match self.access_token.as_ref().or(self.api_key.as_ref()) {
            Some(bearer) => request.bearer_auth(bearer),
            None => request,
        }
    }

    /// Send a read, retrying transient failures with exponential backoff.
    async fn send_read(&self, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.authorize(build()).send().await {
                Ok(response) => {
                    let status = response.status();
                    let transient = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if transient && attempt < self.max_attempts {
                        warn!("Backend returned {} (attempt {}/{}), retrying", status, attempt, self.max_attempts);
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt < self.max_attempts && !e.is_builder() {
                        warn!("Backend request failed (attempt {}/{}): {}", attempt, self.max_attempts, e);
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Send a write exactly once.
    async fn send_write(&self, request: RequestBuilder) -> Result<Response> {
        Ok(self.authorize(request).send().await?)
    }

    async fn read_rows(response: Response, collection: Collection) -> Result<Vec<Row>> {
        if !response.status().is_success() {
            return Err(error_from(response, Some(collection)).await);
        }
        let value: Value = response.json().await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(2u64.pow(attempt - 1) * 300) // 300ms, 600ms
}

/// Turn a non-success response into the backend's own error.
async fn error_from(response: Response, collection: Option<Collection>) -> HerdbookError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    if let (Some(collection), Some(NO_ROWS_CODE)) = (collection, body.code.as_deref()) {
        if body.details.as_deref().map_or(false, |d| d.contains(" 0 rows")) {
            return HerdbookError::NotFound { collection: collection.to_string() };
        }
    }

    HerdbookError::Backend(BackendError::Api {
        status: status.as_u16(),
        code: body.code,
        message: body.message.unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text.clone()
            }
        }),
        details: body.details,
        hint: body.hint,
    })
}

fn match_params(matcher: &Match) -> Vec<(String, String)> {
    matcher.to_filters().iter().flat_map(|f| f.to_postgrest()).collect()
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, request: &SelectRequest) -> Result<Value> {
        validate_projection(&request.columns)?;
        let mut params = vec![("select".to_string(), request.columns.replace(' ', ""))];
        for filter in &request.filters {
            filter.validate()?;
            params.extend(filter.to_postgrest());
        }
        if let Some(order) = &request.order {
            params.push(("order".to_string(), order.to_postgrest()));
        }
        if let Some(limit) = request.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let url = self.table_url(request.collection);
        debug!("GET {} {:?}", url, params);

        let response = self
            .send_read(|| {
                let builder = self.client.get(&url).query(&params);
                if request.single {
                    builder.header(reqwest::header::ACCEPT, SINGLE_OBJECT)
                } else {
                    builder
                }
            })
            .await?;

        if !response.status().is_success() {
            return Err(error_from(response, Some(request.collection)).await);
        }
        Ok(response.json().await?)
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
        let url = self.table_url(collection);
        debug!("POST {} ({} rows)", url, rows.len());
        let response = self
            .send_write(
                self.client
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(&rows),
            )
            .await?;
        Self::read_rows(response, collection).await
    }

    async fn update(&self, collection: Collection, patch: Row, matcher: &Match) -> Result<Vec<Row>> {
        let url = self.table_url(collection);
        let params = match_params(matcher);
        debug!("PATCH {} {:?}", url, params);
        let response = self
            .send_write(
                self.client
                    .patch(&url)
                    .query(&params)
                    .header("Prefer", "return=representation")
                    .json(&patch),
            )
            .await?;
        Self::read_rows(response, collection).await
    }

    async fn delete(&self, collection: Collection, matcher: &Match) -> Result<Vec<Row>> {
        let url = self.table_url(collection);
        let params = match_params(matcher);
        debug!("DELETE {} {:?}", url, params);
        let response = self
            .send_write(
                self.client
                    .delete(&url)
                    .query(&params)
                    .header("Prefer", "return=representation"),
            )
            .await?;
        Self::read_rows(response, collection).await
    }

    async fn call(&self, procedure: &str, params: Value, _caller: Option<&str>) -> Result<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, procedure);
        debug!("RPC {} {}", procedure, params);
        let response = self.send_read(|| self.client.post(&url).json(&params)).await?;
        if !response.status().is_success() {
            return Err(error_from(response, None).await);
        }
        Ok(response.json().await?)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
