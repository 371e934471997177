use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::store::{JobStore, Subscription};
use crate::{CreateError, JobRecord, NewJob, StoreError};

const PREFER_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestSettings {
    /// Project URL, e.g. `https://abc.supabase.co`. A path prefix such as
    /// `https://host/proxy` is kept.
    pub base_url: String,
    #[serde(default = "default_table")]
    pub table: String,
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_table() -> String {
    "wrapped_requests".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl RestSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            table: default_table(),
            api_key: api_key.into(),
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

/// PostgREST-style job table over HTTP.
///
/// There is no realtime transport here: [`JobStore::subscribe`] reports
/// [`StoreError::SubscriptionUnsupported`] and the poll loop carries updates.
#[derive(Debug, Clone)]
pub struct RestJobStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl RestJobStore {
    pub fn new(settings: &RestSettings) -> Result<Self, StoreError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| StoreError::Config(format!("base_url: {err}")))?;
        // `join` replaces the last segment unless the path ends in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(&format!("rest/v1/{}", settings.table))
            .map_err(|err| StoreError::Config(format!("table: {err}")))?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&settings.api_key)
            .map_err(|err| StoreError::Config(format!("api_key: {err}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|err| StoreError::Config(format!("api_key: {err}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|err| StoreError::Config(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    fn url(&self, query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let mut request = self
            .client
            .request(method, url)
            .header("Prefer", PREFER_REPRESENTATION);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                message: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|err| StoreError::Decode(err.to_string()))
    }
}

#[async_trait::async_trait]
impl JobStore for RestJobStore {
    async fn create(&self, job: NewJob) -> Result<JobRecord, CreateError> {
        let body = serde_json::to_vec(&[&job])
            .map_err(|err| CreateError::Store(StoreError::Decode(err.to_string())))?;
        let url = self.url(&[]);
        match self.send(Method::POST, url, Some(body)).await {
            Ok(records) => records.into_iter().next().ok_or_else(|| {
                CreateError::Store(StoreError::Decode("insert returned no rows".into()))
            }),
            Err(err) if is_conflict(&err) => Err(CreateError::Conflict(err.to_string())),
            Err(err) => Err(CreateError::Store(err)),
        }
    }

    async fn delete_by_wallet(&self, wallet: &str) -> Result<usize, StoreError> {
        let filter = format!("eq.{wallet}");
        let url = self.url(&[("wallet_address", filter.as_str())]);
        Ok(self.send(Method::DELETE, url, None).await?.len())
    }

    async fn read_latest(&self, wallet: &str) -> Result<Option<JobRecord>, StoreError> {
        let filter = format!("eq.{wallet}");
        let url = self.url(&[
            ("select", "*"),
            ("wallet_address", filter.as_str()),
            ("order", "created_at.desc"),
            ("limit", "1"),
        ]);
        Ok(self.send(Method::GET, url, None).await?.into_iter().next())
    }

    async fn read_by_id(&self, id: &str) -> Result<Option<JobRecord>, StoreError> {
        let filter = format!("eq.{id}");
        let url = self.url(&[("select", "*"), ("id", filter.as_str()), ("limit", "1")]);
        Ok(self.send(Method::GET, url, None).await?.into_iter().next())
    }

    async fn subscribe(&self, _wallet: &str) -> Result<Subscription, StoreError> {
        Err(StoreError::SubscriptionUnsupported)
    }
}

fn is_conflict(err: &StoreError) -> bool {
    match err {
        StoreError::Http { status, message } => {
            *status == StatusCode::CONFLICT.as_u16()
                || message.contains("already exists")
                || message.contains("duplicate key")
        }
        _ => false,
    }
}

fn map_reqwest_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        return StoreError::Unavailable(format!("timeout: {err}"));
    }
    if err.is_decode() {
        return StoreError::Decode(err.to_string());
    }
    StoreError::Unavailable(err.to_string())
}
