use crate::models::{Aggregate, ErrorBody};
use crate::widget::{ApiError, CounterApi};
use async_trait::async_trait;
use reqwest::{header::REFERER, Client, RequestBuilder, Response};
use serde_json::json;
use url::Url;

/// Talks to a counter over HTTP on behalf of one page.
#[derive(Debug, Clone)]
pub struct HttpCounterClient {
    http: Client,
    endpoint: Url,
    key: Option<String>,
    page_url: Option<String>,
}

impl HttpCounterClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            key: None,
            page_url: None,
        }
    }

    /// Explicit page key, sent instead of relying on the referer.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Page the widget lives on, sent as `Referer`. Browsers add this themselves.
    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = Some(page_url.into());
        self
    }

    fn with_referer(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.page_url {
            Some(page_url) => request.header(REFERER, page_url),
            None => request,
        }
    }

    fn read_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Some(key) = &self.key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }
}

#[async_trait]
impl CounterApi for HttpCounterClient {
    async fn read(&self) -> Result<Aggregate, ApiError> {
        let request = self.with_referer(self.http.get(self.read_url()));
        decode(request.send().await?).await
    }

    async fn increment(&self, score: u64) -> Result<Aggregate, ApiError> {
        let body = json!({ "score": score, "key": self.key });
        let request = self.with_referer(self.http.patch(self.endpoint.clone()).json(&body));
        decode(request.send().await?).await
    }
}

async fn decode(response: Response) -> Result<Aggregate, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
