use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use tracing::{debug, trace};

use crate::error::ClientError;

use super::{HttpRequest, HttpResponse, Transport};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Transport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds the whole exchange, body included.
    pub fn with_timeouts(connect_timeout: Duration, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        debug!(
            http.method = %request.method,
            http.url = %request.url,
            body_len = request.body.as_ref().map_or(0, String::len),
            "http request"
        );
        let mut builder = self.client.request(request.method.clone(), request.url.as_str());
        if let Some(body) = request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(
            http.method = %request.method,
            http.url = %request.url,
            status,
            body_len = body.len(),
            "http response"
        );
        trace!(
            http.url = %request.url,
            body = %String::from_utf8_lossy(&body),
            "http response body"
        );

        Ok(HttpResponse { status, body })
    }
}
