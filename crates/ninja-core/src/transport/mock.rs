use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ClientError;

use super::{HttpRequest, HttpResponse, Transport};

/// A scripted transport for testing. Replays queued responses in order
/// and records every request it receives. Once the queue is empty it
/// answers 404 with an empty body.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<HttpResponse>,
    requests: Vec<HttpRequest>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.state
            .lock()
            .expect("mock state lock poisoned")
            .responses
            .push_back(HttpResponse {
                status,
                body: body.into(),
            });
        self
    }

    pub fn respond_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.respond(status, body.to_string())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state
            .lock()
            .expect("mock state lock poisoned")
            .requests
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().expect("mock state lock poisoned").requests.len()
    }

    /// URL of the most recent request.
    pub fn last_url(&self) -> Option<String> {
        self.requests().last().map(|r| r.url.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut state = self.state.lock().expect("mock state lock poisoned");
        state.requests.push(request);
        Ok(state.responses.pop_front().unwrap_or(HttpResponse {
            status: 404,
            body: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn get(url: &str) -> HttpRequest {
        HttpRequest {
            method: Method::GET,
            url: url.to_owned(),
            body: None,
        }
    }

    #[tokio::test]
    async fn replays_responses_in_order_then_404() {
        let mock = MockTransport::new();
        mock.respond(200, "first").respond(201, "second");

        assert_eq!(mock.execute(get("http://a/1")).await.unwrap().body, b"first");
        assert_eq!(mock.execute(get("http://a/2")).await.unwrap().status, 201);
        assert_eq!(mock.execute(get("http://a/3")).await.unwrap().status, 404);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.last_url().as_deref(), Some("http://a/3"));
    }
}
