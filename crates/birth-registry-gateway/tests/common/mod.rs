//! Shared fixtures for gateway integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use birth_registry_auth::MemoryTokenStore;
use birth_registry_gateway::{ApiError, HttpRequest, HttpResponse, HttpTransport, RequestGateway};

/// Transport replaying canned responses and recording requests.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn reply(&self, status: u16, body: &str) -> &Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
        self
    }

    pub fn fail(&self, error: ApiError) -> &Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().expect("requests lock").push(request);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Unreachable("no scripted reply".to_string())))
    }
}

/// Gateway over a scripted transport and an in-memory token store.
pub fn gateway(
    token: Option<&str>,
) -> (Arc<RequestGateway>, Arc<ScriptedTransport>, Arc<MemoryTokenStore>) {
    let transport = Arc::new(ScriptedTransport::default());
    let tokens = Arc::new(match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let gateway = RequestGateway::new(
        "http://localhost:3000/api/",
        transport.clone(),
        tokens.clone(),
    )
    .expect("gateway should build");
    (Arc::new(gateway), transport, tokens)
}
