//! Shared fixtures for records integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use birth_registry_auth::MemoryTokenStore;
use birth_registry_core::User;
use birth_registry_gateway::{ApiError, HttpRequest, HttpResponse, HttpTransport, RequestGateway};
use birth_registry_records::RecordsClient;

/// Transport replaying canned `(status, body)` replies keyed by URL path.
#[derive(Default)]
pub struct RouteTransport {
    replies: Mutex<VecDeque<(String, u16, String)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

#[allow(dead_code)]
impl RouteTransport {
    /// Queues a reply for the next request whose path+query ends with `suffix`.
    pub fn on(&self, suffix: &str, status: u16, body: &str) -> &Self {
        self.replies.lock().expect("replies lock").push_back((
            suffix.to_string(),
            status,
            body.to_string(),
        ));
        self
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|request| match request.url.query() {
                Some(query) => format!("{}?{query}", request.url.path()),
                None => request.url.path().to_string(),
            })
            .collect()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl HttpTransport for RouteTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let target = match request.url.query() {
            Some(query) => format!("{}?{query}", request.url.path()),
            None => request.url.path().to_string(),
        };
        self.requests.lock().expect("requests lock").push(request);

        let mut replies = self.replies.lock().expect("replies lock");
        let position = replies
            .iter()
            .position(|(suffix, _, _)| target.ends_with(suffix.as_str()));
        match position.and_then(|index| replies.remove(index)) {
            Some((_, status, body)) => Ok(HttpResponse { status, body }),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// Records client over a route-keyed transport with a stored token.
pub fn client() -> (Arc<RecordsClient>, Arc<RouteTransport>) {
    let transport = Arc::new(RouteTransport::default());
    let gateway = RequestGateway::new(
        "http://localhost:3000",
        transport.clone(),
        Arc::new(MemoryTokenStore::with_token("h.p.s")),
    )
    .expect("gateway should build");
    (Arc::new(RecordsClient::new(Arc::new(gateway))), transport)
}

#[allow(dead_code)]
pub fn user(role: &str) -> User {
    User::from_raw_role(7, "fixture", role).expect("fixture role")
}

#[allow(dead_code)]
pub const TWO_RECORDS: &str = r#"[
  {"id":1,"first_name":"Ada","last_name":"Uwase","date_of_birth":"2024-01-02",
   "gender":"FEMALE","status":"PENDING","user":{"id":7}},
  {"id":2,"firstName":"Ben","lastName":"Uwase","dateOfBirth":"2024-03-04",
   "gender":"MALE","status":"VERIFIED","blockchainTx":"0xab","user":{"id":7}}
]"#;
