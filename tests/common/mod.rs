//! Scripted in-process HTTP backend shared by the adapter integration tests.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::any;
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A well-formed analysis as a model would write it.
pub const GOOD_ANALYSIS: &str = r#"{"systemStatus":"Good","summary":"Two disk warnings, otherwise healthy.","criticalIssues":[],"warnings":["/var at 85%"],"recommendations":["Rotate logs"],"metrics":{"errors":0}}"#;

/// One request as the fake backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone)]
struct Script {
    responses: Arc<Vec<(StatusCode, String)>>,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

async fn respond(
    State(script): State<Script>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let n = script.hits.fetch_add(1, Ordering::SeqCst);
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    script.requests.lock().unwrap().push(Recorded { headers, body });

    // The last scripted response repeats once the script runs out.
    let index = n.min(script.responses.len() - 1);
    let (status, body) = script.responses[index].clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// Builder for a fake backend with one script per path.
#[derive(Default)]
pub struct FakeBackend {
    routes: Vec<(&'static str, Vec<(StatusCode, String)>)>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `path` with `responses` in order.
    pub fn route(mut self, path: &'static str, responses: Vec<(u16, String)>) -> Self {
        assert!(!responses.is_empty(), "a route needs at least one response");
        let responses = responses
            .into_iter()
            .map(|(status, body)| (StatusCode::from_u16(status).unwrap(), body))
            .collect();
        self.routes.push((path, responses));
        self
    }

    /// Binds to an ephemeral port and serves in the background.
    pub async fn spawn(self) -> RunningBackend {
        let mut router: Router = Router::new();
        let mut scripts = HashMap::new();

        for (path, responses) in self.routes {
            let script = Script {
                responses: Arc::new(responses),
                hits: Arc::new(AtomicUsize::new(0)),
                requests: Arc::new(Mutex::new(Vec::new())),
            };
            router = router.route(path, any(respond).with_state(script.clone()));
            scripts.insert(path, script);
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        RunningBackend {
            base_url: format!("http://{}", addr),
            scripts,
        }
    }
}

pub struct RunningBackend {
    pub base_url: String,
    scripts: HashMap<&'static str, Script>,
}

impl RunningBackend {
    /// Number of requests received on `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.scripts[path].hits.load(Ordering::SeqCst)
    }

    /// Requests received on `path`, oldest first.
    pub fn requests(&self, path: &str) -> Vec<Recorded> {
        self.scripts[path].requests.lock().unwrap().clone()
    }
}
