//! Shared test helpers: a scripted HTTP fetch capability
//!
//! Routes are matched by substring against the requested URL. Each route
//! holds a response sequence; once only the final response remains it is
//! served repeatedly. Every request is recorded so tests can assert call
//! counts and inspect the URLs the adapters built.

use async_trait::async_trait;
use georesolve::error::{GeocodeError, Result};
use georesolve::http::{HttpFetch, HttpResponse};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct Route {
    needle: String,
    responses: VecDeque<HttpResponse>,
    hang: bool,
}

#[derive(Default)]
struct Inner {
    routes: Vec<Route>,
    urls: Vec<String>,
}

/// Scripted fetcher standing in for the network
pub struct MockFetch {
    inner: Mutex<Inner>,
}

impl MockFetch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Append a response to the route matching `needle`.
    pub fn respond(&self, needle: &str, status: u16, body: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        let body = body.into();
        if let Some(route) = inner.routes.iter_mut().find(|r| r.needle == needle) {
            route.responses.push_back(HttpResponse { status, body });
        } else {
            inner.routes.push(Route {
                needle: needle.to_string(),
                responses: VecDeque::from([HttpResponse { status, body }]),
                hang: false,
            });
        }
    }

    pub fn respond_json(&self, needle: &str, status: u16, body: &serde_json::Value) {
        self.respond(needle, status, body.to_string());
    }

    /// Make requests to `needle` never complete.
    pub fn hang(&self, needle: &str) {
        self.inner.lock().unwrap().routes.push(Route {
            needle: needle.to_string(),
            responses: VecDeque::new(),
            hang: true,
        });
    }

    /// Total requests observed.
    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().urls.len()
    }

    /// Requests whose URL contains `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .urls
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }

    pub fn urls(&self) -> Vec<String> {
        self.inner.lock().unwrap().urls.clone()
    }
}

#[async_trait]
impl HttpFetch for MockFetch {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let action = {
            let mut inner = self.inner.lock().unwrap();
            inner.urls.push(url.to_string());

            match inner.routes.iter_mut().find(|r| url.contains(&r.needle)) {
                Some(route) if route.hang => None,
                Some(route) => {
                    let response = if route.responses.len() > 1 {
                        route.responses.pop_front()
                    } else {
                        route.responses.front().cloned()
                    };
                    Some(response.ok_or_else(|| {
                        GeocodeError::service("mock route has no responses")
                    }))
                }
                None => Some(Err(GeocodeError::service(format!(
                    "no mock route matches {url}"
                )))),
            }
        };

        match action {
            Some(result) => result,
            // Hanging route: never resolves, the caller's deadline decides.
            None => std::future::pending().await,
        }
    }
}
