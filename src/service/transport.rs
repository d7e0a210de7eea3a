//! Single-request HTTP transport.
//!
//! A [`Transport`] issues one request and resolves with the response body on
//! 2xx. Every other outcome is a [`ClipperError::Transport`]:
//!
//! | outcome | status | status text |
//! |---|---|---|
//! | non-2xx response | response status | canonical reason |
//! | connection or read failure | 0 (or the status seen) | `"transport failed"` |
//! | timeout elapsed | 504 | `"timed out"` |
//!
//! Retries are the caller's business.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClipperError, Result};

/// HTTP method subset used by the clipper API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// Binary upload for a multipart request: a `data` file part and a `props`
/// JSON text part.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub props: serde_json::Value,
}

/// Request payload.
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartUpload),
}

/// One HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
    pub timeout: Duration,
}

impl Request {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: Body::Empty,
            timeout,
        }
    }

    pub fn post(url: impl Into<String>, body: Body, timeout: Duration) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body,
            timeout,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Sends a single request; no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<String>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClipperError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    async fn execute(&self, request: Request) -> Result<String> {
        let mut builder = self
            .client
            .request(request.method.into(), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(upload) => {
                let part = reqwest::multipart::Part::bytes(upload.data)
                    .file_name(upload.file_name)
                    .mime_str(&upload.content_type)
                    .map_err(|e| {
                        ClipperError::HttpClient(format!("Failed to create multipart: {e}"))
                    })?;
                let form = reqwest::multipart::Form::new()
                    .part("data", part)
                    .text("props", upload.props.to_string());
                builder.multipart(form)
            }
        };

        let response = builder.send().await.map_err(|e| failure(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClipperError::Transport {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response.text().await.map_err(|e| failure(&e))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<String> {
        let timeout = request.timeout;
        let method = request.method;
        let url = request.url.clone();

        // Dropping the future on timeout abandons the in-flight request.
        match tokio::time::timeout(timeout, self.execute(request)).await {
            Ok(result) => {
                if let Err(ref e) = result {
                    tracing::debug!(?method, %url, error = %e, "Request failed");
                }
                result
            }
            Err(_) => {
                tracing::debug!(?method, %url, timeout_ms = timeout.as_millis() as u64, "Request timed out");
                Err(ClipperError::timed_out())
            }
        }
    }
}

fn failure(e: &reqwest::Error) -> ClipperError {
    if e.is_timeout() {
        return ClipperError::timed_out();
    }
    ClipperError::transport_failed(e.status().map(|s| s.as_u16()).unwrap_or(0))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// A request as seen by [`FakeTransport`].
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub method: Method,
        pub url: String,
        pub body: Body,
    }

    impl Recorded {
        /// URL path without scheme, host, port and query.
        pub fn path(&self) -> &str {
            let rest = self.url.split_once("://").map(|(_, r)| r).unwrap_or(&self.url);
            let path = rest.find('/').map(|i| &rest[i..]).unwrap_or("/");
            path.split('?').next().unwrap_or(path)
        }

        pub fn json(&self) -> Option<&serde_json::Value> {
            match &self.body {
                Body::Json(v) => Some(v),
                _ => None,
            }
        }
    }

    type Responder = Box<dyn Fn(&Request) -> Option<Result<String>> + Send + Sync>;

    /// Answers requests with the first matching rule; unmatched requests
    /// fail as a refused connection. Every request is recorded.
    #[derive(Default)]
    pub struct FakeTransport {
        rules: Mutex<Vec<Responder>>,
        queued: Mutex<VecDeque<(String, Result<String>)>>,
        log: Mutex<Vec<Recorded>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Always answer `method path` with `body`.
        pub fn on(self, method: Method, path: &str, body: &str) -> Self {
            let path = path.to_string();
            let body = body.to_string();
            self.rules.lock().unwrap().push(Box::new(
                move |req: &Request| -> Option<Result<String>> {
                    (req.method == method && path_of(&req.url) == path)
                        .then(|| Ok(body.clone()))
                },
            ));
            self
        }

        /// Always answer `GET url` (exact, query ignored) with `body`.
        pub fn on_url(self, url: &str, body: &str) -> Self {
            let url = url.to_string();
            let body = body.to_string();
            self.rules.lock().unwrap().push(Box::new(
                move |req: &Request| -> Option<Result<String>> {
                    let bare = req.url.split('?').next().unwrap_or(&req.url);
                    (req.method == Method::Get && bare == url).then(|| Ok(body.clone()))
                },
            ));
            self
        }

        /// Always answer `method path` with an HTTP error status.
        pub fn fail(self, method: Method, path: &str, status: u16) -> Self {
            let path = path.to_string();
            self.rules.lock().unwrap().push(Box::new(
                move |req: &Request| -> Option<Result<String>> {
                    (req.method == method && path_of(&req.url) == path).then(|| {
                        Err(ClipperError::Transport {
                            status,
                            status_text: "scripted failure".to_string(),
                        })
                    })
                },
            ));
            self
        }

        /// Answer the next request to `path` once, ahead of the standing rules.
        pub fn once(self, path: &str, result: Result<String>) -> Self {
            self.queued
                .lock()
                .unwrap()
                .push_back((path.to_string(), result));
            self
        }

        pub fn requests(&self) -> Vec<Recorded> {
            self.log.lock().unwrap().clone()
        }

        pub fn paths(&self) -> Vec<String> {
            self.requests().iter().map(|r| r.path().to_string()).collect()
        }
    }

    fn path_of(url: &str) -> String {
        Recorded {
            method: Method::Get,
            url: url.to_string(),
            body: Body::Empty,
        }
        .path()
        .to_string()
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: Request) -> Result<String> {
            self.log.lock().unwrap().push(Recorded {
                method: request.method,
                url: request.url.clone(),
                body: request.body.clone(),
            });

            {
                let mut queued = self.queued.lock().unwrap();
                let path = path_of(&request.url);
                if let Some(pos) = queued.iter().position(|(p, _)| *p == path) {
                    if let Some((_, result)) = queued.remove(pos) {
                        return result;
                    }
                }
            }

            for rule in self.rules.lock().unwrap().iter() {
                if let Some(result) = rule(&request) {
                    return result;
                }
            }
            Err(ClipperError::transport_failed(0))
        }
    }
}
