#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use pantry_core::{
    CanonicalQuery, CatalogError, ExportSink, RawSearchResponse, Result, Source, SourceAdapter,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Adapter with a scripted answer, for driving the orchestrator without HTTP.
pub struct FakeAdapter {
    source: Source,
    items: Vec<Value>,
    declared_total: Option<u64>,
    fail: Option<fn() -> CatalogError>,
    healthy_calls: usize,
    delay: Duration,
    export_body: Option<Vec<u8>>,
    calls: Arc<AtomicUsize>,
}

impl FakeAdapter {
    pub fn returning(source: Source, items: Vec<Value>) -> Self {
        Self {
            source,
            items,
            declared_total: None,
            fail: None,
            healthy_calls: 0,
            delay: Duration::ZERO,
            export_body: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(source: Source, fail: fn() -> CatalogError) -> Self {
        Self {
            fail: Some(fail),
            ..Self::returning(source, Vec::new())
        }
    }

    /// Answer normally for the first `calls` searches, then fail.
    pub fn failing_after(mut self, calls: usize, fail: fn() -> CatalogError) -> Self {
        self.healthy_calls = calls;
        self.fail = Some(fail);
        self
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.declared_total = Some(total);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_export(mut self, body: &[u8]) -> Self {
        self.export_body = Some(body.to_vec());
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn source(&self) -> Source {
        self.source
    }

    fn description(&self) -> &'static str {
        "scripted test adapter"
    }

    async fn search(&self, _query: &CanonicalQuery) -> Result<RawSearchResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(fail) = self.fail {
            if call > self.healthy_calls {
                return Err(fail());
            }
        }
        Ok(match self.declared_total {
            Some(total) => RawSearchResponse::declared(self.items.clone(), total),
            None => RawSearchResponse::returned_only(self.items.clone()),
        })
    }

    async fn lookup_by_identifier(&self, id: &str) -> Result<Value> {
        let native = self.source.native_id(id);
        self.items
            .iter()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(native))
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    fn supports_export(&self) -> bool {
        self.export_body.is_some()
    }

    async fn export(
        &self,
        _query: &CanonicalQuery,
        ids: &[String],
        sink: &mut ExportSink<'_>,
    ) -> Result<u64> {
        let Some(ref body) = self.export_body else {
            return Err(CatalogError::ExportUnsupported(self.source));
        };
        let mut written = 0u64;
        for id in ids {
            let line = format!("{}\n", id);
            sink.write_all(line.as_bytes()).await?;
            written += line.len() as u64;
        }
        sink.write_all(body).await?;
        written += body.len() as u64;
        Ok(written)
    }
}

/// One request as seen by [`MockServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
struct Route {
    method: &'static str,
    path: &'static str,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

/// Canned HTTP/1.1 responses on a loopback port, one per method and path.
/// Unknown routes answer 404.
pub struct MockServer {
    base_url: String,
    routes: Vec<Route>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            base_url: String::new(),
            routes: Vec::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn json(self, method: &'static str, path: &'static str, status: u16, body: Value) -> Self {
        self.route(method, path, status, "application/json", body.to_string().into_bytes())
    }

    pub fn route(
        mut self,
        method: &'static str,
        path: &'static str,
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> Self {
        self.routes.push(Route {
            method,
            path,
            status,
            content_type,
            body,
        });
        self
    }

    pub async fn start(mut self) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        self.base_url = format!("http://{}", addr);

        let routes = self.routes.clone();
        let requests = self.requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let requests = requests.clone();
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut stream).await else {
                        return;
                    };
                    let route_path = request.path.split('?').next().unwrap_or("").to_string();
                    let route = routes
                        .iter()
                        .find(|r| r.method == request.method && r.path == route_path);
                    requests.lock().expect("request log").push(request);

                    let (status, content_type, body) = match route {
                        Some(r) => (r.status, r.content_type, r.body.clone()),
                        None => (404, "application/json", b"{}".to_vec()),
                    };
                    let head = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        reason(status),
                        content_type,
                        body.len()
                    );
                    let _ = stream.write_all(head.as_bytes()).await;
                    let _ = stream.write_all(&body).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("request log").clone()
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// A three-segment signed-token-shaped string whose claims expire `ttl_secs` from now.
pub fn signed_token(ttl_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + ttl_secs;
    let encode = |v: Value| base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(v.to_string());
    format!(
        "{}.{}.signature",
        encode(json!({"alg": "HS256", "typ": "JWT"})),
        encode(json!({"sub": "tester", "exp": exp}))
    )
}

pub fn client() -> reqwest::Client {
    pantry_core::connectors::build_client(Duration::from_secs(5)).expect("http client")
}
