// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP server for the Prometheus scrape endpoint
//!
//! A small HTTP/1.1 server built on tokio. Every scrape of the metrics path
//! runs one full poll on a blocking thread; polls never overlap, so at most
//! one nvme-cli process runs at a time.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use nvme_exporter::{Collector, ExporterConfig, HttpServer, MetricCatalogue, NvmeCli};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExporterConfig::default();
//!     let catalogue = Arc::new(MetricCatalogue::new(&config.temperature_scale));
//!     let collector = Collector::new(catalogue, config.temperature_scale.clone());
//!     let server = HttpServer::new(config, collector, Arc::new(NvmeCli::default()));
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::collector::Collector;
use crate::config::ExporterConfig;
use crate::error::{ExporterError, Result};
use crate::nvme_cli::NvmeSource;
use crate::prometheus::CONTENT_TYPE;

const MAX_REQUEST_SIZE: usize = 8192;

/// Parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
}

/// Response ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut resp = format!("HTTP/1.1 {} {}\r\n", self.status, status_text(self.status));
        resp.push_str(&format!("Content-Type: {}\r\n", self.content_type));
        resp.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        resp.push_str("Connection: close\r\n");
        resp.push_str("\r\n");
        resp.push_str(&self.body);
        resp.into_bytes()
    }
}

/// HTTP server that exposes NVMe metrics
pub struct HttpServer {
    config: ExporterConfig,
    collector: Arc<Collector>,
    source: Arc<dyn NvmeSource>,
    poll_lock: Arc<Mutex<()>>,
}

impl HttpServer {
    pub fn new(config: ExporterConfig, collector: Collector, source: Arc<dyn NvmeSource>) -> Self {
        Self {
            config,
            collector: Arc::new(collector),
            source,
            poll_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run the HTTP server (blocks until the listener fails)
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ExporterError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!(
            "listening on http://{}{}",
            addr,
            self.config.metrics_path
        );

        let server = Arc::new(self);
        loop {
            let (mut stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    log::warn!("accept error: {}", e);
                    continue;
                }
            };

            let server = server.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; MAX_REQUEST_SIZE];
                let n = match stream.read(&mut buf).await {
                    Ok(n) if n > 0 => n,
                    _ => return,
                };

                let raw = String::from_utf8_lossy(&buf[..n]);
                let response = match parse_http_request(&raw) {
                    Some(request) => {
                        log::debug!("{} {} from {}", request.method, request.path, peer_addr);
                        server.handle(&request).await
                    }
                    None => HttpResponse::text(400, "Bad Request"),
                };

                if let Err(e) = stream.write_all(&response.to_bytes()).await {
                    log::debug!("write to {} failed: {}", peer_addr, e);
                }
            });
        }
    }

    /// Route one request
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.method != "GET" {
            return HttpResponse::text(405, "Method Not Allowed");
        }

        if request.path == self.config.metrics_path {
            return self.scrape().await;
        }

        if request.path == "/" {
            return HttpResponse {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: landing_page(&self.config.metrics_path),
            };
        }

        HttpResponse::text(404, "Not Found")
    }

    async fn scrape(&self) -> HttpResponse {
        let collector = self.collector.clone();
        let source = self.source.clone();
        let poll_lock = self.poll_lock.clone();

        let result = tokio::task::spawn_blocking(move || {
            let _guard = poll_lock
                .lock()
                .map_err(|_| ExporterError::Other("poll lock poisoned".into()))?;
            collector.scrape(source.as_ref())
        })
        .await;

        match result {
            Ok(Ok(body)) => HttpResponse {
                status: 200,
                content_type: CONTENT_TYPE,
                body,
            },
            Ok(Err(e)) => self.poll_failed(e.to_string()),
            Err(e) => self.poll_failed(format!("poll task failed: {}", e)),
        }
    }

    fn poll_failed(&self, message: String) -> HttpResponse {
        log::error!("poll failed: {}", message);
        if self.config.exit_on_poll_error {
            std::process::exit(1);
        }
        HttpResponse::text(500, message)
    }
}

/// Parse the request line of a raw HTTP/1.1 request; headers are ignored
fn parse_http_request(raw: &str) -> Option<HttpRequest> {
    let request_line = raw.lines().next()?;
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }

    let method = parts[0].to_uppercase();
    // Scrapers may append query parameters; routing ignores them
    let path = parts[1].split('?').next().unwrap_or(parts[1]).to_string();

    Some(HttpRequest { method, path })
}

fn landing_page(metrics_path: &str) -> String {
    format!(
        "<html><head><title>NVMe Exporter</title></head>\
         <body><h1>NVMe Exporter</h1><p><a href=\"{0}\">{0}</a></p></body></html>\n",
        metrics_path
    )
}

fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::MetricCatalogue;
    use crate::collector::tests::{two_namespace_source, FakeSource};
    use crate::smart::TemperatureScale;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Wraps a fake source, sleeping in every call and tracking how many
    /// calls overlap
    struct SlowSource {
        inner: FakeSource,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowSource {
        fn call<T>(&self, f: impl FnOnce(&FakeSource) -> T) -> T {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            let result = f(&self.inner);
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    impl NvmeSource for SlowSource {
        fn list(&self) -> Result<String> {
            self.call(|s| s.list())
        }

        fn id_ctrl(&self, controller: &str) -> Result<String> {
            self.call(|s| s.id_ctrl(controller))
        }

        fn smart_log(&self, device_path: &str) -> Result<String> {
            self.call(|s| s.smart_log(device_path))
        }
    }

    fn server() -> HttpServer {
        let scale = TemperatureScale::Celsius;
        let collector = Collector::new(Arc::new(MetricCatalogue::new(&scale)), scale);
        HttpServer::new(
            ExporterConfig::default(),
            collector,
            Arc::new(two_namespace_source()),
        )
    }

    fn get(path: &str) -> HttpRequest {
        parse_http_request(&format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path)).unwrap()
    }

    #[test]
    fn test_parse_http_request() {
        let raw = "GET /metrics?collect=all HTTP/1.1\r\n\
                   Host: localhost:9998\r\n\
                   Accept: text/plain\r\n\
                   \r\n";
        let req = parse_http_request(raw).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/metrics");
    }

    #[test]
    fn test_parse_http_request_rejects_garbage() {
        assert!(parse_http_request("").is_none());
        assert!(parse_http_request("GET\r\n\r\n").is_none());
    }

    #[test]
    fn test_response_bytes() {
        let bytes = HttpResponse::text(404, "Not Found").to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.ends_with("\r\n\r\nNot Found"));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(404), "Not Found");
        assert_eq!(status_text(500), "Internal Server Error");
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let response = server().handle(&get("/metrics")).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, CONTENT_TYPE);
        assert!(response.body.contains("nvme_total_capacity{controller=\"nvme0\"} 3000"));
    }

    #[tokio::test]
    async fn test_failed_poll_is_500() {
        let scale = TemperatureScale::Celsius;
        let collector = Collector::new(Arc::new(MetricCatalogue::new(&scale)), scale);
        let mut source = two_namespace_source();
        source.list = "not json".into();
        let server = HttpServer::new(ExporterConfig::default(), collector, Arc::new(source));

        let response = server.handle(&get("/metrics")).await;
        assert_eq!(response.status, 500);
        assert!(response.body.contains("nvme list json is not valid"));
    }

    #[tokio::test]
    async fn test_other_routes() {
        let server = server();
        let landing = server.handle(&get("/")).await;
        assert_eq!(landing.status, 200);
        assert!(landing.body.contains("href=\"/metrics\""));

        assert_eq!(server.handle(&get("/health")).await.status, 404);

        let post = parse_http_request("POST /metrics HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(server.handle(&post).await.status, 405);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_scrapes_never_overlap() {
        let scale = TemperatureScale::Celsius;
        let collector = Collector::new(Arc::new(MetricCatalogue::new(&scale)), scale);
        let source = Arc::new(SlowSource {
            inner: two_namespace_source(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let server = HttpServer::new(ExporterConfig::default(), collector, source.clone());

        let request = get("/metrics");
        let (first, second) = tokio::join!(server.handle(&request), server.handle(&request));

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 200);
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
        // Two full polls: list, id-ctrl and two smart-logs each
        assert_eq!(source.inner.calls().len(), 8);
    }
}
