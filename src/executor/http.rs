//! HTTP request executor.
//!
//! Step parameters:
//!
//! ```yaml
//! - type: http
//!   method: POST          # default GET
//!   url: http://localhost:8080
//!   path: /api/items      # appended to url
//!   headers:
//!     Content-Type: application/json
//!   body: '{"name": "x"}'
//! ```
//!
//! A response with any status is a successful execution; only transport
//! failures set `err`.

use reqwest::blocking::Client;
use reqwest::Method;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::Executor;
use crate::config::HttpConfig;
use crate::core::context::RunContext;
use crate::core::error::{Error, Result};
use crate::suite::{HttpResult, StepResult, TestStep};

#[derive(Debug, Deserialize)]
struct HttpParams {
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Build the client shared by every `http` executor of a run.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    let mut builder = Client::builder().danger_accept_invalid_certs(config.insecure);
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| Error::executor(format!("http client build failed: {e}")))
}

/// Sends one request per step and records the response.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn send(&self, params: &HttpParams, suite: &str) -> HttpResult {
        let method = match Method::from_bytes(params.method.to_uppercase().as_bytes()) {
            Ok(m) => m,
            Err(_) => return transport_error(format!("invalid method {:?}", params.method)),
        };
        let url = format!("{}{}", params.url, params.path);
        log::debug!("[{suite}] {method} {url}");

        let mut request = self.client.request(method, &url);
        for (name, value) in &params.headers {
            request = request.header(name, value);
        }
        if let Some(ref body) = params.body {
            request = request.body(body.clone());
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => return transport_error(format!("request to {url} failed: {e}")),
        };

        let statuscode = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        match response.text() {
            Ok(body) => HttpResult {
                statuscode,
                headers,
                body,
                ..Default::default()
            },
            Err(e) => HttpResult {
                statuscode,
                headers,
                err: Some(format!("cannot read response body: {e}")),
                ..Default::default()
            },
        }
    }
}

fn transport_error(message: String) -> HttpResult {
    HttpResult {
        statuscode: 0,
        err: Some(message),
        ..Default::default()
    }
}

impl Executor for HttpExecutor {
    fn name(&self) -> &str {
        "http"
    }

    fn run(&self, step: &TestStep, ctx: &RunContext) -> StepResult {
        let start = Instant::now();
        let mut result = match step.decode_params::<HttpParams>() {
            Ok(params) if params.url.is_empty() => transport_error("missing url".to_string()),
            Ok(params) => self.send(&params, &ctx.suite),
            Err(e) => transport_error(format!("invalid http step: {e}")),
        };
        result.time = start.elapsed().as_secs_f64();
        StepResult::Http(result)
    }

    fn field(&self, result: &StepResult, name: &str) -> Option<String> {
        let StepResult::Http(r) = result else {
            return None;
        };
        match name {
            "code" | "statuscode" => Some(r.statuscode.to_string()),
            "body" => Some(r.body.clone()),
            "err" => Some(r.err.clone().unwrap_or_default()),
            "time" => Some(r.time.to_string()),
            "headers" => serde_json::to_string(&r.headers).ok(),
            other => {
                let header = other.strip_prefix("headers.")?;
                Some(
                    r.headers
                        .iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(header))
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default(),
                )
            }
        }
    }

    fn default_assertion(&self) -> &str {
        "statuscode ShouldBeLessThan 300"
    }

    fn describe(&self, step: &TestStep) -> String {
        let method = step.param_str("method").unwrap_or_else(default_method);
        let url = step.param_str("url").unwrap_or_default();
        let path = step.param_str("path").unwrap_or_default();
        format!("{} {url}{path}", method.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tiny_http::{Header, Response, Server};

    fn executor() -> HttpExecutor {
        HttpExecutor::new(build_client(&HttpConfig::default()).unwrap())
    }

    fn step(yaml: &str) -> TestStep {
        serde_yaml::from_str(yaml).unwrap()
    }

    /// Serve `count` requests, echoing method, path and body back.
    fn echo_server(count: usize) -> (String, std::thread::JoinHandle<()>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}", server.server_addr().to_ip().unwrap());
        let handle = std::thread::spawn(move || {
            for _ in 0..count {
                let mut request = server.recv().unwrap();
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).unwrap();
                let text = format!("{} {} {}", request.method(), request.url(), body);
                let status = if request.url() == "/missing" { 404 } else { 200 };
                let response = Response::from_string(text)
                    .with_status_code(status)
                    .with_header(Header::from_bytes("X-Venom", "yes").unwrap());
                request.respond(response).unwrap();
            }
        });
        (url, handle)
    }

    #[test]
    fn test_request_records_response() {
        let (url, server) = echo_server(1);
        let exec = executor();
        let result = exec.run(
            &step(&format!(
                "url: {url}\npath: /items\nmethod: post\nbody: hello\nheaders:\n  Content-Type: text/plain\n"
            )),
            &RunContext::default(),
        );
        server.join().unwrap();

        assert_eq!(exec.field(&result, "statuscode").as_deref(), Some("200"));
        assert_eq!(exec.field(&result, "code").as_deref(), Some("200"));
        assert_eq!(exec.field(&result, "body").as_deref(), Some("POST /items hello"));
        assert_eq!(exec.field(&result, "headers.x-venom").as_deref(), Some("yes"));
        assert_eq!(exec.field(&result, "headers.Missing").as_deref(), Some(""));
        assert_eq!(exec.field(&result, "err").as_deref(), Some(""));
        assert!(result.err().is_none());
    }

    #[test]
    fn test_non_success_status_is_not_an_error() {
        let (url, server) = echo_server(1);
        let exec = executor();
        let result = exec.run(&step(&format!("url: {url}\npath: /missing\n")), &RunContext::default());
        server.join().unwrap();

        assert_eq!(exec.field(&result, "statuscode").as_deref(), Some("404"));
        assert!(result.err().is_none());
    }

    #[test]
    fn test_transport_error_sets_err() {
        // Bind then drop to get a port nothing listens on.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let exec = executor();
        let result = exec.run(&step(&format!("url: http://{addr}\n")), &RunContext::default());

        assert_eq!(exec.field(&result, "statuscode").as_deref(), Some("0"));
        assert!(result.err().unwrap().contains("failed"));
    }

    #[test]
    fn test_missing_url() {
        let exec = executor();
        let result = exec.run(&step("type: http\nmethod: GET\n"), &RunContext::default());
        assert_eq!(result.err(), Some("missing url"));
    }

    #[test]
    fn test_describe() {
        let s = step("url: http://localhost\npath: /health\n");
        assert_eq!(executor().describe(&s), "GET http://localhost/health");
    }
}
