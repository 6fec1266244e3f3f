//! Sends an [`HttpRequest`] to a live server with reqwest

use std::time::Duration;

use oascheck_core::{Headers, HttpRequest, HttpResponse};
use tracing::debug;

use crate::error::RunnerError;

#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpExecutor {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RunnerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RunnerError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Absolute URL with `{name}` placeholders filled from `path_params`.
    #[must_use]
    pub fn url_for(&self, request: &HttpRequest) -> String {
        let mut path = request.path.clone();
        for (name, value) in &request.path_params {
            path = path.replace(&format!("{{{name}}}"), value);
        }
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// # Errors
    ///
    /// Returns error on an invalid method or a transport failure.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RunnerError> {
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| RunnerError::Http(format!("invalid HTTP method '{}'", request.method)))?;
        let url = self.url_for(request);
        debug!(%method, %url, "sending request");

        let mut req = self.client.request(method, &url);
        for (name, value) in request.headers.iter() {
            // Values HTTP cannot carry never reach the server
            if reqwest::header::HeaderValue::from_str(value).is_ok() {
                req = req.header(name, value);
            }
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if !request.body.is_empty() {
            req = req.body(request.body.clone());
        }

        let resp = req.send().map_err(|e| RunnerError::Http(e.to_string()))?;
        let status = resp.status().as_u16();
        let headers: Headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = resp.text().map_err(|e| RunnerError::Http(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn url_fills_placeholders() {
        let executor = HttpExecutor::new("http://localhost:8080/").unwrap();
        let request = HttpRequest::new("GET", "/users/{id}/posts/{post}")
            .with_path_param("id", "42")
            .with_path_param("post", "7");
        assert_eq!(
            executor.url_for(&request),
            "http://localhost:8080/users/42/posts/7"
        );
    }

    #[test]
    fn invalid_method_is_rejected() {
        let executor = HttpExecutor::new("http://localhost:1").unwrap();
        let err = executor
            .execute(&HttpRequest::new("GE T", "/"))
            .unwrap_err();
        assert!(matches!(err, RunnerError::Http(ref m) if m.contains("invalid HTTP method")));
    }

    #[test]
    fn round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            let body = r#"[{"id":1}]"#;
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });

        let executor = HttpExecutor::new(format!("http://{addr}")).unwrap();
        let response = executor
            .execute(&HttpRequest::new("get", "/users?page=2").with_header("X-Trace", "t1"))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body, r#"[{"id":1}]"#);

        let head = server.join().unwrap();
        assert!(head.starts_with("GET /users?page=2 HTTP/1.1"));
        assert!(head.to_ascii_lowercase().contains("x-trace: t1"));
    }
}
