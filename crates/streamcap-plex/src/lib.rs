#![forbid(unsafe_code)]

//! Plex Media Server client for the streamcap run: reachability, active
//! sessions and the `WanPerStreamMaxUploadRate` preference.

mod parse;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use streamcap_core::{MediaServer, ServerError, StreamSample};
use tracing::debug;

pub use parse::{parse_sessions, parse_upload_cap};

pub const UPLOAD_RATE_PREF: &str = "WanPerStreamMaxUploadRate";
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PlexClient {
    http: Client,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ServerError> {
        let http = Client::builder()
            .connect_timeout(PING_TIMEOUT)
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .query(&[("X-Plex-Token", self.token.as_str())])
            .timeout(timeout)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, ServerError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        response.text().await.map_err(transport_error)
    }
}

impl MediaServer for PlexClient {
    async fn ping(&self) -> Result<(), ServerError> {
        debug!("pinging {}", self.base_url);
        self.send(self.request(Method::GET, "/", PING_TIMEOUT))
            .await
            .map(|_| ())
    }

    async fn sessions(&self) -> Result<Vec<StreamSample>, ServerError> {
        let body = self
            .send(self.request(Method::GET, "/status/sessions", REQUEST_TIMEOUT))
            .await?;
        parse_sessions(&body)
    }

    async fn upload_cap(&self) -> Result<Option<u32>, ServerError> {
        let body = self
            .send(self.request(Method::GET, "/:/prefs", REQUEST_TIMEOUT))
            .await?;
        parse_upload_cap(&body)
    }

    async fn set_upload_cap(&self, kbps: u32) -> Result<(), ServerError> {
        let request = self
            .request(Method::PUT, "/:/prefs", REQUEST_TIMEOUT)
            .query(&[(UPLOAD_RATE_PREF, kbps)]);
        self.send(request).await.map(|_| ())
    }
}

// The request URL carries the token, keep it out of error text.
fn transport_error(err: reqwest::Error) -> ServerError {
    ServerError::Transport(err.without_url().to_string())
}

fn status_error(status: StatusCode) -> ServerError {
    ServerError::Status(status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::mpsc,
    };

    /// Answers one request per canned response and reports each request
    /// line it saw.
    async fn serve(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0_u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                let text = String::from_utf8_lossy(&head);
                let request_line = text.lines().next().unwrap_or_default().to_string();
                tx.send(request_line).unwrap();
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });
        (format!("http://{addr}"), rx)
    }

    #[tokio::test]
    async fn reads_and_writes_upload_cap_with_token() {
        let prefs = r#"<MediaContainer size="1"><Setting id="WanPerStreamMaxUploadRate" value="8000" /></MediaContainer>"#;
        let (url, mut seen) = serve(vec![(200, prefs), (200, "")]).await;
        let client = PlexClient::new(&format!("{url}/"), "secret").unwrap();

        assert_eq!(client.upload_cap().await.unwrap(), Some(8_000));
        client.set_upload_cap(12_000).await.unwrap();

        let get = seen.recv().await.unwrap();
        assert!(get.starts_with("GET /:/prefs?X-Plex-Token=secret "), "{get}");
        let put = seen.recv().await.unwrap();
        assert!(put.starts_with("PUT /:/prefs?"), "{put}");
        assert!(put.contains("WanPerStreamMaxUploadRate=12000"), "{put}");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (url, _seen) = serve(vec![(401, "")]).await;
        let client = PlexClient::new(&url, "bad").unwrap();
        assert_eq!(client.ping().await.unwrap_err(), ServerError::Status(401));
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PlexClient::new(&format!("http://{addr}"), "secret-token").unwrap();
        let err = client.ping().await.unwrap_err();
        assert!(matches!(err, ServerError::Transport(_)));
        assert!(!err.to_string().contains("secret-token"));
    }
}
