//! A small AppProtocol application used by the demo binary and the tests.
//!
//! | Path      | Response                                                   |
//! |-----------|------------------------------------------------------------|
//! | `/`       | `200 text/plain` "Hello, world!" in one chunk              |
//! | `/stream` | `200 application/json`, sent two bytes at a time           |
//! | `/file`   | `200` via `http.response.pathsend` for the configured file |
//! | `/echo`   | `200` with the request body read back in full              |
//! | `/state`  | `200` with the greeting stored during lifespan startup     |
//! | `/fail`   | starts a `500`, then returns an error                      |
//! | other     | `404 text/plain`                                           |

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use rsgi_core::{Application, Headers, HttpScope, LifespanScope, Message, Receiver, Scope, Sender};
use serde_json::json;

/// Key under which lifespan startup stores its greeting.
pub const GREETING_KEY: &str = "greeting";

const STREAM_CHUNK: usize = 2;

/// The demo application.
#[derive(Debug, Clone)]
pub struct DemoApp {
    file: PathBuf,
}

impl DemoApp {
    /// Serves `file` on `/file`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    async fn lifespan(&self, scope: LifespanScope, mut receive: Receiver, send: Sender) -> anyhow::Result<()> {
        loop {
            match receive.receive().await? {
                Message::LifespanStartup => {
                    scope.state.insert(GREETING_KEY, json!("hello from lifespan"));
                    send.send(Message::LifespanStartupComplete).await?;
                }
                Message::LifespanShutdown => {
                    send.send(Message::LifespanShutdownComplete).await?;
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    async fn http(&self, scope: HttpScope, mut receive: Receiver, send: Sender) -> anyhow::Result<()> {
        match scope.path.as_str() {
            "/" => respond(&send, 200, "text/plain", Bytes::from_static(b"Hello, world!")).await,
            "/stream" => {
                let body = serde_json::to_vec(&json!({ "message": "streamed" }))?;
                send.send(Message::response_start(200, content_type("application/json")))
                    .await?;
                for chunk in body.chunks(STREAM_CHUNK) {
                    send.send(Message::response_body(chunk.to_vec(), true)).await?;
                }
                send.send(Message::response_body(Bytes::new(), false)).await?;
                Ok(())
            }
            "/file" => {
                send.send(Message::response_start(
                    200,
                    content_type("application/octet-stream"),
                ))
                .await?;
                send.send(Message::HttpResponsePathSend {
                    path: self.file.clone(),
                })
                .await?;
                Ok(())
            }
            "/echo" => {
                let mut body = BytesMut::new();
                loop {
                    match receive.receive().await? {
                        Message::HttpRequest { body: chunk, more_body } => {
                            body.extend_from_slice(&chunk);
                            if !more_body {
                                break;
                            }
                        }
                        _ => break,
                    }
                }
                respond(&send, 200, "application/octet-stream", body.freeze()).await
            }
            "/state" => {
                let greeting = scope
                    .state
                    .get(GREETING_KEY)
                    .and_then(|value| value.as_str().map(str::to_owned))
                    .unwrap_or_else(|| "no lifespan state".to_string());
                respond(&send, 200, "text/plain", Bytes::from(greeting)).await
            }
            "/fail" => {
                send.send(Message::response_start(500, content_type("text/plain")))
                    .await?;
                anyhow::bail!("demo failure after response start")
            }
            _ => respond(&send, 404, "text/plain", Bytes::from_static(b"not found")).await,
        }
    }
}

impl Default for DemoApp {
    fn default() -> Self {
        Self::new("Cargo.toml")
    }
}

#[async_trait]
impl Application for DemoApp {
    async fn call(&self, scope: Scope, receive: Receiver, send: Sender) -> anyhow::Result<()> {
        match scope {
            Scope::Lifespan(scope) => self.lifespan(scope, receive, send).await,
            Scope::Http(scope) => self.http(scope, receive, send).await,
        }
    }
}

fn content_type(value: &str) -> Headers {
    vec![(b"content-type".to_vec(), value.as_bytes().to_vec())]
}

async fn respond(send: &Sender, status: u16, kind: &str, body: Bytes) -> anyhow::Result<()> {
    send.send(Message::response_start(status, content_type(kind)))
        .await?;
    send.send(Message::response_body(body, false)).await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::RequestAdapter;
    use crate::domain::{AdapterConfig, Emission};
    use crate::infrastructure::loopback::{LoopbackProtocol, ResponseOp};
    use rsgi_core::{ServerScope, SharedState};
    use std::sync::Arc;

    async fn request(path: &str, body: Vec<Bytes>) -> (Emission, Arc<LoopbackProtocol>) {
        let adapter = RequestAdapter::new(
            Arc::new(DemoApp::new("/srv/demo.bin")),
            Arc::new(AdapterConfig::default()),
            SharedState::new(),
        );
        let scope = ServerScope {
            proto: "http".to_string(),
            method: "GET".to_string(),
            path: Some(path.to_string()),
            ..ServerScope::default()
        };
        let protocol = Arc::new(LoopbackProtocol::new(body));
        let emission = adapter.handle(Some(&scope), protocol.clone()).await.unwrap();
        (emission, protocol)
    }

    #[tokio::test]
    async fn test_root_is_single_bytes_response() {
        let (emission, protocol) = request("/", vec![]).await;

        assert_eq!(emission, Emission::Bytes { status: 200, len: 13 });
        assert_eq!(protocol.response().unwrap().body(), Bytes::from_static(b"Hello, world!"));
    }

    #[tokio::test]
    async fn test_stream_route_reassembles_to_json() {
        let (emission, protocol) = request("/stream", vec![]).await;

        assert!(matches!(emission, Emission::Stream { status: 200, .. }));
        let body = protocol.response().unwrap().body();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "message": "streamed" }));
    }

    #[tokio::test]
    async fn test_file_route_uses_path_send() {
        let (_, protocol) = request("/file", vec![]).await;

        assert_eq!(
            protocol.response().unwrap().op,
            ResponseOp::File(PathBuf::from("/srv/demo.bin"))
        );
    }

    #[tokio::test]
    async fn test_echo_route_returns_request_body() {
        let (_, protocol) =
            request("/echo", vec![Bytes::from_static(b"ping "), Bytes::from_static(b"pong")]).await;

        assert_eq!(protocol.response().unwrap().body(), Bytes::from_static(b"ping pong"));
    }

    #[tokio::test]
    async fn test_fail_route_emits_started_status() {
        let (emission, _) = request("/fail", vec![]).await;
        assert_eq!(emission, Emission::Empty { status: 500 });
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (emission, _) = request("/missing", vec![]).await;
        assert_eq!(emission, Emission::Bytes { status: 404, len: 9 });
    }

    #[test]
    fn test_default_file_exists() {
        // Tests run from the crate directory, which holds a Cargo.toml
        assert!(DemoApp::default().file.is_file());
    }
}
