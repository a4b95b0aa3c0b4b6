//! WebSocket test client

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::server::{TestApp, TestUser};

/// How long to wait for a frame that should arrive
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Frames read while looking for another type
    pending: VecDeque<Value>,
    closed: bool,
}

/// Open `/ws` with the given session cookie value
pub async fn connect_with_token(app: &TestApp, token: &str) -> Result<WsClient, tungstenite::Error> {
    let mut request = app.ws_url().into_client_request()?;
    let cookie = HeaderValue::from_str(&format!("session_id={}", token)).expect("Invalid cookie");
    request.headers_mut().insert("Cookie", cookie);
    let (stream, _) = tokio_tungstenite::connect_async(request).await?;
    Ok(WsClient {
        stream,
        pending: VecDeque::new(),
        closed: false,
    })
}

/// Connect and wait until the server has registered the connection
///
/// Registration is followed by a `user_list_update` broadcast, so seeing one
/// means the connection is live. Frames received before it (the offline
/// backlog) stay queued for later reads.
pub async fn connect(app: &TestApp, user: &TestUser) -> WsClient {
    let mut client = connect_with_token(app, &user.token)
        .await
        .expect("WebSocket connect failed");
    client.next_frame_of_type("user_list_update").await;
    client
}

impl WsClient {
    pub async fn send_frame(&mut self, kind: &str, data: Value) {
        let text = json!({ "type": kind, "data": data }).to_string();
        self.send_raw(&text).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .expect("WebSocket send failed");
    }

    /// Next frame of `kind`, buffering any other frames read meanwhile
    ///
    /// Panics if none arrives within `FRAME_TIMEOUT`.
    pub async fn next_frame_of_type(&mut self, kind: &str) -> Value {
        self.try_frame_of_type(kind, FRAME_TIMEOUT)
            .await
            .unwrap_or_else(|| panic!("no '{}' frame within {:?}", kind, FRAME_TIMEOUT))
    }

    /// Assert no frame of `kind` arrives within `window`
    pub async fn expect_no_frame_of_type(&mut self, kind: &str, window: Duration) {
        if let Some(frame) = self.try_frame_of_type(kind, window).await {
            panic!("unexpected '{}' frame: {}", kind, frame);
        }
    }

    /// Wait until the server closes the socket; returns the close code if one was sent
    pub async fn expect_closed(&mut self) -> Option<u16> {
        let deadline = tokio::time::Instant::now() + FRAME_TIMEOUT;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Ok(Some(Ok(Message::Close(frame)))) => {
                    self.closed = true;
                    return frame.map(|f| u16::from(f.code));
                }
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(_))) | Ok(None) => {
                    self.closed = true;
                    return None;
                }
                Err(_) => panic!("socket still open after {:?}", FRAME_TIMEOUT),
            }
        }
    }

    /// Close from the client side
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }

    async fn try_frame_of_type(&mut self, kind: &str, window: Duration) -> Option<Value> {
        if let Some(index) = self.pending.iter().position(|frame| frame["type"] == kind) {
            return self.pending.remove(index);
        }
        if self.closed {
            return None;
        }

        let deadline = tokio::time::Instant::now() + window;
        loop {
            let next = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Ok(next) => next,
                Err(_) => return None,
            };
            match next {
                Some(Ok(Message::Text(text))) => {
                    let frame: Value = serde_json::from_str(text.as_str()).expect("Server sent invalid JSON");
                    if frame["type"] == kind {
                        return Some(frame);
                    }
                    self.pending.push_back(frame);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    self.closed = true;
                    return None;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}
