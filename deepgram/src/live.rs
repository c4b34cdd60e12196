//! Live (streaming) transcription.
//!
//! # Endpoint
//!
//! - WSS `/v1/listen` - binary frames carry audio, text frames carry
//!   control messages (`KeepAlive`, `Finalize`, `CloseStream`) and results
//!
//! A background task reads the socket and feeds a bounded queue; the
//! caller drains it with [`LiveSession::recv`] or [`LiveSession::try_recv`]
//! on its own schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use http::header::AUTHORIZATION;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::{
    error::{Error, Result},
    events::{CloseEvent, ErrorEvent, LiveEvent, OpenEvent},
    http::{HttpClient, REQUEST_ID_HEADER},
};

const LISTEN_PATH: &str = "/v1/listen";

/// Model used when none is configured.
pub const DEFAULT_LIVE_MODEL: &str = "nova-3";

/// Language used when none is configured.
pub const DEFAULT_LIVE_LANGUAGE: &str = "en-US";

/// Default capacity of the event queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Interval between `KeepAlive` messages.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

// ================== Options ==================

/// Live session configuration.
///
/// Optional fields are only sent when set.
#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub model: String,
    pub language: String,
    /// Raw audio encoding (`linear16`, `mulaw`, ...). Leave unset for containerized audio.
    pub encoding: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub interim_results: Option<bool>,
    pub punctuate: Option<bool>,
    pub smart_format: Option<bool>,
    /// Silence in milliseconds before a result is marked `speech_final`.
    pub endpointing: Option<u32>,
    pub utterance_end_ms: Option<u32>,
    pub vad_events: Option<bool>,
    /// Send `KeepAlive` every [`KEEPALIVE_INTERVAL`] while the session is open.
    pub keepalive: bool,
    /// Capacity of the event queue.
    pub event_capacity: usize,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_LIVE_MODEL.to_string(),
            language: DEFAULT_LIVE_LANGUAGE.to_string(),
            encoding: None,
            sample_rate: None,
            channels: None,
            interim_results: None,
            punctuate: None,
            smart_format: None,
            endpointing: None,
            utterance_end_ms: None,
            vad_events: None,
            keepalive: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl LiveOptions {
    /// Returns the query pairs for the listen endpoint.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("model".to_string(), self.model.clone()),
            ("language".to_string(), self.language.clone()),
        ];
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                pairs.push((key.to_string(), v));
            }
        };
        push("encoding", self.encoding.clone());
        push("sample_rate", self.sample_rate.map(|v| v.to_string()));
        push("channels", self.channels.map(|v| v.to_string()));
        push("interim_results", self.interim_results.map(|v| v.to_string()));
        push("punctuate", self.punctuate.map(|v| v.to_string()));
        push("smart_format", self.smart_format.map(|v| v.to_string()));
        push("endpointing", self.endpointing.map(|v| v.to_string()));
        push("utterance_end_ms", self.utterance_end_ms.map(|v| v.to_string()));
        push("vad_events", self.vad_events.map(|v| v.to_string()));
        pairs
    }
}

// ================== Service ==================

/// Live transcription service.
pub struct LiveService {
    http: Arc<HttpClient>,
}

impl LiveService {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Opens a live session.
    ///
    /// The first queued event is always [`LiveEvent::Open`]; the last one is
    /// always [`LiveEvent::Close`].
    pub async fn connect(&self, options: &LiveOptions) -> Result<LiveSession> {
        let url = self
            .http
            .endpoint(self.http.ws_url(), LISTEN_PATH, &options.query())?;
        tracing::debug!(%url, "opening live session");

        let mut request = url.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.http.auth_value()?);

        let (ws_stream, response) = connect_async(request).await?;
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (write, read) = ws_stream.split();
        let write = Arc::new(Mutex::new(write));
        let closed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(options.event_capacity.max(1));

        // The queue is empty and has room for at least one event.
        let _ = tx.try_send(LiveEvent::Open(OpenEvent {
            request_id: request_id.clone(),
        }));

        let reader = tokio::spawn(receive_loop(read, tx, closed.clone()));
        let keepalive = options.keepalive.then(|| {
            tokio::spawn(keepalive_loop(
                write.clone(),
                closed.clone(),
                KEEPALIVE_INTERVAL,
            ))
        });

        Ok(LiveSession {
            write,
            events: rx,
            closed,
            request_id,
            reader,
            keepalive,
        })
    }
}

// ================== Session ==================

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// An open live transcription session.
///
/// Dropping the session stops its background tasks and releases the socket.
pub struct LiveSession {
    write: Arc<Mutex<WsSink>>,
    events: mpsc::Receiver<LiveEvent>,
    closed: Arc<AtomicBool>,
    request_id: Option<String>,
    reader: JoinHandle<()>,
    keepalive: Option<JoinHandle<()>>,
}

impl LiveSession {
    /// Returns the request ID assigned by the server, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns true once the session was closed locally or by the server.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Sends a chunk of audio.
    pub async fn send_audio(&self, audio: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        self.write
            .lock()
            .await
            .send(WsMessage::Binary(Bytes::copy_from_slice(audio)))
            .await
            .map_err(Error::WebSocket)
    }

    /// Asks the server to flush pending audio into results.
    pub async fn finalize(&self) -> Result<()> {
        self.send_control("Finalize").await
    }

    /// Tells the server no more audio follows.
    ///
    /// Remaining results, then `Metadata` and `Close`, keep arriving on the queue.
    pub async fn finish(&self) -> Result<()> {
        self.send_control("CloseStream").await
    }

    /// Waits for the next event. Returns `None` after the final `Close`.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        self.events.try_recv().ok()
    }

    /// Closes the session. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.abort();
        }

        let mut write = self.write.lock().await;
        if let Err(e) = write.send(control_message("CloseStream")).await {
            tracing::debug!(error = %e, "failed to send CloseStream");
        }
        write.close().await.map_err(Error::WebSocket)
    }

    async fn send_control(&self, kind: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        self.write
            .lock()
            .await
            .send(control_message(kind))
            .await
            .map_err(Error::WebSocket)
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.abort();
        }
        self.reader.abort();
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("request_id", &self.request_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn control_message(kind: &str) -> WsMessage {
    WsMessage::Text(serde_json::json!({ "type": kind }).to_string().into())
}

/// Reads frames from the socket and queues them as events.
async fn receive_loop(
    mut read: SplitStream<WsStream>,
    tx: mpsc::Sender<LiveEvent>,
    closed: Arc<AtomicBool>,
) {
    let mut close_event = None;

    while let Some(msg) = read.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => match LiveEvent::parse(text.as_str()) {
                Some(event) => {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                None => tracing::debug!(message = %text.as_str(), "ignoring live message"),
            },
            Ok(WsMessage::Close(frame)) => {
                close_event = Some(CloseEvent {
                    code: frame.as_ref().map(|f| u16::from(f.code)),
                    reason: frame
                        .as_ref()
                        .map(|f| f.reason.as_str().to_string())
                        .unwrap_or_default(),
                });
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                if !closed.load(Ordering::Relaxed) {
                    let event = LiveEvent::Error(ErrorEvent {
                        description: e.to_string(),
                        message: String::new(),
                        variant: "WebSocket".to_string(),
                    });
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }

    closed.store(true, Ordering::Relaxed);
    let _ = tx
        .send(LiveEvent::Close(close_event.unwrap_or_default()))
        .await;
}

async fn keepalive_loop(write: Arc<Mutex<WsSink>>, closed: Arc<AtomicBool>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if closed.load(Ordering::Relaxed) {
            break;
        }
        if let Err(e) = write.lock().await.send(control_message("KeepAlive")).await {
            tracing::warn!(error = %e, "keepalive failed");
            break;
        }
    }
}
