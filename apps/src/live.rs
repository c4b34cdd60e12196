//! Live transcription sessions.
//!
//! The caller owns a [`SessionSlot`] holding at most one session. Events
//! queue up inside the session and are rendered when the caller drains them.

use async_trait::async_trait;
use speechdesk_deepgram::{LiveEvent, LiveOptions, LiveService, LiveSession};

use crate::error::{Error, Result};
use crate::surface::Surface;

/// Shown when a session could not be opened.
pub const FAILED_TO_START: &str = "Failed to start connection";

/// Opens live sessions.
#[async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, options: &LiveOptions) -> speechdesk_deepgram::Result<Box<dyn LiveHandle>>;
}

/// An open live session.
#[async_trait]
pub trait LiveHandle: Send + Sync {
    async fn send_audio(&self, audio: &[u8]) -> speechdesk_deepgram::Result<()>;

    /// Signals that no more audio follows; the stream then winds down to `Close`.
    async fn finish(&self) -> speechdesk_deepgram::Result<()>;

    async fn recv(&mut self) -> Option<LiveEvent>;

    fn try_recv(&mut self) -> Option<LiveEvent>;

    async fn close(&mut self) -> speechdesk_deepgram::Result<()>;
}

#[async_trait]
impl LiveConnector for LiveService {
    async fn connect(&self, options: &LiveOptions) -> speechdesk_deepgram::Result<Box<dyn LiveHandle>> {
        let session = LiveService::connect(self, options).await?;
        Ok(Box::new(session))
    }
}

#[async_trait]
impl LiveHandle for LiveSession {
    async fn send_audio(&self, audio: &[u8]) -> speechdesk_deepgram::Result<()> {
        LiveSession::send_audio(self, audio).await
    }

    async fn finish(&self) -> speechdesk_deepgram::Result<()> {
        LiveSession::finish(self).await
    }

    async fn recv(&mut self) -> Option<LiveEvent> {
        LiveSession::recv(self).await
    }

    fn try_recv(&mut self) -> Option<LiveEvent> {
        LiveSession::try_recv(self)
    }

    async fn close(&mut self) -> speechdesk_deepgram::Result<()> {
        LiveSession::close(self).await
    }
}

/// Caller-owned holder for the current live session.
#[derive(Default)]
pub struct SessionSlot {
    session: Option<Box<dyn LiveHandle>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Installs `session`, closing the one it replaces.
    pub async fn replace(&mut self, session: Box<dyn LiveHandle>) {
        if let Some(mut previous) = self.session.take() {
            if let Err(e) = previous.close().await {
                tracing::warn!(error = %e, "failed to close previous live session");
            }
        }
        self.session = Some(session);
    }

    /// Closes and releases the held session, if any.
    pub async fn close(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.close().await.map_err(Error::from),
            None => Ok(()),
        }
    }

    /// Streams a chunk of audio into the held session.
    pub async fn send_audio(&self, audio: &[u8]) -> Result<()> {
        let session = self.session.as_ref().ok_or(Error::NotConnected)?;
        session.send_audio(audio).await.map_err(Error::from)
    }

    /// Tells the held session that the audio is complete.
    pub async fn finish(&self) -> Result<()> {
        let session = self.session.as_ref().ok_or(Error::NotConnected)?;
        session.finish().await.map_err(Error::from)
    }
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlot")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Opens a session and installs it in `slot`.
///
/// On failure renders [`FAILED_TO_START`] and leaves `slot` as it was.
pub async fn initialize_connection(
    connector: &dyn LiveConnector,
    options: &LiveOptions,
    slot: &mut SessionSlot,
    surface: &mut dyn Surface,
) -> bool {
    match connector.connect(options).await {
        Ok(session) => {
            slot.replace(session).await;
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to start live session");
            surface.error(FAILED_TO_START);
            false
        }
    }
}

/// Renders one event. Returns true when the event ends the stream.
pub fn render_event(event: &LiveEvent, surface: &mut dyn Surface) -> bool {
    match event {
        LiveEvent::Open(_) | LiveEvent::Error(_) => {
            surface.write(&format!("\n\n{}\n\n", event));
            false
        }
        LiveEvent::Close(_) => {
            surface.write(&format!("\n\n{}\n\n", event));
            true
        }
        LiveEvent::Transcript(result) => {
            let transcript = result.transcript();
            if !transcript.is_empty() {
                surface.write(transcript);
            }
            false
        }
        other => {
            tracing::debug!(kind = ?other.kind(), "live event not rendered");
            false
        }
    }
}

/// Renders every queued event without waiting. Returns how many were handled.
pub fn drain(slot: &mut SessionSlot, surface: &mut dyn Surface) -> usize {
    let mut handled = 0;
    let mut ended = false;
    if let Some(session) = slot.session.as_mut() {
        while let Some(event) = session.try_recv() {
            handled += 1;
            if render_event(&event, surface) {
                ended = true;
                break;
            }
        }
    }
    if ended {
        slot.session = None;
    }
    handled
}

/// Renders events as they arrive until the stream ends.
pub async fn pump(slot: &mut SessionSlot, surface: &mut dyn Surface) -> usize {
    let mut handled = 0;
    if let Some(session) = slot.session.as_mut() {
        while let Some(event) = session.recv().await {
            handled += 1;
            if render_event(&event, surface) {
                break;
            }
        }
    }
    slot.session = None;
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Recorder;
    use speechdesk_deepgram::{
        Alternative, Channel, CloseEvent, ErrorEvent, LiveResult, OpenEvent,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    struct MockSession {
        events: mpsc::Receiver<LiveEvent>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LiveHandle for MockSession {
        async fn send_audio(&self, audio: &[u8]) -> speechdesk_deepgram::Result<()> {
            self.sent.lock().unwrap().push(audio.to_vec());
            Ok(())
        }
        async fn finish(&self) -> speechdesk_deepgram::Result<()> {
            Ok(())
        }
        async fn recv(&mut self) -> Option<LiveEvent> {
            self.events.recv().await
        }
        fn try_recv(&mut self) -> Option<LiveEvent> {
            self.events.try_recv().ok()
        }
        async fn close(&mut self) -> speechdesk_deepgram::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn mock_session(events: Vec<LiveEvent>) -> (MockSession, Arc<AtomicUsize>, Arc<Mutex<Vec<Vec<u8>>>>) {
        let (tx, rx) = mpsc::channel(100);
        for e in events {
            tx.try_send(e).unwrap();
        }
        let closes = Arc::new(AtomicUsize::new(0));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let session = MockSession {
            events: rx,
            sent: sent.clone(),
            closes: closes.clone(),
        };
        (session, closes, sent)
    }

    struct FailingConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl LiveConnector for FailingConnector {
        async fn connect(&self, _options: &LiveOptions) -> speechdesk_deepgram::Result<Box<dyn LiveHandle>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(speechdesk_deepgram::Error::Other("connection refused".to_string()))
        }
    }

    struct ScriptedConnector {
        sessions: Mutex<Vec<MockSession>>,
    }

    #[async_trait]
    impl LiveConnector for ScriptedConnector {
        async fn connect(&self, _options: &LiveOptions) -> speechdesk_deepgram::Result<Box<dyn LiveHandle>> {
            let session = self.sessions.lock().unwrap().remove(0);
            Ok(Box::new(session))
        }
    }

    fn transcript(text: &str) -> LiveEvent {
        LiveEvent::Transcript(LiveResult {
            channel: Channel {
                alternatives: vec![Alternative {
                    transcript: text.to_string(),
                    ..Default::default()
                }],
            },
            ..Default::default()
        })
    }

    fn close_event() -> LiveEvent {
        LiveEvent::Close(CloseEvent {
            code: Some(1000),
            reason: String::new(),
        })
    }

    #[tokio::test]
    async fn test_start_failure_renders_once_and_leaves_slot_empty() {
        let connector = FailingConnector {
            attempts: AtomicUsize::new(0),
        };
        let mut slot = SessionSlot::new();
        let mut rec = Recorder::new();

        let started = initialize_connection(&connector, &LiveOptions::default(), &mut slot, &mut rec).await;
        assert!(!started);
        assert_eq!(rec.errors(), vec![FAILED_TO_START]);
        assert_eq!(rec.items().len(), 1);
        assert!(!slot.is_active());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);

        assert_eq!(drain(&mut slot, &mut rec), 0);
        assert!(matches!(slot.send_audio(b"abc").await, Err(Error::NotConnected)));
        assert_eq!(rec.items().len(), 1);
    }

    #[tokio::test]
    async fn test_transcripts_rendered_in_order_and_empty_suppressed() {
        let (session, _, _) = mock_session(vec![
            LiveEvent::Open(OpenEvent::default()),
            transcript("hello"),
            transcript(""),
            transcript("hello"),
            LiveEvent::Metadata(serde_json::json!({"duration": 1.0})),
            transcript("world"),
            LiveEvent::Transcript(LiveResult::default()),
        ]);
        let connector = ScriptedConnector {
            sessions: Mutex::new(vec![session]),
        };
        let mut slot = SessionSlot::new();
        let mut rec = Recorder::new();

        assert!(initialize_connection(&connector, &LiveOptions::default(), &mut slot, &mut rec).await);
        assert_eq!(drain(&mut slot, &mut rec), 7);

        let texts = rec.texts();
        assert!(texts[0].starts_with("\n\n") && texts[0].ends_with("\n\n"));
        assert!(texts[0].contains("Open"));
        assert_eq!(&texts[1..], &["hello", "hello", "world"]);
        assert!(slot.is_active());
    }

    #[tokio::test]
    async fn test_close_and_error_events_surrounded_by_blank_lines() {
        let error = LiveEvent::Error(ErrorEvent {
            description: "socket reset".to_string(),
            message: String::new(),
            variant: "WebSocket".to_string(),
        });
        let (session, _, _) = mock_session(vec![error.clone(), close_event(), transcript("late")]);
        let mut slot = SessionSlot::new();
        slot.replace(Box::new(session)).await;
        let mut rec = Recorder::new();

        drain(&mut slot, &mut rec);
        assert_eq!(
            rec.texts(),
            vec![
                format!("\n\n{}\n\n", error).as_str(),
                format!("\n\n{}\n\n", close_event()).as_str(),
            ]
        );
        assert!(!slot.is_active());
    }

    #[tokio::test]
    async fn test_replace_closes_previous_session() {
        let (first, first_closes, _) = mock_session(vec![]);
        let (second, second_closes, sent) = mock_session(vec![]);
        let connector = ScriptedConnector {
            sessions: Mutex::new(vec![first, second]),
        };
        let mut slot = SessionSlot::new();
        let mut rec = Recorder::new();

        initialize_connection(&connector, &LiveOptions::default(), &mut slot, &mut rec).await;
        initialize_connection(&connector, &LiveOptions::default(), &mut slot, &mut rec).await;
        assert_eq!(first_closes.load(Ordering::SeqCst), 1);
        assert_eq!(second_closes.load(Ordering::SeqCst), 0);

        slot.send_audio(b"pcm").await.unwrap();
        assert_eq!(sent.lock().unwrap().as_slice(), &[b"pcm".to_vec()]);

        slot.close().await.unwrap();
        assert_eq!(second_closes.load(Ordering::SeqCst), 1);
        assert!(!slot.is_active());
        slot.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_pump_runs_until_close() {
        let (session, _, _) = mock_session(vec![
            transcript("one"),
            transcript("two"),
            close_event(),
        ]);
        let mut slot = SessionSlot::new();
        slot.replace(Box::new(session)).await;
        let mut rec = Recorder::new();

        assert_eq!(pump(&mut slot, &mut rec).await, 3);
        assert_eq!(rec.texts()[..2], ["one", "two"]);
        assert!(!slot.is_active());
    }
}
