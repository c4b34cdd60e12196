//! Local web front end.
//!
//! API endpoints:
//! - GET /                  - Web UI
//! - POST /api/transcribe    - multipart form (file, url, features, model, version, tier)
//! - POST /api/live/start    - open a live session
//! - POST /api/live/audio    - raw audio chunk for the live session
//! - GET /api/live/events    - drain queued live events
//! - POST /api/live/close    - close the live session
//! - POST /api/synthesize    - multipart form (reference, text, language), answers the WAV
//! - GET /output.wav         - most recent synthesis output
//!
//! JSON endpoints answer with the list of rendered items.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Args;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, services::ServeFile};

use speechdesk_apps::{
    drain, initialize_connection, synthesize_speech, Model, Recorder, Rendered, SessionSlot, Surface,
    Tier, TranscriptionForm, UploadedFile,
};
use speechdesk_deepgram::{Client, LiveOptions};
use speechdesk_synth::{
    Language, ModelLoader, SynthesisRequest, Synthesizer, DEFAULT_OUTPUT_PATH, DOWNLOAD_FILE_NAME,
    DOWNLOAD_MIME_TYPE,
};

use super::{allowed_url_prefix, create_client, get_context, model_loader};
use crate::Cli;

/// Serve the web front end.
///
/// Transcription needs an API key; synthesis needs a reachable model server.
/// Either one can be used without the other.
#[derive(Args)]
pub struct ServeCommand {
    /// Listen address (e.g. :8501 or 127.0.0.1:8501)
    #[arg(long, default_value = "127.0.0.1:8501")]
    addr: String,
    /// Synthesis output file
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,
    /// Speech model server URL
    #[arg(long)]
    model_server: Option<String>,
    /// Pretrained speech model ID
    #[arg(long)]
    model_id: Option<String>,
    /// Maximum upload size in megabytes
    #[arg(long, default_value_t = 200)]
    max_upload_mb: usize,
}

struct ServerState {
    client: Option<Client>,
    allowed_url_prefix: String,
    live_options: LiveOptions,
    slot: Mutex<SessionSlot>,
    models: ModelLoader,
    output_path: PathBuf,
}

type SharedState = Arc<ServerState>;

impl ServeCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = match create_client(cli, ctx.as_ref()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "transcription disabled");
                None
            }
        };

        let state = Arc::new(ServerState {
            client,
            allowed_url_prefix: allowed_url_prefix(ctx.as_ref()),
            live_options: LiveOptions::default(),
            slot: Mutex::new(SessionSlot::new()),
            models: model_loader(
                ctx.as_ref(),
                self.model_server.as_deref(),
                self.model_id.as_deref(),
            ),
            output_path: self.output.clone(),
        });

        let app = router(state, self.max_upload_mb * 1024 * 1024);

        let addr = parse_addr(&self.addr)?;
        println!("Server started at http://{}", addr);
        println!("  - GET  /                 Web UI");
        println!("  - POST /api/transcribe    Prerecorded transcription");
        println!("  - POST /api/live/start    Start live transcription");
        println!("  - POST /api/synthesize    Generate speech");
        println!();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

fn router(state: SharedState, body_limit: usize) -> Router {
    let output = ServeFile::new(&state.output_path);
    Router::new()
        .route("/", get(index))
        .route("/api/transcribe", post(transcribe))
        .route("/api/live/start", post(live_start))
        .route("/api/live/audio", post(live_audio))
        .route("/api/live/events", get(live_events))
        .route("/api/live/close", post(live_close))
        .route("/api/synthesize", post(synthesize))
        .route_service("/output.wav", output)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Parse address string to SocketAddr.
fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    Ok(addr.parse()?)
}

/// Error answered as `{"error": ...}`.
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError(StatusCode::BAD_REQUEST, e.body_text())
    }
}

impl From<speechdesk_synth::Error> for ApiError {
    fn from(e: speechdesk_synth::Error) -> Self {
        use speechdesk_synth::Error as E;
        let status = match &e {
            E::MissingReference
            | E::UnsupportedLanguage(_)
            | E::UnsupportedAudio(_)
            | E::EmptyAudio
            | E::Wav(_)
            | E::Mp3(_) => StatusCode::BAD_REQUEST,
            E::Model { .. } | E::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

impl From<speechdesk_apps::Error> for ApiError {
    fn from(e: speechdesk_apps::Error) -> Self {
        match e {
            speechdesk_apps::Error::Synth(e) => e.into(),
            other => ApiError(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn transcribe(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Rendered>>, ApiError> {
    let mut form = TranscriptionForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mimetype = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if !data.is_empty() {
                    form.file = Some(UploadedFile::new(file_name, data).with_mimetype(mimetype));
                }
            }
            "url" => form.url = Some(field.text().await?).filter(|u| !u.is_empty()),
            "features" => form.features_json = field.text().await?,
            "model" => form.model = parse_field::<Model>(&field.text().await?)?,
            "version" => form.version = Some(field.text().await?),
            "tier" => form.tier = Some(parse_field::<Tier>(&field.text().await?)?),
            other => tracing::debug!(field = other, "ignoring form field"),
        }
    }

    let mut rec = Recorder::new();
    match &state.client {
        Some(client) => {
            speechdesk_apps::transcribe_file(
                &client.prerecorded(),
                &form,
                &state.allowed_url_prefix,
                &mut rec,
            )
            .await;
        }
        None => rec.error("Error: no API key configured"),
    }
    Ok(Json(rec.take()))
}

fn parse_field<T>(text: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text.parse::<T>()
        .map_err(|e| ApiError(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn live_start(State(state): State<SharedState>) -> Json<Vec<Rendered>> {
    let mut rec = Recorder::new();
    let Some(client) = &state.client else {
        rec.error("Error: no API key configured");
        return Json(rec.take());
    };

    let mut slot = state.slot.lock().await;
    if initialize_connection(&client.live(), &state.live_options, &mut slot, &mut rec).await {
        drain(&mut slot, &mut rec);
    }
    Json(rec.take())
}

async fn live_audio(State(state): State<SharedState>, body: Bytes) -> Json<Vec<Rendered>> {
    let mut rec = Recorder::new();
    let mut slot = state.slot.lock().await;
    if let Err(e) = slot.send_audio(&body).await {
        rec.error(&format!("Error: {}", e));
    }
    drain(&mut slot, &mut rec);
    Json(rec.take())
}

async fn live_events(State(state): State<SharedState>) -> Json<Vec<Rendered>> {
    let mut rec = Recorder::new();
    let mut slot = state.slot.lock().await;
    drain(&mut slot, &mut rec);
    Json(rec.take())
}

async fn live_close(State(state): State<SharedState>) -> Json<Vec<Rendered>> {
    let mut rec = Recorder::new();
    let mut slot = state.slot.lock().await;
    drain(&mut slot, &mut rec);
    if let Err(e) = slot.close().await {
        tracing::warn!(error = %e, "failed to close live session");
    }
    Json(rec.take())
}

async fn synthesize(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut request = SynthesisRequest {
        text: "Hello, world!".to_string(),
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "reference" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await?;
                if !data.is_empty() {
                    request.reference = Some(data);
                    request.reference_name = file_name;
                }
            }
            "text" => request.text = field.text().await?,
            "language" => request.language = parse_field::<Language>(&field.text().await?)?,
            other => tracing::debug!(field = other, "ignoring form field"),
        }
    }

    let model = state.models.get().await?;
    let synthesizer = Synthesizer::new(model).with_output_path(&state.output_path);
    let mut rec = Recorder::new();
    let output = synthesize_speech(&synthesizer, &request, &mut rec).await?;

    Ok((
        [
            (header::CONTENT_TYPE, DOWNLOAD_MIME_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        output.wav,
    )
        .into_response())
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>speechdesk</title>
    <style>
        body { font-family: -apple-system, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
        fieldset { margin-bottom: 1.5rem; }
        label { display: block; margin: 0.5rem 0 0.2rem; }
        textarea, input[type=text] { width: 100%; }
        pre { background: #f4f4f4; padding: 0.5rem; white-space: pre-wrap; }
        .error { color: #b00020; }
    </style>
</head>
<body>
    <h1>Audio Transcription</h1>
    <form id="transcribe">
        <fieldset>
            <label>Upload an audio file <input type="file" name="file" accept=".mp3,.wav,.m4a"></label>
            <label>Or provide a Cloudinary URL <input type="text" name="url"></label>
            <label>Features (JSON format) <textarea name="features" rows="3">{}</textarea></label>
            <label>Model
                <select name="model"><option>nova</option><option>whisper</option></select>
            </label>
            <label>Version (optional) <input type="text" name="version"></label>
            <label>Tier (whisper only)
                <select name="tier"><option>base</option><option>enhanced</option></select>
            </label>
            <button type="submit">Transcribe File</button>
        </fieldset>
    </form>
    <fieldset>
        <button id="live-start">Start Live Transcription</button>
        <button id="live-close">Stop</button>
    </fieldset>
    <div id="output"></div>

    <h1>Text-to-Speech</h1>
    <form id="synthesize">
        <fieldset>
            <label>Reference audio <input type="file" name="reference" accept=".wav,.mp3"></label>
            <label>Text to synthesize <textarea name="text" rows="3">Hello, world!</textarea></label>
            <label>Language
                <select name="language"><option>en-us</option><option>es-es</option><option>fr-fr</option></select>
            </label>
            <button type="submit">Generate Speech</button>
        </fieldset>
    </form>
    <div id="speech"></div>

    <script>
        const out = document.getElementById('output');
        let poll = null;

        function render(items) {
            for (const item of items) {
                const el = document.createElement(item.kind === 'json' ? 'pre' : 'p');
                if (item.kind === 'error') el.className = 'error';
                el.textContent = item.kind === 'json' ? JSON.stringify(item.value, null, 2) : item.text;
                out.appendChild(el);
            }
        }

        async function call(method, path, body) {
            const res = await fetch(path, { method, body });
            const data = await res.json();
            if (!res.ok) { render([{ kind: 'error', text: data.error }]); return []; }
            render(data);
            return data;
        }

        document.getElementById('transcribe').addEventListener('submit', (e) => {
            e.preventDefault();
            call('POST', '/api/transcribe', new FormData(e.target));
        });

        let recorder = null;
        let sending = Promise.resolve();

        function sendAudio(blob) {
            if (blob.size === 0) return;
            sending = sending.then(() => call('POST', '/api/live/audio', blob)).catch(() => {});
        }

        async function stopMicrophone() {
            if (!recorder) return;
            const stopped = new Promise((resolve) => { recorder.onstop = resolve; });
            recorder.stop();
            recorder.stream.getTracks().forEach((t) => t.stop());
            await stopped;
            recorder = null;
            await sending;
        }

        document.getElementById('live-start').addEventListener('click', async () => {
            await stopMicrophone();
            const items = await call('POST', '/api/live/start');
            if (items.some((item) => item.kind === 'error')) return;
            try {
                const stream = await navigator.mediaDevices.getUserMedia({ audio: true });
                recorder = new MediaRecorder(stream);
                recorder.ondataavailable = (e) => sendAudio(e.data);
                recorder.start(250);
            } catch (err) {
                render([{ kind: 'error', text: 'Error: ' + err.message }]);
            }
            if (!poll) poll = setInterval(() => call('GET', '/api/live/events'), 500);
        });

        document.getElementById('live-close').addEventListener('click', async () => {
            await stopMicrophone();
            clearInterval(poll); poll = null;
            await call('POST', '/api/live/close');
        });

        document.getElementById('synthesize').addEventListener('submit', async (e) => {
            e.preventDefault();
            const speech = document.getElementById('speech');
            speech.textContent = 'Generating speech...';
            const res = await fetch('/api/synthesize', { method: 'POST', body: new FormData(e.target) });
            if (!res.ok) {
                const data = await res.json();
                speech.innerHTML = '';
                const p = document.createElement('p');
                p.className = 'error';
                p.textContent = data.error;
                speech.appendChild(p);
                return;
            }
            const url = URL.createObjectURL(await res.blob());
            speech.innerHTML = '';
            const audio = document.createElement('audio');
            audio.controls = true;
            audio.src = url;
            const link = document.createElement('a');
            link.href = url;
            link.download = 'generated_speech.wav';
            link.textContent = 'Download Audio';
            speech.append(audio, document.createElement('br'), link);
        });
    </script>
</body>
</html>
"##;
