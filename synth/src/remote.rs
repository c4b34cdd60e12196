//! HTTP backend for a model server hosting the pretrained weights.
//!
//! # Endpoints
//!
//! - GET `/v1/models/{id}` - model info, loads the weights on first use
//! - POST `/v1/speaker_embedding` - `{model, sample_rate, samples}` -> `{embedding}`
//! - POST `/v1/conditioning` - `{model, cond}` -> `{conditioning}`
//! - POST `/v1/generate` - `{model, conditioning}` -> `{codes}`
//! - POST `/v1/decode` - `{model, codes}` -> `{samples}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::SpeechModel;
use crate::types::{Codes, CondDict, Conditioning, Language, SpeakerEmbedding, Waveform};

/// Model description returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    /// Native sample rate of the decoder.
    pub sampling_rate: u32,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// A [`SpeechModel`] served over HTTP.
pub struct RemoteModel {
    client: ReqwestClient,
    base_url: String,
    info: ModelInfo,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    sample_rate: u32,
    samples: &'a [f32],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: SpeakerEmbedding,
}

#[derive(Serialize)]
struct ConditioningRequest<'a> {
    model: &'a str,
    cond: &'a CondDict,
}

#[derive(Deserialize)]
struct ConditioningResponse {
    conditioning: Conditioning,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    conditioning: &'a Conditioning,
}

#[derive(Deserialize)]
struct GenerateResponse {
    codes: Codes,
}

#[derive(Serialize)]
struct DecodeRequest<'a> {
    model: &'a str,
    codes: &'a Codes,
}

#[derive(Deserialize)]
struct DecodeResponse {
    samples: Vec<f32>,
}

#[derive(Deserialize)]
struct ServerError {
    #[serde(default, alias = "detail")]
    error: String,
}

impl RemoteModel {
    /// Loads `model_id` on the server at `base_url` and returns a handle to it.
    pub async fn from_pretrained(base_url: &str, model_id: &str) -> Result<Self> {
        // Generation runs synchronously server-side and can take minutes.
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = client
            .get(format!("{}/v1/models/{}", base_url, model_id))
            .send()
            .await?;
        let info: ModelInfo = handle_response(response).await?;
        tracing::info!(model = %info.id, sampling_rate = info.sampling_rate, "model loaded");

        Ok(Self {
            client,
            base_url,
            info,
        })
    }

    /// Returns the server's model description.
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn post<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }
}

async fn handle_response<R: DeserializeOwned>(response: Response) -> Result<R> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ServerError>(&body)
            .map(|e| e.error)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());
        return Err(Error::Model {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&body).map_err(Error::from)
}

#[async_trait]
impl SpeechModel for RemoteModel {
    async fn make_speaker_embedding(&self, wav: &Waveform) -> Result<SpeakerEmbedding> {
        let resp: EmbeddingResponse = self
            .post(
                "/v1/speaker_embedding",
                &EmbeddingRequest {
                    model: &self.info.id,
                    sample_rate: wav.sample_rate,
                    samples: &wav.samples,
                },
            )
            .await?;
        Ok(resp.embedding)
    }

    async fn prepare_conditioning(&self, cond: &CondDict) -> Result<Conditioning> {
        let resp: ConditioningResponse = self
            .post(
                "/v1/conditioning",
                &ConditioningRequest {
                    model: &self.info.id,
                    cond,
                },
            )
            .await?;
        Ok(resp.conditioning)
    }

    async fn generate(&self, conditioning: &Conditioning) -> Result<Codes> {
        let resp: GenerateResponse = self
            .post(
                "/v1/generate",
                &GenerateRequest {
                    model: &self.info.id,
                    conditioning,
                },
            )
            .await?;
        Ok(resp.codes)
    }

    async fn decode(&self, codes: &Codes) -> Result<Vec<f32>> {
        let resp: DecodeResponse = self
            .post(
                "/v1/decode",
                &DecodeRequest {
                    model: &self.info.id,
                    codes,
                },
            )
            .await?;
        Ok(resp.samples)
    }

    fn sampling_rate(&self) -> u32 {
        self.info.sampling_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn model_info(Path(id): Path<String>) -> std::result::Result<Json<Value>, (StatusCode, Json<Value>)> {
        if id == "missing" {
            return Err((StatusCode::NOT_FOUND, Json(json!({"detail": "no such model"}))));
        }
        Ok(Json(json!({"id": id, "sampling_rate": 44100, "languages": ["en-us", "fr-fr"]})))
    }

    async fn embedding(Json(body): Json<Value>) -> Json<Value> {
        let n = body["samples"].as_array().map(|a| a.len()).unwrap_or(0);
        Json(json!({"embedding": [n as f32, body["sample_rate"].as_f64().unwrap_or(0.0)]}))
    }

    async fn conditioning(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({"conditioning": {"text": body["cond"]["text"], "lang": body["cond"]["language"]}}))
    }

    async fn generate(Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(body["conditioning"]["lang"], "fr-fr");
        Json(json!({"codes": [[1, 2, 3], [4, 5, 6]]}))
    }

    async fn decode(Json(body): Json<Value>) -> Json<Value> {
        let frames = body["codes"][0].as_array().map(|a| a.len()).unwrap_or(0);
        Json(json!({"samples": vec![0.1f32; frames]}))
    }

    async fn serve() -> String {
        let router = Router::new()
            .route("/v1/models/{*id}", get(model_info))
            .route("/v1/speaker_embedding", post(embedding))
            .route("/v1/conditioning", post(conditioning))
            .route("/v1/generate", post(generate))
            .route("/v1/decode", post(decode));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_remote_model_stages() {
        let base = serve().await;
        let model = RemoteModel::from_pretrained(&base, "Zyphra/Zonos-v0.1-transformer")
            .await
            .unwrap();
        assert_eq!(model.info().id, "Zyphra/Zonos-v0.1-transformer");
        assert_eq!(model.sampling_rate(), 44100);

        let speaker = model
            .make_speaker_embedding(&Waveform::new(vec![0.0; 8], 16000))
            .await
            .unwrap();
        assert_eq!(speaker, SpeakerEmbedding(vec![8.0, 16000.0]));

        let cond = CondDict::new("bonjour", speaker, Language::FrFr);
        let conditioning = model.prepare_conditioning(&cond).await.unwrap();
        let codes = model.generate(&conditioning).await.unwrap();
        assert_eq!(codes.frames(), 3);

        let samples = model.decode(&codes).await.unwrap();
        assert_eq!(samples.len(), 3);
    }

    #[tokio::test]
    async fn test_remote_model_load_error() {
        let base = serve().await;
        let err = RemoteModel::from_pretrained(&base, "missing").await.err().unwrap();
        match err {
            Error::Model { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such model");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
