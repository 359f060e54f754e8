//! Presigned URL endpoints.
//!
//! Routing is by method and lowercase path suffix so the signer can sit behind
//! any base path:
//!
//! - `OPTIONS` anything: CORS preflight
//! - `.../sign-put?key=<input key>[&voice=<id>]`: upload URL for a document
//! - `.../sign-get?key=<output key>`: download URL for synthesized audio
//! - anything else: 404
//!
//! Every response is JSON and carries the CORS headers, echoing the request
//! `Origin` (or `*`).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::core::extract::content_type_for_extension;
use crate::core::storage::{KeyError, ObjectKeys, PresignError, UrlPresigner};
use crate::core::tts::PollyVoice;
use crate::state::AppState;

const ALLOW_HEADERS: &str = "*";
const ALLOW_METHODS: &str = "GET,OPTIONS";

#[derive(Debug, Error)]
pub enum SignError {
    #[error("missing ?key={0}")]
    MissingKey(String),

    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error("voice must be 1-32 ASCII letters or digits")]
    InvalidVoice,

    #[error(transparent)]
    Presign(#[from] PresignError),
}

impl SignError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingKey(_) | Self::InvalidKey(_) | Self::InvalidVoice => {
                StatusCode::BAD_REQUEST
            }
            Self::Presign(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignPutResponse {
    pub put_url: String,
    /// Must be sent as the `content-type` of the upload
    pub content_type: &'static str,
    /// Must be sent as `x-amz-meta-voice` on the upload
    pub voice: String,
    pub expected_output: String,
    pub expected_output_uri: String,
    pub get_url_example: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignGetResponse {
    pub get_url: String,
    pub expires_in: u64,
}

/// Validates requested keys and issues presigned URLs for them.
pub struct UrlSigner {
    presigner: Arc<dyn UrlPresigner>,
    keys: ObjectKeys,
    bucket: String,
    default_voice: String,
    expires_in: Duration,
}

impl UrlSigner {
    pub fn new(
        presigner: Arc<dyn UrlPresigner>,
        keys: ObjectKeys,
        bucket: impl Into<String>,
        default_voice: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        Self {
            presigner,
            keys,
            bucket: bucket.into(),
            default_voice: default_voice.into(),
            expires_in,
        }
    }

    /// Upload URL for a document, plus where its audio will appear.
    pub async fn sign_put(
        &self,
        raw_key: Option<&str>,
        voice: Option<&str>,
    ) -> Result<SignPutResponse, SignError> {
        let key = require_key(raw_key, || format!("{}<file>", self.keys.input_prefix()))?;
        let format = self.keys.validate_input_key(&key)?;

        let voice = match voice.map(str::trim).filter(|v| !v.is_empty()) {
            Some(voice) if PollyVoice::is_valid_id(voice) => voice.to_string(),
            Some(_) => return Err(SignError::InvalidVoice),
            None => self.default_voice.clone(),
        };

        let content_type = content_type_for_extension(format.extension());

        let put_url = self
            .presigner
            .presign_put(&key, content_type, &voice, self.expires_in)
            .await?;

        let expected_output = self.keys.output_key_for(&key);
        let get_url_example = self
            .presigner
            .presign_get(&expected_output, self.expires_in)
            .await?;

        info!(key = %key, expected_output = %expected_output, voice = %voice, "Signed upload URL");

        Ok(SignPutResponse {
            put_url,
            content_type,
            voice,
            expected_output_uri: format!("s3://{}/{}", self.bucket, expected_output),
            expected_output,
            get_url_example,
            expires_in: self.expires_in.as_secs(),
        })
    }

    /// Download URL for synthesized audio.
    pub async fn sign_get(&self, raw_key: Option<&str>) -> Result<SignGetResponse, SignError> {
        let key = require_key(raw_key, || {
            format!(
                "{}<file>.{}",
                self.keys.output_prefix(),
                self.keys.audio_extension()
            )
        })?;
        self.keys.validate_output_key(&key)?;

        let get_url = self.presigner.presign_get(&key, self.expires_in).await?;

        info!(key = %key, "Signed download URL");

        Ok(SignGetResponse {
            get_url,
            expires_in: self.expires_in.as_secs(),
        })
    }
}

/// The key parameter, already decoded from the query string.
fn require_key(raw_key: Option<&str>, hint: impl FnOnce() -> String) -> Result<String, SignError> {
    match raw_key {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(SignError::MissingKey(hint())),
    }
}

/// First value of the query parameter `name`, form-decoded (`+` is a space).
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Fallback handler serving the signer routes.
pub async fn signer_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));
    let route = uri.path().to_lowercase();

    debug!(method = %method, route = %route, "Signer request");

    let (status, body) = if method == Method::OPTIONS {
        (StatusCode::OK, json!({"message": "CORS preflight"}))
    } else if route.ends_with("/sign-put") {
        let key = query_param(uri.query(), "key");
        let voice = query_param(uri.query(), "voice");
        respond(state.signer.sign_put(key.as_deref(), voice.as_deref()).await)
    } else if route.ends_with("/sign-get") {
        let key = query_param(uri.query(), "key");
        respond(state.signer.sign_get(key.as_deref()).await)
    } else {
        (StatusCode::NOT_FOUND, json!({"error": "route not found"}))
    };

    cors_json(status, body, origin)
}

fn respond<T: Serialize>(result: Result<T, SignError>) -> (StatusCode, Value) {
    match result {
        Ok(body) => match serde_json::to_value(body) {
            Ok(value) => (StatusCode::OK, value),
            Err(e) => {
                error!(error = %e, "Failed to serialize signer response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "internal error"}),
                )
            }
        },
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                error!(error = %e, "Failed to sign URL");
            } else {
                debug!(error = %e, "Rejected signer request");
            }
            (status, json!({"error": e.to_string()}))
        }
    }
}

fn cors_json(status: StatusCode, body: Value, origin: HeaderValue) -> Response {
    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    response
}
