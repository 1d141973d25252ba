//! Generation parameter normalization.
//!
//! Parameters arrive from the API (or from a pushed payload) in a loose
//! shape: the source image may be absent, a bare URL under `image`, a bare
//! URL under `sourceImage`, or an already-resolved descriptor.
//! [`normalize_params`] folds all of these into one canonical form where
//! `sourceImage`, when present, is always a [`SourceImage`] object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::RemixOfProps;
use crate::types::{MediaType, Params};

/// Params key holding the resolved source image.
pub const SOURCE_IMAGE_KEY: &str = "sourceImage";
/// Legacy params key holding a bare image URL.
pub const IMAGE_KEY: &str = "image";
/// Params key holding the derived process mode.
pub const PROCESS_KEY: &str = "process";
/// Params key naming the generation engine.
pub const ENGINE_KEY: &str = "engine";

pub const PROCESS_TXT2IMG: &str = "txt2img";
pub const PROCESS_IMG2IMG: &str = "img2img";
pub const PROCESS_TXT2VID: &str = "txt2vid";
pub const PROCESS_IMG2VID: &str = "img2vid";

// ---------------------------------------------------------------------------
// Source image resolution
// ---------------------------------------------------------------------------

/// A source image whose dimensions are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Failure to turn an image URL into a [`SourceImage`].
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Failed to download source image {url}: {message}")]
    Request { url: String, message: String },

    #[error("Source image {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode source image {url}: {message}")]
    Decode { url: String, message: String },
}

/// Resolves a bare image URL into a [`SourceImage`] descriptor.
#[async_trait]
pub trait SourceImageResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<SourceImage, ResolutionError>;
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Output of [`normalize_params`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedParams {
    pub params: Params,
}

/// Canonicalize generation parameters.
///
/// - No `sourceImage` (absent or `null`) but a string `image`: resolve it.
/// - `sourceImage` is a bare string: resolve it.
/// - Otherwise `sourceImage` passes through untouched.
///
/// The input is never mutated; the result is a shallow copy. Running the
/// function again on its own output is a no-op beyond that copy. Resolution
/// failures are returned to the caller as-is.
///
/// `remix_of` does not alter the result; it only tags the trace span.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(remix_of = ?remix_of.and_then(|r| r.id))
)]
pub async fn normalize_params(
    raw: &Params,
    remix_of: Option<&RemixOfProps>,
    resolver: &dyn SourceImageResolver,
) -> Result<NormalizedParams, ResolutionError> {
    let mut params = raw.clone();

    let pending_url = match raw.get(SOURCE_IMAGE_KEY) {
        source if is_unset(source) => match raw.get(IMAGE_KEY) {
            Some(Value::String(url)) if !url.is_empty() => Some(url),
            _ => None,
        },
        Some(Value::String(url)) => Some(url),
        _ => None,
    };

    if let Some(url) = pending_url {
        tracing::debug!(%url, "Resolving source image");
        let source_image = resolver.resolve(url).await?;
        let value = serde_json::to_value(&source_image).map_err(|e| ResolutionError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        params.insert(SOURCE_IMAGE_KEY.to_string(), value);
    }

    Ok(NormalizedParams { params })
}

/// Whether `params` carries a usable source image.
pub fn has_source_image(params: &Params) -> bool {
    !is_unset(params.get(SOURCE_IMAGE_KEY))
}

/// Missing, null, false, zero or the empty string.
fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Process mode for a payload pushed through `set_data`.
///
/// Video only gets a process when none is set yet; image always has its
/// process re-derived from the presence of a source image. Other media
/// types are left alone.
pub fn derive_process(media_type: MediaType, params: &Params) -> Option<&'static str> {
    let has_process = params
        .get(PROCESS_KEY)
        .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
    let with_image = has_source_image(params);
    match media_type {
        MediaType::Video if !has_process => Some(if with_image {
            PROCESS_IMG2VID
        } else {
            PROCESS_TXT2VID
        }),
        MediaType::Image => Some(if with_image {
            PROCESS_IMG2IMG
        } else {
            PROCESS_TXT2IMG
        }),
        _ => None,
    }
}

/// String value of `params.engine`, if any.
pub fn engine_of(params: &Params) -> Option<&str> {
    params
        .get(ENGINE_KEY)
        .and_then(Value::as_str)
        .filter(|engine| !engine.is_empty())
}
