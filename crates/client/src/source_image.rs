//! HTTP-backed [`SourceImageResolver`].

use std::io::Cursor;

use async_trait::async_trait;
use genpanel_core::{ResolutionError, SourceImage, SourceImageResolver};

/// Downloads an image and reads its dimensions from the encoded header.
///
/// Root-relative URLs (`/images/1.png`) are resolved against `base_url`
/// when one is configured.
pub struct HttpSourceImageResolver {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpSourceImageResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn absolute_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => format!("{base}{url}"),
            _ => url.to_string(),
        }
    }
}

#[async_trait]
impl SourceImageResolver for HttpSourceImageResolver {
    async fn resolve(&self, url: &str) -> Result<SourceImage, ResolutionError> {
        let target = self.absolute_url(url);
        let request_error = |e: reqwest::Error| ResolutionError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&target)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        let (width, height) = image_dimensions(&bytes).map_err(|message| {
            ResolutionError::Decode {
                url: url.to_string(),
                message,
            }
        })?;

        tracing::debug!(%url, width, height, "Resolved source image");

        Ok(SourceImage {
            url: url.to_string(),
            width,
            height,
        })
    }
}

/// Read `(width, height)` from encoded image bytes without decoding pixels.
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), String> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        image::RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn reads_png_dimensions() {
        assert_eq!(image_dimensions(&png(3, 5)).unwrap(), (3, 5));
    }

    #[test]
    fn rejects_non_image_bytes() {
        assert!(image_dimensions(b"<html>not an image</html>").is_err());
    }

    #[test]
    fn relative_urls_use_base() {
        let resolver =
            HttpSourceImageResolver::new(reqwest::Client::new()).with_base_url("http://cdn.local/");
        assert_eq!(
            resolver.absolute_url("/images/1.png"),
            "http://cdn.local/images/1.png"
        );
        assert_eq!(
            resolver.absolute_url("https://elsewhere/2.png"),
            "https://elsewhere/2.png"
        );
    }
}
