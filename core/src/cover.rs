/*
    spotbot | Web form that turns a mood prompt into a curated Spotify playlist.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::config::Settings;
use crate::prompt::GenerationRequest;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use thiserror::Error;

pub const COVER_SIZE: &str = "256x256";
const SIZE_HINT: &str = ". Please make this image less than 200kb file size";

#[derive(Error, Debug)]
pub enum CoverError {
    #[error("Image request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Image API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Image API returned no image")]
    Empty,
    #[error("Generated image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Could not convert cover image: {0}")]
    Image(#[from] image::ImageError),
}

/// Re-encodes any supported image as a base64 JPEG, the only format Spotify
/// accepts for playlist covers.
pub fn to_upload_jpeg(bytes: &[u8]) -> Result<String, CoverError> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut jpeg = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
    debug!("Cover re-encoded: {} -> {} bytes", bytes.len(), jpeg.len());

    Ok(BASE64.encode(jpeg))
}

/// Where the playlist cover comes from. An upload always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSource<'a> {
    /// Already converted while the form was validated.
    Uploaded(&'a str),
    Generated(&'a str),
    Skip,
}

impl<'a> CoverSource<'a> {
    pub fn select(request: &'a GenerationRequest) -> Self {
        match (&request.upload_jpeg, &request.image_prompt) {
            (Some(jpeg), _) => CoverSource::Uploaded(jpeg),
            (None, Some(prompt)) => CoverSource::Generated(prompt),
            (None, None) => CoverSource::Skip,
        }
    }
}

/// Produces an upload-ready cover, or `None` when the user asked for none.
pub async fn prepare(
    source: CoverSource<'_>,
    generator: &dyn ImageGenerator,
) -> Result<Option<String>, CoverError> {
    match source {
        CoverSource::Uploaded(jpeg) => Ok(Some(jpeg.to_string())),
        CoverSource::Generated(prompt) => {
            let bytes = generator.generate(prompt).await?;
            to_upload_jpeg(&bytes).map(Some)
        }
        CoverSource::Skip => Ok(None),
    }
}

/// Generates cover art from a text description.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, CoverError>;
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

/// Image generation client for OpenAI-compatible endpoints.
pub struct OpenAiImages {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiImages {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.openai_base_url.clone(),
            api_key: settings.openai_api_key.clone(),
            model: settings.image_model.clone(),
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, CoverError> {
        let body = json!({
            "model": self.model,
            "prompt": format!("{}{}", prompt, SIZE_HINT),
            "n": 1,
            "size": COVER_SIZE,
        });

        info!("Generating cover art with {}", self.model);
        let response = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CoverError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let images: ImagesResponse = response.json().await?;
        let image = images.data.into_iter().next().ok_or(CoverError::Empty)?;

        match (image.url, image.b64_json) {
            (Some(url), _) => {
                debug!("Downloading generated cover from {}", url);
                let bytes = self
                    .http
                    .get(&url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                Ok(bytes.to_vec())
            }
            (None, Some(encoded)) => Ok(BASE64.decode(encoded)?),
            (None, None) => Err(CoverError::Empty),
        }
    }
}
