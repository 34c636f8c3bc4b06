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
use crate::models::Recommendation;
use crate::prompt::ChatMessage;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

pub const PLAYLIST_FUNCTION: &str = "create_playlist";

/// Favors novelty over reproducibility.
const TEMPERATURE: f64 = 1.0;

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Language model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Language model API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Language model replied without calling create_playlist")]
    NoFunctionCall,
    #[error("Malformed create_playlist arguments: {0}")]
    Arguments(#[from] serde_json::Error),
}

/// Produces a structured playlist recommendation from a conversation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn recommend(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Recommendation, RecommendError>;
}

/// Function schema the model is asked to fill in.
pub fn playlist_function_schema() -> Value {
    json!({
        "name": PLAYLIST_FUNCTION,
        "description": "Creates a spotify playlist based on a list of songs that should be added to the list.",
        "parameters": {
            "type": "object",
            "properties": {
                "playlist_name": {
                    "type": "string",
                    "description": "Unique and creative name of playlist"
                },
                "playlist_description": {
                    "type": "string",
                    "description": "Unique and creative description for the playlist."
                },
                "songs": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "songname": {
                                "type": "string",
                                "description": "Name of the song that should be added to the playlist"
                            },
                            "artists": {
                                "type": "array",
                                "description": "List of all artists",
                                "items": {
                                    "type": "string",
                                    "description": "Name of artist of the song"
                                }
                            }
                        },
                        "required": ["songname", "artists"]
                    }
                }
            },
            "required": ["songs", "playlist_name", "playlist_description"]
        }
    })
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
    /// Older single-function replies.
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

impl ResponseMessage {
    fn playlist_arguments(&self) -> Option<&str> {
        self.tool_calls
            .iter()
            .map(|call| &call.function)
            .chain(self.function_call.as_ref())
            .find(|function| function.name == PLAYLIST_FUNCTION)
            .map(|function| function.arguments.as_str())
    }
}

/// Chat completions client for OpenAI-compatible endpoints.
pub struct OpenAiChat {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.openai_base_url.clone(),
            api_key: settings.openai_api_key.clone(),
            model: settings.chat_model.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn recommend(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Recommendation, RecommendError> {
        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": messages,
            "tools": [{ "type": "function", "function": playlist_function_schema() }],
        });

        debug!("Requesting recommendation from {}", self.model);
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
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
            return Err(RecommendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(RecommendError::NoFunctionCall)?;

        let Some(arguments) = message.playlist_arguments() else {
            if let Some(text) = &message.content {
                warn!("Model answered in free text: {}", text);
            }
            return Err(RecommendError::NoFunctionCall);
        };

        let recommendation: Recommendation = serde_json::from_str(arguments)?;
        debug!(
            "Model suggested '{}' with {} songs",
            recommendation.playlist_name,
            recommendation.songs.len()
        );
        Ok(recommendation)
    }
}
