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

use crate::page::{Entry, Page, PageParams};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    response::Html,
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use spotbot_core::prompt::DEFAULT_SONGS;
use spotbot_core::{
    AuthBridge, GenerationRequest, PlaylistForm, RequestError, Spotbot, SpotifyApi, TokenExchange,
};
use std::sync::Arc;

/// Cover uploads above this size are refused before reaching the handler.
pub const UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

pub struct AppState<X: TokenExchange> {
    pub bridge: AuthBridge<X>,
    pub spotbot: Spotbot,
    pub authorize_url: String,
}

impl<X: TokenExchange> AppState<X> {
    fn html(&self, page: &Page) -> Html<String> {
        Html(page.render(&self.authorize_url))
    }
}

pub fn router<X>(state: Arc<AppState<X>>) -> Router
where
    X: TokenExchange + 'static,
    X::Handle: SpotifyApi + 'static,
{
    Router::new()
        .route("/", get(index::<X>))
        .route("/create", post(create::<X>))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .with_state(state)
}

async fn index<X>(
    State(state): State<Arc<AppState<X>>>,
    Query(params): Query<PageParams>,
) -> Html<String>
where
    X: TokenExchange + 'static,
    X::Handle: SpotifyApi + 'static,
{
    let page = match params.entry() {
        Entry::Intro => Page::Intro,
        Entry::Login => {
            if let Some(reason) = &params.error {
                warn!("Spotify login was not completed: {}", reason);
            }
            Page::AwaitingLogin
        }
        Entry::Authorized(code) => match state.bridge.connect(&code).await {
            Ok(_) => Page::submission(code),
            Err(e) => {
                warn!("Could not open Spotify session: {}", e);
                Page::expired()
            }
        },
    };
    state.html(&page)
}

async fn read_form(mut multipart: Multipart) -> Result<(String, PlaylistForm), MultipartError> {
    let mut code = String::new();
    let mut form = PlaylistForm {
        song_count: DEFAULT_SONGS.to_string(),
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "code" => code = field.text().await?.trim().to_string(),
            "prompt" => form.prompt = field.text().await?,
            "song_count" => form.song_count = field.text().await?,
            "title" => form.title = field.text().await?,
            "description" => form.description = field.text().await?,
            "image_prompt" => form.image_prompt = field.text().await?,
            "image" => {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.upload = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    Ok((code, form))
}

async fn create<X>(
    State(state): State<Arc<AppState<X>>>,
    multipart: Multipart,
) -> Result<Html<String>, MultipartError>
where
    X: TokenExchange + 'static,
    X::Handle: SpotifyApi + 'static,
{
    let (code, form) = read_form(multipart).await?;
    if code.is_empty() {
        return Ok(state.html(&Page::AwaitingLogin));
    }

    let retained = PlaylistForm {
        upload: None,
        ..form.clone()
    };
    let request = match GenerationRequest::try_from(form) {
        Ok(request) => request,
        Err(e) => {
            if e != RequestError::EmptyPrompt {
                warn!("Rejected form submission: {}", e);
            }
            return Ok(state.html(&Page::AwaitingSubmission {
                code,
                form: retained,
                warning: Some(e.to_string()),
            }));
        }
    };

    let spotify = match state.bridge.connect(&code).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Could not open Spotify session: {}", e);
            return Ok(state.html(&Page::expired()));
        }
    };

    info!(
        "Generating a {}-song playlist for '{}'",
        request.song_count, request.prompt
    );
    let page = match state.spotbot.run(&*spotify, &request).await {
        Ok(playlist) => Page::Done { code, playlist },
        Err(e) => {
            error!("Playlist generation failed: {}", e);
            if e.needs_relogin() {
                Page::expired()
            } else {
                Page::Failed {
                    message: e.to_string(),
                    relogin: false,
                }
            }
        }
    };
    Ok(state.html(&page))
}
