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

use serde::Deserialize;
use spotbot_core::prompt::{
    DEFAULT_SONGS, MAX_DESCRIPTION_CHARS, MAX_IMAGE_PROMPT_CHARS, MAX_PROMPT_CHARS, MAX_SONGS,
    MAX_TITLE_CHARS, MIN_SONGS,
};
use spotbot_core::{CreatedPlaylist, PlaylistForm};

pub const EXPIRED_MESSAGE: &str = "your spotify connection has expired, please log in again...";

/// Query parameters the page state is re-derived from on every load.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub code: Option<String>,
    /// Set by Spotify when the user declines access.
    pub error: Option<String>,
}

/// Where a plain page load lands.
#[derive(Debug, PartialEq, Eq)]
pub enum Entry {
    Intro,
    Login,
    Authorized(String),
}

impl PageParams {
    pub fn entry(&self) -> Entry {
        match self.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Entry::Authorized(code.to_string()),
            _ if self.page.as_deref() == Some("app") || self.error.is_some() => Entry::Login,
            _ => Entry::Intro,
        }
    }
}

/// Everything the page can show. One value per response, nothing kept between requests.
#[derive(Debug)]
pub enum Page {
    Intro,
    AwaitingLogin,
    AwaitingSubmission {
        code: String,
        form: PlaylistForm,
        warning: Option<String>,
    },
    Done {
        code: String,
        playlist: CreatedPlaylist,
    },
    Failed {
        message: String,
        relogin: bool,
    },
}

impl Page {
    pub fn submission(code: String) -> Self {
        Page::AwaitingSubmission {
            code,
            form: PlaylistForm {
                song_count: DEFAULT_SONGS.to_string(),
                ..Default::default()
            },
            warning: None,
        }
    }

    pub fn expired() -> Self {
        Page::Failed {
            message: EXPIRED_MESSAGE.to_string(),
            relogin: true,
        }
    }

    pub fn render(&self, authorize_url: &str) -> String {
        let body = match self {
            Page::Intro => render_intro(),
            Page::AwaitingLogin => render_login(authorize_url),
            Page::AwaitingSubmission {
                code,
                form,
                warning,
            } => render_form(code, form, warning.as_deref()),
            Page::Done { code, playlist } => render_done(code, playlist),
            Page::Failed { message, relogin } => render_failed(message, *relogin, authorize_url),
        };
        layout(&body)
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>spotbot</title>
  <link rel="icon" href="data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 100'><text y='.9em' font-size='90'>🎵</text></svg>">
  <style>
    body {{ max-width: 46rem; margin: 2rem auto; font-family: sans-serif; padding: 0 1rem; }}
    h1 span {{ color: #8a4fff; }}
    .big-font {{ font-size: 20px; }}
    .warning {{ background: #fff4d6; padding: .75rem; border-radius: .5rem; }}
    .button {{ color: #8a4fff; font-weight: bold; }}
    label {{ display: block; margin-top: 1rem; }}
    input[type=text] {{ width: 100%; }}
  </style>
</head>
<body>
  <h1><span>spotbot</span> - your custom spotify playlist generator &lt;3</h1>
  <hr>
{body}
</body>
</html>
"#
    )
}

fn render_intro() -> String {
    r#"  <p class="big-font">Welcome to spotbot! Spotbot is a custom playlist generator for Spotify built on OpenAI and the Spotify Web API.</p>
  <p class="big-font">Describe the playlist you are in the mood for. We look at your music taste (your top 10 tracks and artists),
  ask a language model for fresh songs that fit your description, and save them straight into a new playlist on your account.
  Spotbot can come up with a title, a description and even a generated cover image for you.</p>
  <p class="big-font">Note: playlists and covers are generated by OpenAI models. We cannot promise you will love every song, but give it a try!</p>
  <p class="big-font">We hope you find spotbot useful &lt;3</p>
  <p><a class="button" href="/?page=app">let's get started!</a></p>
"#
    .to_string()
}

fn render_login(authorize_url: &str) -> String {
    format!(
        r#"  <h3>First, please log in to your Spotify account</h3>
  <p><a class="button" href="{}">Login to Spotify</a></p>
  <p><small>(p.s. we only read your top tracks and artists, and create the playlists you ask for)</small></p>
"#,
        escape(authorize_url)
    )
}

fn render_form(code: &str, form: &PlaylistForm, warning: Option<&str>) -> String {
    let warning = warning
        .map(|w| format!("  <p class=\"warning\">{}</p>\n", escape(w)))
        .unwrap_or_default();
    let song_count = escape(form.song_count.trim());

    format!(
        r#"{warning}  <form method="post" action="/create" enctype="multipart/form-data">
    <input type="hidden" name="code" value="{code}">
    <label>what's the vibe? describe the music you'd like this playlist to contain:
      <input type="text" name="prompt" value="{prompt}" maxlength="{max_prompt}" placeholder="chill indie bedroom pop for late nights">
    </label>
    <label>how many songs in the playlist? ({min}-{max})
      <input type="number" name="song_count" value="{song_count}" min="{min}" max="{max}">
    </label>
    <hr>
    <p class="big-font">feel free to add any of the following playlist details. if you leave them blank, spotbot will generate each for you!</p>
    <label>add a playlist title...
      <input type="text" name="title" value="{title}" maxlength="{max_title}" placeholder="late indie bops">
    </label>
    <label>add a playlist description...
      <input type="text" name="description" value="{description}" maxlength="{max_description}" placeholder="songs that always set the mood for me time!">
    </label>
    <label>upload a playlist cover image (jpg/png only)...
      <input type="file" name="image" accept=".png,.jpg,.jpeg,image/png,image/jpeg">
    </label>
    <label>or alternatively, describe a cover for your playlist you'd like spotbot to generate!
      <input type="text" name="image_prompt" value="{image_prompt}" maxlength="{max_image_prompt}" placeholder="a cat listening to music inside a cozy room at night">
    </label>
    <p><button class="button" type="submit">create!</button></p>
  </form>
"#,
        code = escape(code),
        prompt = escape(&form.prompt),
        title = escape(&form.title),
        description = escape(&form.description),
        image_prompt = escape(&form.image_prompt),
        min = MIN_SONGS,
        max = MAX_SONGS,
        max_prompt = MAX_PROMPT_CHARS,
        max_title = MAX_TITLE_CHARS,
        max_description = MAX_DESCRIPTION_CHARS,
        max_image_prompt = MAX_IMAGE_PROMPT_CHARS,
    )
}

fn render_done(code: &str, playlist: &CreatedPlaylist) -> String {
    let unmatched = if playlist.unmatched.is_empty() {
        String::new()
    } else {
        let items: String = playlist
            .unmatched
            .iter()
            .map(|song| format!("    <li>{}</li>\n", escape(song)))
            .collect();
        format!(
            "  <p class=\"warning\">Spotify had no match for these suggestions, so they were left out:</p>\n  <ul>\n{}  </ul>\n",
            items
        )
    };

    format!(
        r#"  <h3>{name}</h3>
  <p>{count} songs added.</p>
  <p><a class="button" href="{url}" target="_blank">check out your curated playlist!</a></p>
{unmatched}  <p><a href="/?code={code}">make another one</a></p>
"#,
        name = escape(&playlist.name),
        count = playlist.tracks_added,
        url = escape(&playlist.url),
        unmatched = unmatched,
        code = escape(code),
    )
}

fn render_failed(message: &str, relogin: bool, authorize_url: &str) -> String {
    let link = if relogin {
        format!(
            "  <p><a class=\"button\" href=\"{}\">Re-login to Spotify</a></p>\n",
            escape(authorize_url)
        )
    } else {
        "  <p><a href=\"/?page=app\">start over</a></p>\n".to_string()
    };
    format!("  <p class=\"warning\">{}</p>\n{}", escape(message), link)
}
