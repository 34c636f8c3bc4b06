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

mod app;
mod page;

use anyhow::Context;
use app::AppState;
use clap::Parser;
use dotenvy::dotenv;
use log::info;
use spotbot_core::{authorize_url, AuthBridge, Settings, SpotifyAccounts, Spotbot};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "spotbot")]
#[command(about = "Serves the spotbot playlist generator page", long_about = None)]
struct Cli {
    /// Address the web page is served on
    #[arg(long, default_value = "127.0.0.1:8501")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        // No .env file, rely on the process environment.
    }
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("Invalid configuration")?;

    let state = Arc::new(AppState {
        authorize_url: authorize_url(&settings).context("Could not build the Spotify login link")?,
        bridge: AuthBridge::new(SpotifyAccounts::new(&settings)),
        spotbot: Spotbot::from_settings(&settings),
    });

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    info!(
        "spotbot listening on http://{} (Spotify redirects to {})",
        cli.bind, settings.base_url
    );

    axum::serve(listener, app::router(state)).await?;
    Ok(())
}
