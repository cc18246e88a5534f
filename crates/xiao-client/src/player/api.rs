//! Player and music-list endpoints of the backend.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::debug;

use xiao_proto::protocol::{FileItem, PlayMode, PlaySnapshot, VolumeStatus};

#[derive(Clone)]
pub struct PlayerApi {
    client: Client,
    base: Url,
}

impl PlayerApi {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("Invalid base URL {}", base_url))?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid endpoint {}", path))
    }

    /// Send and fail on a non-2xx status, carrying the body text.
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to call {}", path))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", path, status, body.trim());
        }
        debug!("player: {} -> {}", path, status);
        Ok(response)
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let request = self.client.get(self.url(path)?);
        self.send(path, request).await
    }

    async fn get_with(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let request = self.client.get(self.url(path)?).query(query);
        self.send(path, request).await
    }

    pub async fn play(&self) -> Result<()> {
        self.get("/player/play").await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.get("/player/stop").await?;
        Ok(())
    }

    /// `+1` next, `-1` previous, within the server's queue.
    pub async fn skip(&self, value: i32) -> Result<()> {
        let value = value.to_string();
        self.get_with("/player/skip", &[("value", value.as_str())])
            .await?;
        Ok(())
    }

    pub async fn set_play_mode(&self, mode: &PlayMode) -> Result<()> {
        self.get_with("/player/playMode", &[("mode", mode.as_str())])
            .await?;
        Ok(())
    }

    /// `true` only if the speaker reports exactly the requested volume.
    pub async fn set_volume(&self, value: u8) -> Result<bool> {
        let requested = value.to_string();
        let status: VolumeStatus = self
            .get_with("/player/set_volume", &[("value", requested.as_str())])
            .await?
            .json()
            .await
            .context("Failed to parse volume response")?;
        Ok(status.volume == i64::from(value))
    }

    /// `-1` when the speaker could not be read.
    pub async fn get_volume(&self) -> Result<i64> {
        let status: VolumeStatus = self
            .get("/player/get_volume")
            .await?
            .json()
            .await
            .context("Failed to parse volume response")?;
        Ok(status.volume)
    }

    pub async fn send_play_state(&self, snapshot: &PlaySnapshot) -> Result<()> {
        let request = self.client.post(self.url("/player/src")?).json(snapshot);
        self.send("/player/src", request).await?;
        Ok(())
    }

    pub async fn save_favorite(&self, item: &FileItem) -> Result<()> {
        let request = self.client.post(self.url("/player/favorited")?).json(item);
        self.send("/player/favorited", request).await?;
        Ok(())
    }

    pub async fn last_state(&self) -> Result<PlaySnapshot> {
        self.get("/player/last")
            .await?
            .json()
            .await
            .context("Failed to parse player state")
    }

    /// Directory listing, or `history` / `favorite`. A `null` body is an
    /// empty listing.
    pub async fn list(&self, dir: &str, filter: Option<&str>) -> Result<Vec<FileItem>> {
        let files: Option<Vec<FileItem>> = self
            .get_with("/music/list", &[("dir", dir), ("filter", filter.unwrap_or(""))])
            .await?
            .json()
            .await
            .context("Failed to parse music list")?;
        Ok(files.unwrap_or_default())
    }
}
