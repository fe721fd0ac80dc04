use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DebridConfig;

const DEFAULT_BASE_URL: &str = "https://api.real-debrid.com/rest/1.0";

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum DebridError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("transfer {0} never produced any links")]
    TransferNotReady(String),
    #[error("no candidate of stream id {0} yielded a manifest")]
    StreamUnavailable(String),
}

/// One file inside a debrid transfer, as reported by the transfer-info call.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub id: i64,
    /// "/"-delimited path within the torrent
    pub path: String,
    pub bytes: u64,
    /// 1 when the file was included in the transfer, 0 otherwise
    #[serde(default)]
    pub selected: u8,
}

/// File list plus the link array, positionally aligned with the file list.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferInfo {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub links: Vec<String>,
}

/// A resolved, playable stream: DASH manifest base URL plus total duration.
///
/// The manifest URL takes a `t=<seconds>` query parameter selecting the
/// server-side transcode start offset; see the playback controller.
#[derive(Debug, Clone)]
pub struct StreamManifest {
    pub dash_url: String,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct AddMagnetResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UnrestrictResponse {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DashVariants {
    full: String,
}

#[derive(Debug, Deserialize)]
struct TranscodeResponse {
    #[serde(default)]
    dash: Option<DashVariants>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoResponse {
    duration: f64,
}

pub struct DebridClient {
    client: Client,
    base_url: String,
    token: String,
    poll_interval: Duration,
    poll_deadline: Duration,
}

impl DebridClient {
    pub fn new(config: &DebridConfig) -> Self {
        Self::with_base_url(
            config.url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            &config.token,
        )
    }

    pub fn with_base_url(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            poll_interval: POLL_INTERVAL,
            poll_deadline: POLL_DEADLINE,
        }
    }

    /// Tighten the transfer polling schedule (used by tests).
    pub fn with_polling(mut self, interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_deadline = deadline;
        self
    }

    /// Submit a magnet link, returning the transfer id.
    pub async fn add_magnet(&self, magnet: &str) -> Result<String, DebridError> {
        let url = format!("{}/torrents/addMagnet", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(&[("magnet", magnet)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DebridError::InvalidResponse(format!(
                "addMagnet status: {}",
                response.status()
            )));
        }

        let body: AddMagnetResponse = response.json().await?;
        debug!(transfer_id = %body.id, "magnet submitted");
        Ok(body.id)
    }

    /// Include every file of the transfer (select-all policy).
    pub async fn select_all_files(&self, transfer_id: &str) -> Result<(), DebridError> {
        let url = format!("{}/torrents/selectFiles/{}", self.base_url, transfer_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(&[("files", "all")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DebridError::InvalidResponse(format!(
                "selectFiles status: {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Fetch the transfer's file list and link array.
    pub async fn transfer_info(&self, transfer_id: &str) -> Result<TransferInfo, DebridError> {
        let url = format!("{}/torrents/info/{}", self.base_url, transfer_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DebridError::InvalidResponse(format!(
                "transfer info status: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Poll transfer info until the link array is non-empty.
    ///
    /// A transfer that never reaches a ready state within the deadline is a
    /// hard failure the caller must surface.
    pub async fn wait_for_links(&self, transfer_id: &str) -> Result<TransferInfo, DebridError> {
        let start = tokio::time::Instant::now();

        loop {
            let info = self.transfer_info(transfer_id).await?;

            if !info.links.is_empty() {
                info!(
                    transfer_id,
                    files = info.files.len(),
                    links = info.links.len(),
                    "transfer ready"
                );
                return Ok(info);
            }

            if start.elapsed() >= self.poll_deadline {
                return Err(DebridError::TransferNotReady(transfer_id.to_string()));
            }

            debug!(
                transfer_id,
                elapsed_secs = start.elapsed().as_secs(),
                "transfer not ready, polling again"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Unrestrict a hosted link, returning the opaque stream id used by the
    /// streaming endpoints.
    pub async fn unrestrict(&self, link: &str) -> Result<String, DebridError> {
        let url = format!("{}/unrestrict/link", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(&[("link", link)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DebridError::InvalidResponse(format!(
                "unrestrict status: {}",
                response.status()
            )));
        }

        let body: UnrestrictResponse = response.json().await?;
        Ok(body.id)
    }

    /// Ask for the transcode manifest of a stream id.
    ///
    /// `None` means the id was not accepted (no dash entry in the response);
    /// the caller tries the next id candidate.
    async fn transcode(&self, stream_id: &str) -> Result<Option<String>, DebridError> {
        let url = format!("{}/streaming/transcode/{}", self.base_url, stream_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(stream_id, status = %response.status(), "transcode rejected id");
            return Ok(None);
        }

        match response.json::<TranscodeResponse>().await {
            Ok(body) => Ok(body.dash.map(|d| d.full)),
            Err(e) => {
                warn!(stream_id, error = %e, "unparseable transcode response");
                Ok(None)
            }
        }
    }

    /// Total duration in seconds for a stream id the transcode endpoint accepted.
    async fn media_info(&self, stream_id: &str) -> Result<f64, DebridError> {
        let url = format!("{}/streaming/mediaInfos/{}", self.base_url, stream_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DebridError::InvalidResponse(format!(
                "mediaInfos status: {}",
                response.status()
            )));
        }

        let body: MediaInfoResponse = response.json().await?;
        Ok(body.duration)
    }

    /// Unrestrict a link and normalize its stream id into a playable manifest.
    ///
    /// The upstream service sometimes only accepts the unrestrict id with its
    /// last one or two characters trimmed; the trigger is undocumented, so the
    /// candidates are tried in a fixed order and the first id whose transcode
    /// response carries a manifest wins. Duration is fetched with that same
    /// candidate. At most three attempts, no delay: the failure mode is
    /// deterministic per id, not transient.
    pub async fn resolve_stream(&self, link: &str) -> Result<StreamManifest, DebridError> {
        let stream_id = self.unrestrict(link).await?;

        for candidate in id_candidates(&stream_id) {
            if let Some(dash_url) = self.transcode(&candidate).await? {
                let duration = self.media_info(&candidate).await?;
                info!(stream_id = %candidate, duration, "stream resolved");
                return Ok(StreamManifest { dash_url, duration });
            }

            debug!(candidate = %candidate, "no manifest for id candidate");
        }

        Err(DebridError::StreamUnavailable(stream_id))
    }
}

/// The unrestrict id, then the id with its last 1 and 2 characters trimmed.
fn id_candidates(id: &str) -> Vec<String> {
    let mut candidates = vec![id.to_string()];
    let mut chars: Vec<char> = id.chars().collect();

    for _ in 0..2 {
        if chars.len() <= 1 {
            break;
        }
        chars.pop();
        candidates.push(chars.iter().collect());
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_candidates_order() {
        assert_eq!(id_candidates("ABC123"), vec!["ABC123", "ABC12", "ABC1"]);
    }

    #[test]
    fn test_id_candidates_short_ids() {
        assert_eq!(id_candidates("AB"), vec!["AB", "A"]);
        assert_eq!(id_candidates("A"), vec!["A"]);
    }

    #[test]
    fn test_transfer_info_deserializes_without_links() {
        let info: TransferInfo = serde_json::from_str(
            r#"{"files": [{"id": 1, "path": "/a.mkv", "bytes": 10, "selected": 1}]}"#,
        )
        .unwrap();

        assert_eq!(info.files.len(), 1);
        assert!(info.links.is_empty());
    }

    #[test]
    fn test_transcode_response_without_dash() {
        let body: TranscodeResponse =
            serde_json::from_str(r#"{"error": "unknown_resource"}"#).unwrap();

        assert!(body.dash.is_none());
    }
}
