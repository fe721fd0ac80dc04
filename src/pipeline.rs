use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::debrid::{DebridClient, DebridError, StreamManifest, TransferInfo};
use crate::episodes;
use crate::release;
use crate::torznab::{TorznabClient, TorznabError};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no releases found")]
    NoReleases,
    #[error("no complete series release found")]
    NoCompleteSeries,
    #[error("selected release has no magnet link")]
    MissingMagnet,
    #[error("no video files found in transfer")]
    NoVideoFiles,
    #[error("special/bonus episodes are not supported")]
    SpecialsUnsupported,
    #[error("no file mapped to season {season} episode {episode}")]
    EpisodeNotMapped { season: u32, episode: u32 },
    #[error(transparent)]
    Torznab(#[from] TorznabError),
    #[error(transparent)]
    Debrid(#[from] DebridError),
}

/// A ready TV transfer. The file list and link array are kept around so
/// episode mapping can run later, once the user picks an episode.
#[derive(Debug, Clone)]
pub struct SeriesTransfer {
    pub transfer_id: String,
    pub info: TransferInfo,
}

/// Runs the resolution pipeline: indexer search, release selection, debrid
/// submission, and stream-id normalization. Every stage failure is terminal;
/// the only retry in the whole pipeline is the bounded id-candidate loop
/// inside [`DebridClient::resolve_stream`].
pub struct Resolver {
    torznab: TorznabClient,
    debrid: DebridClient,
}

impl Resolver {
    pub fn new(config: &Config) -> Self {
        Self {
            torznab: TorznabClient::new(&config.jackett),
            debrid: DebridClient::new(&config.debrid),
        }
    }

    pub fn with_clients(torznab: TorznabClient, debrid: DebridClient) -> Self {
        Self { torznab, debrid }
    }

    /// Movie path: ends with a playable manifest.
    pub async fn resolve_movie(&self, imdb_id: &str) -> Result<StreamManifest, ResolveError> {
        let candidates = self.torznab.search_movie(imdb_id).await?;
        if candidates.is_empty() {
            return Err(ResolveError::NoReleases);
        }

        let refs: Vec<_> = candidates.iter().collect();
        let top = release::top_seeder(&refs).ok_or(ResolveError::NoReleases)?;
        info!(title = %top.title, seeders = top.seeder_count(), "selected movie release");

        let magnet = top.magnet_url.as_deref().ok_or(ResolveError::MissingMagnet)?;
        let info = self.submit(magnet).await?;

        let link =
            episodes::movie_link(&info.files, &info.links).ok_or(ResolveError::NoVideoFiles)?;

        Ok(self.debrid.resolve_stream(link).await?)
    }

    /// TV path: ends with a ready transfer; episode mapping is deferred until
    /// an episode is chosen.
    pub async fn resolve_series(&self, title: &str) -> Result<SeriesTransfer, ResolveError> {
        let candidates = self.torznab.search_tv(title).await?;
        if candidates.is_empty() {
            return Err(ResolveError::NoReleases);
        }

        // complete-series packs only; no fallback to per-episode releases
        let packs = release::complete_series(&candidates);
        let top = release::top_seeder(&packs).ok_or(ResolveError::NoCompleteSeries)?;
        info!(title = %top.title, seeders = top.seeder_count(), "selected series release");

        let magnet = top.magnet_url.as_deref().ok_or(ResolveError::MissingMagnet)?;
        let transfer_id = self.debrid.add_magnet(magnet).await?;
        self.debrid.select_all_files(&transfer_id).await?;
        let info = self.debrid.wait_for_links(&transfer_id).await?;

        Ok(SeriesTransfer { transfer_id, info })
    }

    /// Map an episode of a ready transfer and resolve it to a manifest.
    pub async fn resolve_episode(
        &self,
        transfer: &SeriesTransfer,
        season: u32,
        episode: u32,
    ) -> Result<StreamManifest, ResolveError> {
        if season == 0 {
            return Err(ResolveError::SpecialsUnsupported);
        }

        let parsed = episodes::extract_episodes(&transfer.info.files, &transfer.info.links);
        debug!(mapped = parsed.len(), "episodes mapped from transfer");

        let link = episodes::episode_link(&parsed, season, episode)
            .ok_or(ResolveError::EpisodeNotMapped { season, episode })?;

        Ok(self.debrid.resolve_stream(link).await?)
    }

    async fn submit(&self, magnet: &str) -> Result<TransferInfo, ResolveError> {
        let transfer_id = self.debrid.add_magnet(magnet).await?;
        self.debrid.select_all_files(&transfer_id).await?;
        Ok(self.debrid.wait_for_links(&transfer_id).await?)
    }
}
