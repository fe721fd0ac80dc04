use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::JackettConfig;

#[derive(Error, Debug)]
pub enum TorznabError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single release from the indexer's search feed.
#[derive(Debug, Clone)]
pub struct ReleaseCandidate {
    pub title: String,
    pub seeders: Option<u32>,
    pub magnet_url: Option<String>,
}

impl ReleaseCandidate {
    /// Seeder count with the indexer's "attribute missing" case folded to 0.
    pub fn seeder_count(&self) -> u32 {
        self.seeders.unwrap_or(0)
    }
}

pub struct TorznabClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TorznabClient {
    pub fn new(config: &JackettConfig) -> Self {
        Self::with_base_url(&config.url, &config.apikey)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Movie search by IMDB id, restricted to the HD movie category.
    pub async fn search_movie(
        &self,
        imdb_id: &str,
    ) -> Result<Vec<ReleaseCandidate>, TorznabError> {
        let url = format!(
            "{}?apikey={}&t=movie&cat=2040&imdbid={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(imdb_id)
        );
        self.fetch(&url).await
    }

    /// TV search by show title.
    pub async fn search_tv(&self, title: &str) -> Result<Vec<ReleaseCandidate>, TorznabError> {
        let url = format!(
            "{}?apikey={}&t=tvsearch&q={}",
            self.base_url,
            self.api_key,
            urlencoding::encode(title)
        );
        self.fetch(&url).await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<ReleaseCandidate>, TorznabError> {
        debug!("querying torznab indexer");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TorznabError::InvalidResponse(format!(
                "status: {}",
                response.status()
            )));
        }

        let xml = response.text().await?;
        Ok(parse_feed(&xml))
    }
}

/// Parse a Torznab RSS feed into release candidates.
///
/// An empty channel is a valid "no releases found" response. Malformed XML
/// degrades to whatever items were parsed before the error; the pipeline
/// treats that the same as an empty result rather than failing hard.
fn parse_feed(xml: &str) -> Vec<ReleaseCandidate> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut results = Vec::new();
    let mut current_item: Option<ReleaseCandidate> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if name == "item" {
                    current_item = Some(ReleaseCandidate {
                        title: String::new(),
                        seeders: None,
                        magnet_url: None,
                    });
                } else if name == "torznab:attr" || name == "attr" {
                    // some indexers emit attrs as non-empty elements
                    apply_attr(&mut current_item, e);
                }

                current_element = name;
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if name == "torznab:attr" || name == "attr" {
                    apply_attr(&mut current_item, e);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(ref mut item) = current_item {
                    let text = e.xml_content().unwrap_or_default().to_string();

                    if current_element == "title" {
                        item.title = text;
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if name == "item" {
                    if let Some(item) = current_item.take() {
                        if !item.title.is_empty() {
                            results.push(item);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, parsed = results.len(), "malformed torznab feed, keeping parsed items");
                break;
            }
            _ => {}
        }
    }

    results
}

fn apply_attr(current_item: &mut Option<ReleaseCandidate>, e: &quick_xml::events::BytesStart) {
    let Some(item) = current_item else {
        return;
    };

    let mut attr_name = String::new();
    let mut attr_value = String::new();

    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let val = String::from_utf8_lossy(&attr.value).to_string();

        if key == "name" {
            attr_name = val;
        } else if key == "value" {
            attr_value = val;
        }
    }

    match attr_name.as_str() {
        "seeders" => item.seeders = attr_value.parse().ok(),
        "magneturl" => item.magnet_url = Some(attr_value),
        _ => {}
    }
}
