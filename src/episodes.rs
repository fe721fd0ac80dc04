use regex::Regex;
use tracing::debug;

use crate::debrid::FileEntry;

const VIDEO_EXTENSIONS: &[&str] = &[".mkv", ".mp4", ".avi", ".mov", ".webm"];

/// A season-pack file resolved to an episode identity and a playable link.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEpisode {
    pub path: String,
    /// 0 denotes a specials/bonus season
    pub season: u32,
    pub episode: u32,
    pub size: u64,
    pub url: String,
}

/// Map a transfer's file list to episodes.
///
/// The link array is aligned positionally with the file list: every file in
/// original order consumes exactly one index, whether or not it was selected
/// and whatever its extension. Only selected video files with a recognizable
/// episode pattern produce an entry; changing the advancement rule desyncs
/// the (season, episode) -> URL mapping silently, so it is deliberate.
///
/// Pattern preference: inline "S01E02" (long forms and 1x02 included), then
/// a season folder name combined with a loose "Episode 5" in the filename.
/// Files matching neither are dropped.
pub fn extract_episodes(files: &[FileEntry], links: &[String]) -> Vec<ParsedEpisode> {
    let episode_re = Regex::new(
        r"(?i)\b(?:s(?:eason)?[ ._-]?(\d{1,2}))[ ._-]?(?:e(?:pisode)?[ ._-]?(\d{1,2}))\b|\b(\d{1,2})x(\d{2})\b",
    )
    .unwrap();
    let season_folder_re = Regex::new(r"(?i)season[\s._-]?(\d{1,2})").unwrap();
    let loose_episode_re = Regex::new(r"\b[eE]p(?:isode)?[ ._-]?(\d{1,2})\b").unwrap();

    let mut episodes = Vec::new();
    let mut link_index = 0usize;

    for file in files {
        if file.selected != 1 {
            link_index += 1;
            continue;
        }

        let path = file.path.to_lowercase();
        let filename = path.rsplit('/').next().unwrap_or("");

        if !is_video(filename) {
            link_index += 1;
            continue;
        }

        let mut season: Option<u32> = None;
        let mut episode: Option<u32> = None;

        if let Some(caps) = episode_re.captures(filename) {
            if let (Some(s), Some(e)) = (caps.get(1), caps.get(2)) {
                season = s.as_str().parse().ok();
                episode = e.as_str().parse().ok();
            } else if let (Some(s), Some(e)) = (caps.get(3), caps.get(4)) {
                season = s.as_str().parse().ok();
                episode = e.as_str().parse().ok();
            }
        }

        if season.is_none() || episode.is_none() {
            let season_folder = path.split('/').find(|part| season_folder_re.is_match(part));
            if let Some(caps) = season_folder.and_then(|f| season_folder_re.captures(f)) {
                season = caps[1].parse().ok();
            }

            if let Some(caps) = loose_episode_re.captures(filename) {
                episode = caps[1].parse().ok();
            }
        }

        match (season, episode) {
            (Some(season), Some(episode)) if link_index < links.len() => {
                episodes.push(ParsedEpisode {
                    path: file.path.clone(),
                    season,
                    episode,
                    size: file.bytes,
                    url: links[link_index].clone(),
                });
            }
            _ => debug!(path = %file.path, "no episode pattern, dropping file"),
        }

        link_index += 1;
    }

    episodes
}

/// First matching episode's URL, or None when the episode is absent.
pub fn episode_link<'a>(
    episodes: &'a [ParsedEpisode],
    season: u32,
    episode: u32,
) -> Option<&'a str> {
    episodes
        .iter()
        .find(|ep| ep.season == season && ep.episode == episode)
        .map(|ep| ep.url.as_str())
}

/// Movie path: the link aligned with the largest selected video file.
pub fn movie_link<'a>(files: &[FileEntry], links: &'a [String]) -> Option<&'a str> {
    let mut best: Option<(u64, &str)> = None;
    let mut link_index = 0usize;

    for file in files {
        if file.selected == 1
            && is_video(&file.path.to_lowercase())
            && link_index < links.len()
            && best.is_none_or(|(bytes, _)| file.bytes > bytes)
        {
            best = Some((file.bytes, links[link_index].as_str()));
        }

        link_index += 1;
    }

    best.map(|(_, link)| link)
}

fn is_video(path: &str) -> bool {
    VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: i64, path: &str, bytes: u64, selected: u8) -> FileEntry {
        FileEntry {
            id,
            path: path.to_string(),
            bytes,
            selected,
        }
    }

    fn links(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_link_index_advances_past_unselected_and_non_video() {
        // the unselected file still consumes index 0, so the episode gets L1;
        // the non-video file consumes L2 without producing anything
        let files = vec![
            file(1, "/extras/sample.mkv", 100, 0),
            file(2, "/Show/S01E02.mkv", 900, 1),
            file(3, "/Show/notes.txt", 5, 1),
        ];
        let links = links(&["L0", "L1", "L2"]);

        let episodes = extract_episodes(&files, &links);

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].season, 1);
        assert_eq!(episodes[0].episode, 2);
        assert_eq!(episodes[0].url, "L1");
        assert_eq!(episode_link(&episodes, 1, 2), Some("L1"));
        assert!(episodes.iter().all(|ep| ep.url != "L2"));
    }

    #[test]
    fn test_inline_patterns() {
        let files = vec![
            file(1, "/Show/Show.S02E05.1080p.mkv", 1, 1),
            file(2, "/Show/Show.season.3.episode.7.mkv", 1, 1),
            file(3, "/Show/Show.4x09.mkv", 1, 1),
        ];
        let links = links(&["a", "b", "c"]);

        let episodes = extract_episodes(&files, &links);

        assert_eq!(episodes.len(), 3);
        assert_eq!((episodes[0].season, episodes[0].episode), (2, 5));
        assert_eq!((episodes[1].season, episodes[1].episode), (3, 7));
        assert_eq!((episodes[2].season, episodes[2].episode), (4, 9));
    }

    #[test]
    fn test_season_folder_fallback() {
        let files = vec![file(1, "/Show/Season 02/Episode 4.mkv", 1, 1)];
        let links = links(&["a"]);

        let episodes = extract_episodes(&files, &links);

        assert_eq!(episodes.len(), 1);
        assert_eq!((episodes[0].season, episodes[0].episode), (2, 4));
    }

    #[test]
    fn test_unparseable_files_dropped() {
        let files = vec![
            file(1, "/Show/behind-the-scenes.mkv", 1, 1),
            file(2, "/Show/S01E01.mkv", 1, 1),
        ];
        let links = links(&["a", "b"]);

        let episodes = extract_episodes(&files, &links);

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].url, "b");
    }

    #[test]
    fn test_link_index_out_of_range() {
        let files = vec![
            file(1, "/Show/S01E01.mkv", 1, 1),
            file(2, "/Show/S01E02.mkv", 1, 1),
        ];
        let links = links(&["only-one"]);

        let episodes = extract_episodes(&files, &links);

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].episode, 1);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(extract_episodes(&[], &[]).is_empty());

        let files = vec![file(1, "/Show/readme.txt", 1, 1)];
        assert!(extract_episodes(&files, &links(&["a"])).is_empty());
    }

    #[test]
    fn test_episode_link_missing() {
        let files = vec![file(1, "/Show/S01E01.mkv", 1, 1)];
        let episodes = extract_episodes(&files, &links(&["a"]));

        assert_eq!(episode_link(&episodes, 2, 1), None);
    }

    #[test]
    fn test_episode_link_first_match_wins() {
        let files = vec![
            file(1, "/720p/S01E01.mkv", 1, 1),
            file(2, "/1080p/S01E01.mkv", 2, 1),
        ];
        let episodes = extract_episodes(&files, &links(&["first", "second"]));

        assert_eq!(episode_link(&episodes, 1, 1), Some("first"));
    }

    #[test]
    fn test_movie_link_largest_selected_video() {
        let files = vec![
            file(1, "/Movie/sample.mkv", 50, 1),
            file(2, "/Movie/movie.mkv", 5000, 1),
            file(3, "/Movie/movie.nfo", 1, 1),
        ];
        let links = links(&["sample-link", "main-link", "nfo-link"]);

        assert_eq!(movie_link(&files, &links), Some("main-link"));
    }

    #[test]
    fn test_movie_link_skips_unselected() {
        let files = vec![
            file(1, "/Movie/ignored.mkv", 9000, 0),
            file(2, "/Movie/movie.mp4", 100, 1),
        ];
        let links = links(&["L0", "L1"]);

        assert_eq!(movie_link(&files, &links), Some("L1"));
    }

    #[test]
    fn test_movie_link_none_when_no_videos() {
        let files = vec![file(1, "/Movie/readme.txt", 1, 1)];

        assert_eq!(movie_link(&files, &links(&["a"])), None);
    }
}
