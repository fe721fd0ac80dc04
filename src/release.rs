use regex::Regex;

use crate::torznab::ReleaseCandidate;

/// Filter a candidate list down to complete-series / season-pack releases.
///
/// Matches "complete", "all seasons", "season 1 - 5" style ranges and
/// "S01 S02" style ranges, with the usual dot/underscore/dash separators.
pub fn complete_series(candidates: &[ReleaseCandidate]) -> Vec<&ReleaseCandidate> {
    let pattern =
        Regex::new(r"(?i)complete|all[\s._-]?seasons|season\s*\d+\s*[-\u{2013}]\s*\d+|s\d{2}[\s._-]?s\d{2}")
            .unwrap();

    candidates
        .iter()
        .filter(|c| pattern.is_match(&c.title))
        .collect()
}

/// Pick the candidate with the most seeders.
///
/// Stable left fold: a later candidate only wins with strictly more seeders,
/// so ties keep the earliest-encountered release. A missing seeders
/// attribute counts as 0 and can never beat a candidate with at least 1.
pub fn top_seeder<'a>(candidates: &[&'a ReleaseCandidate]) -> Option<&'a ReleaseCandidate> {
    candidates.iter().copied().fold(None, |top, candidate| {
        match top {
            Some(best) if candidate.seeder_count() > best.seeder_count() => Some(candidate),
            Some(best) => Some(best),
            None => Some(candidate),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, seeders: Option<u32>) -> ReleaseCandidate {
        ReleaseCandidate {
            title: title.to_string(),
            seeders,
            magnet_url: Some("magnet:?xt=urn:btih:test".to_string()),
        }
    }

    #[test]
    fn test_complete_series_patterns() {
        let candidates = vec![
            candidate("Show.S01E01.1080p", Some(10)),
            candidate("Show COMPLETE Series 1080p", Some(5)),
            candidate("Show All.Seasons x265", Some(3)),
            candidate("Show Season 1 - 8 WEB-DL", Some(2)),
            candidate("Show S01.S08 Pack", Some(1)),
        ];

        let filtered = complete_series(&candidates);

        let titles: Vec<&str> = filtered.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Show COMPLETE Series 1080p",
                "Show All.Seasons x265",
                "Show Season 1 - 8 WEB-DL",
                "Show S01.S08 Pack",
            ]
        );
    }

    #[test]
    fn test_complete_series_en_dash_range() {
        let candidates = vec![candidate("Show Season 1 \u{2013} 5", Some(1))];

        assert_eq!(complete_series(&candidates).len(), 1);
    }

    #[test]
    fn test_complete_series_no_match() {
        let candidates = vec![candidate("Show.S02E03.720p", Some(40))];

        assert!(complete_series(&candidates).is_empty());
    }

    #[test]
    fn test_top_seeder_picks_max() {
        let a = candidate("a", Some(10));
        let b = candidate("b", Some(90));
        let c = candidate("c", Some(40));
        let refs = vec![&a, &b, &c];

        assert_eq!(top_seeder(&refs).unwrap().title, "b");
    }

    #[test]
    fn test_top_seeder_tie_keeps_earliest() {
        let a = candidate("first", Some(25));
        let b = candidate("second", Some(25));
        let refs = vec![&a, &b];

        assert_eq!(top_seeder(&refs).unwrap().title, "first");
    }

    #[test]
    fn test_top_seeder_missing_attribute_never_wins() {
        let a = candidate("seeded", Some(1));
        let b = candidate("unknown", None);
        let refs = vec![&a, &b];

        assert_eq!(top_seeder(&refs).unwrap().title, "seeded");

        // even when the unknown-seeders candidate comes first
        let refs = vec![&b, &a];
        assert_eq!(top_seeder(&refs).unwrap().title, "seeded");
    }

    #[test]
    fn test_top_seeder_empty() {
        assert!(top_seeder(&[]).is_none());
    }
}
