use serde::{Deserialize, Serialize};

use crate::account::ValidationError;

pub const MIN_KEYWORD_CHARS: usize = 2;
pub const RECENT_SEARCH_LIMIT: usize = 5;

/// Trimmed keyword, or an error when it is too short to search.
pub fn normalize_keyword(raw: &str) -> Result<String, ValidationError> {
    let keyword = raw.trim();
    if keyword.chars().count() < MIN_KEYWORD_CHARS {
        return Err(ValidationError::ShortKeyword);
    }
    Ok(keyword.to_string())
}

/// Most-recent-first keyword history without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearches(Vec<String>);

impl RecentSearches {
    pub fn new(mut keywords: Vec<String>) -> Self {
        keywords.truncate(RECENT_SEARCH_LIMIT);
        Self(keywords)
    }

    pub fn record(&mut self, keyword: &str) {
        self.0.retain(|k| k != keyword);
        self.0.insert(0, keyword.to_string());
        self.0.truncate(RECENT_SEARCH_LIMIT);
    }

    pub fn remove(&mut self, keyword: &str) {
        self.0.retain(|k| k != keyword);
    }

    pub fn keywords(&self) -> &[String] {
        &self.0
    }
}

/// Splits `text` into `(segment, is_match)` runs for every case-insensitive occurrence of
/// `keyword`. Matching runs on the lowercase form of each character, and a match must cover
/// whole source characters, so segment bounds always fall on char boundaries of `text`.
pub fn highlight_segments(text: &str, keyword: &str) -> Vec<(String, bool)> {
    let needle: Vec<char> = keyword.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return vec![(text.to_string(), false)];
    }

    let sources: Vec<(usize, char)> = text.char_indices().collect();
    // Each lowercase char paired with the index of the source char it came from.
    let folded: Vec<(char, usize)> = sources
        .iter()
        .enumerate()
        .flat_map(|(i, (_, c))| c.to_lowercase().map(move |l| (l, i)))
        .collect();
    let byte_start = |src: usize| sources[src].0;
    let byte_end = |src: usize| sources.get(src + 1).map_or(text.len(), |(b, _)| *b);
    let starts_source = |k: usize| k == 0 || folded[k - 1].1 != folded[k].1;
    let ends_source = |k: usize| k + 1 == folded.len() || folded[k + 1].1 != folded[k].1;

    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut i = 0;
    while i + needle.len() <= folded.len() {
        let last = i + needle.len() - 1;
        let hit = starts_source(i)
            && ends_source(last)
            && folded[i..=last].iter().map(|(c, _)| *c).eq(needle.iter().copied());
        if !hit {
            i += 1;
            continue;
        }
        let start = byte_start(folded[i].1);
        let end = byte_end(folded[last].1);
        if start > cursor {
            segments.push((text[cursor..start].to_string(), false));
        }
        segments.push((text[start..end].to_string(), true));
        cursor = end;
        i = last + 1;
    }
    if cursor < text.len() {
        segments.push((text[cursor..].to_string(), false));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keywords_are_rejected() {
        assert_eq!(normalize_keyword(" a "), Err(ValidationError::ShortKeyword));
        assert_eq!(normalize_keyword(" 경찰 "), Ok("경찰".to_string()));
    }

    #[test]
    fn recent_searches_dedupe_and_cap() {
        let mut recent = RecentSearches::default();
        for k in ["a1", "b2", "c3", "d4", "e5", "f6"] {
            recent.record(k);
        }
        assert_eq!(recent.keywords(), ["f6", "e5", "d4", "c3", "b2"]);
        recent.record("c3");
        assert_eq!(recent.keywords(), ["c3", "f6", "e5", "d4", "b2"]);
        recent.remove("f6");
        assert_eq!(recent.keywords().len(), 4);
    }

    #[test]
    fn stored_form_is_a_plain_array() {
        let recent: RecentSearches = serde_json::from_str(r#"["병원","경찰서"]"#).unwrap();
        assert_eq!(recent.keywords(), ["병원", "경찰서"]);
        assert_eq!(serde_json::to_string(&recent).unwrap(), r#"["병원","경찰서"]"#);
    }

    #[test]
    fn highlight_marks_every_match() {
        let segments = highlight_segments("중앙경찰서 경찰", "경찰");
        assert_eq!(
            segments,
            vec![
                ("중앙".to_string(), false),
                ("경찰".to_string(), true),
                ("서 ".to_string(), false),
                ("경찰".to_string(), true),
            ]
        );
        let mixed = highlight_segments("Seoul Hospital", "hosp");
        assert_eq!(mixed[1], ("Hosp".to_string(), true));
    }

    #[test]
    fn highlight_survives_length_changing_case_folds() {
        let segments = highlight_segments("\u{212A}\u{130}\u{130}", "i\u{307}");
        assert_eq!(
            segments,
            vec![
                ("\u{212A}".to_string(), false),
                ("\u{130}".to_string(), true),
                ("\u{130}".to_string(), true),
            ]
        );
        let kelvin = highlight_segments("\u{212A}m 거리", "km");
        assert_eq!(kelvin[0], ("\u{212A}m".to_string(), true));
        assert_eq!(highlight_segments("abc", ""), vec![("abc".to_string(), false)]);
    }
}
