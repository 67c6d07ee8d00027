//! # Text Helpers Module
//!
//! Small string routines shared by the extractors: cache-file naming, the
//! fuzzy name-containment test used for representative lookup, and the
//! cleanup rules for overview table cells.

/// Derive a cache filename from a source URL: drop the scheme, flatten the
/// path. Deterministic, so re-scraping the same URL overwrites its cache
/// file instead of growing a second copy.
pub fn cache_name(url: &str) -> String {
    let without_scheme = url.split("://").last().unwrap_or(url);
    without_scheme.replace('/', "_")
}

/// Recover the source URL from a cache filename produced by [`cache_name`]
pub fn url_from_cache_name(name: &str) -> String {
    format!("https://{}", name.replace('_', "/"))
}

/// Feed bodies sometimes carry a BOM or stray bytes ahead of the first `<`.
/// The cache keeps the body verbatim; parsing starts here.
pub fn strip_to_markup(raw: &str) -> &str {
    match raw.find('<') {
        Some(idx) => &raw[idx..],
        None => raw,
    }
}

/// Fuzzy name containment: lowercase both sides, keep `[a-z]` only, and
/// succeed iff the query is a subsequence of the candidate. "Evans" matches
/// "Dwight Evans" and survives nicknames and stray punctuation; it does not
/// match reversed-order letters. This exact test is load-bearing for the
/// representative name search and must not be swapped for substring or
/// edit-distance matching.
pub fn is_name_match(query: &str, candidate: &str) -> bool {
    let stripped = |s: &str| -> Vec<char> {
        s.chars()
            .flat_map(|c| c.to_lowercase())
            .filter(|c| c.is_ascii_lowercase())
            .collect()
    };

    let needle = stripped(query);
    let haystack = stripped(candidate);

    let mut pos = 0;
    for c in haystack {
        if pos == needle.len() {
            break;
        }
        if c == needle[pos] {
            pos += 1;
        }
    }
    pos == needle.len()
}

/// Collapse runs of whitespace (including non-breaking spaces) to single
/// spaces and trim
pub fn clean_cell(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleanup for the `Latest Action:` overview cell: the visible text is
/// followed by a non-breaking space and link debris like `(TXT | PDF)`.
pub fn clean_latest_action(text: &str) -> String {
    let head = text.trim();
    let head = head.split('\u{a0}').next().unwrap_or(head);
    let head = head.split("(TXT | PDF)").next().unwrap_or(head);
    clean_cell(head)
}

/// The `Committees:` overview cell concatenates chambers with `" | "`.
/// Pop segments from the end until one mentions `House`, split that segment
/// on `"House - "`, then split on `;` for individual committee names.
/// Only House committees are retained from this cell.
pub fn house_committees(cell: &str) -> Vec<String> {
    if !cell.contains("House") {
        return Vec::new();
    }

    let mut segments: Vec<&str> = cell.split(" | ").collect();
    let mut house = match segments.pop() {
        Some(seg) => seg,
        None => return Vec::new(),
    };
    while !house.contains("House") {
        house = match segments.pop() {
            Some(seg) => seg,
            None => return Vec::new(),
        };
    }

    house
        .split("House - ")
        .last()
        .unwrap_or(house)
        .split(';')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
