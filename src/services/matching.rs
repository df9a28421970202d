/// Title matching and query building
///
/// Upstream providers are unreliable: they sometimes silently substitute
/// wrong content for a query. These pure functions build provider-safe
/// queries and score whether a response is actually about the requested
/// title. Heuristic misses return `None`/empty, never errors.
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::MediaType;

/// Minimum similarity score for a provider's first match to count as the
/// requested title
pub const MIN_MATCH_SCORE: f64 = 0.5;

/// Strips characters that are structurally significant in provider query
/// grammar (colon separates prefix from title, comma separates entries)
/// and collapses whitespace. Idempotent.
pub fn sanitize_title(title: &str) -> String {
    let stripped: String = title.chars().filter(|c| *c != ':' && *c != ',').collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Joins `prefix:sanitized-title` pairs with the provider's comma separator
pub fn build_query(titles: &[String], type_prefix: &str) -> String {
    titles
        .iter()
        .map(|title| format!("{}:{}", type_prefix, sanitize_title(title)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Ordered sequel-marker patterns; the first pattern that strips and leaves
/// at least two characters wins. Worded markers ("Part 2", ": Chapter 4")
/// come before the bare suffixes so the whole marker is removed, not just
/// its trailing number.
static SEQUEL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:\s*[:\-])?\s+[Pp]art\s+\w+$",
        r"(?:\s*[:\-])?\s+[Cc]hapter\s+\w+$",
        r"(?:\s*[:\-])?\s+[Ee]pisode\s+\w+$",
        r"(?:\s*[:\-])?\s+[Vv]ol\.\s+\w+$",
        r"(?:\s*[:\-])?\s+[Vv]olume\s+\w+$",
        r"\s+(?:II|III|IV|V|VI|VII|VIII|IX|X)$",
        r"\s+\d+$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("sequel pattern must compile"))
    .collect()
});

/// Attempts to strip a trailing sequel/part/chapter/volume marker, returning
/// the franchise base title.
///
/// Used only as a second-chance query when the primary query's response
/// fails validation; the result is a guess, not a guarantee ("Zootopia 2"
/// yields "Zootopia", but some base titles are unrelated films).
pub fn base_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    for pattern in SEQUEL_PATTERNS.iter() {
        if let Some(m) = pattern.find(trimmed) {
            let remainder = trimmed[..m.start()].trim_end();
            if remainder.chars().count() >= 2 {
                return Some(remainder.to_string());
            }
        }
    }
    None
}

/// Lowercases, strips non-alphanumerics, collapses whitespace
fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scores how likely `candidate` refers to the same title as `query`:
/// 1.0 for a normalized exact match, 0.8 when one contains the other, else
/// the Jaccard index of the whitespace-tokenized word sets.
pub fn score_similarity(query: &str, candidate: &str) -> f64 {
    let a = normalize(query);
    let b = normalize(candidate);

    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Validates a provider's first returned match against the requested title.
/// Secondary matches are allowed to be thematically related content, so only
/// the first one is held to this standard.
pub fn validate_first_match(
    query: &str,
    first_name: &str,
    first_type: MediaType,
    expected_type: MediaType,
) -> bool {
    first_type == expected_type && score_similarity(query, first_name) >= MIN_MATCH_SCORE
}

static QUOTED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]{2,80})""#).expect("quoted-title pattern must compile"));

/// Capitalized run following "like" or "similar to"; title casing is the
/// only signal separating "like Breaking Bad" from "like something dark"
static COMPARISON_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[Ll]ike|[Ss]imilar\s+to)\s+([A-Z][A-Za-z0-9'\-]*(?:\s+[A-Z0-9][A-Za-z0-9'\-]*)*)")
        .expect("comparison-title pattern must compile")
});

/// Extracts candidate title mentions from a free-text prompt: quoted
/// substrings first, then "like X" / "similar to X" phrases. Deduplicated,
/// order-preserving, possibly empty.
pub fn extract_title_mentions(prompt: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut titles = Vec::new();

    for captures in QUOTED_TITLE.captures_iter(prompt) {
        push_unique(&mut titles, &mut seen, captures[1].trim());
    }
    for captures in COMPARISON_TITLE.captures_iter(prompt) {
        let candidate = captures[1].trim_end_matches(['.', '!', '?']).trim();
        push_unique(&mut titles, &mut seen, candidate);
    }

    titles
}

fn push_unique(titles: &mut Vec<String>, seen: &mut HashSet<String>, candidate: &str) {
    if candidate.is_empty() {
        return;
    }
    if seen.insert(candidate.to_lowercase()) {
        titles.push(candidate.to_string());
    }
}
