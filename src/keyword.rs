//! Rarest-keyword picker (spec.md §4.3).
//!
//! Scans a lowercased filter pattern for candidate tokens, rejects the
//! known-bad ones, and picks whichever remaining candidate currently
//! indexes the fewest filters, with ties broken toward the longer keyword.

use std::sync::LazyLock;

use regex::Regex;

/// `[^a-z0-9%*][a-z0-9%]{2,}(?=[^a-z0-9%*])` — each match's leading
/// character is the delimiter and is stripped from the candidate.
static KEYWORD_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9%*]([a-z0-9%]{2,})(?=[^a-z0-9%*])").unwrap());

const BAD_KEYWORDS: [&str; 4] = ["http", "https", "com", "js"];

/// Extract every maximal run of `[a-z0-9%]{2,}` from `lower_case_href`,
/// for candidate-keyword lookup during matching.
static CANDIDATE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9%]{2,}").unwrap());

/// Choose the rarest acceptable keyword in `pattern`, where "rarest" is
/// measured by `count_for(candidate)`. Returns `""` if no candidate survives
/// (or the filter has no pattern, i.e. it is regex-only).
pub fn find_keyword(pattern: Option<&str>, count_for: impl Fn(&str) -> usize) -> String {
    let Some(pattern) = pattern else { return String::new() };
    let lower = pattern.to_ascii_lowercase();
    // Anchor the scan so a candidate touching the start/end of the pattern is
    // still found: surround with a delimiter sentinel.
    let padded = format!(" {} ", lower);

    let mut best: Option<(usize, String)> = None;
    for caps in KEYWORD_CANDIDATE.captures_iter(&padded) {
        let candidate = caps.get(1).unwrap().as_str();
        if BAD_KEYWORDS.contains(&candidate) {
            continue;
        }
        let count = count_for(candidate);
        best = Some(match best {
            None => (count, candidate.to_string()),
            Some((best_count, best_candidate)) => {
                if count < best_count || (count == best_count && candidate.len() > best_candidate.len()) {
                    (count, candidate.to_string())
                } else {
                    (best_count, best_candidate)
                }
            }
        });
    }
    best.map(|(_, kw)| kw).unwrap_or_default()
}

/// Extract all maximal candidate-keyword runs from a lowercased href, plus
/// the fallback empty keyword, in extraction order.
pub fn candidates_for_url(lower_case_href: &str) -> Vec<String> {
    let mut out: Vec<String> = CANDIDATE_RUN
        .find_iter(lower_case_href)
        .map(|m| m.as_str().to_string())
        .filter(|kw| !BAD_KEYWORDS.contains(&kw.as_str()))
        .collect();
    out.push(String::new());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_rarest() {
        // "tracker" indexes 10000, "zebra" indexes 1 -> zebra wins.
        let kw = find_keyword(Some("^foo-tracker-zebra^"), |c| if c == "tracker" { 10_000 } else { 1 });
        assert_eq!(kw, "zebra");
    }

    #[test]
    fn rejects_bad_keywords() {
        let kw = find_keyword(Some("||http.com^"), |_| 0);
        assert_eq!(kw, "");
    }

    #[test]
    fn ties_prefer_longer() {
        let kw = find_keyword(Some("^ab-abcd^"), |_| 5);
        assert_eq!(kw, "abcd");
    }

    #[test]
    fn no_pattern_is_empty_keyword() {
        assert_eq!(find_keyword(None, |_| 0), "");
    }

    #[test]
    fn candidates_include_fallback() {
        let c = candidates_for_url("https://a.com/foo/bar.js");
        assert!(c.contains(&"foo".to_string()));
        assert!(c.contains(&String::new()));
        assert!(!c.contains(&"com".to_string()));
    }
}
