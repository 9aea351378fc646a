//! `CompiledPatterns`: fused alternation regex fast-reject (spec.md §4.4).
//!
//! Up to `MAX_FUSED_FILTERS` pattern sources are joined with `|` into two
//! big regexes — one case-sensitive, one case-insensitive — built lazily on
//! first use per keyword bucket. A filter count above the cap, or a regex
//! build failure, degrades to "no fast reject" rather than an error.

use regex::Regex;

use crate::parse::pattern_to_regex_source;

/// Default fuse limit (spec.md §4.4: "default 100").
pub const MAX_FUSED_FILTERS: usize = 100;

pub struct CompiledPatterns {
    case_sensitive: Regex,
    case_insensitive: Regex,
}

impl CompiledPatterns {
    /// Build from literal pattern sources (already wildcard/anchor
    /// translated into regex source text, see `pattern_to_regex_source`).
    /// Returns `None` if there are too many patterns or either regex fails
    /// to compile — the caller should then skip the fast reject entirely.
    pub fn build<'a>(pattern_sources: impl Iterator<Item = &'a str> + Clone) -> Option<CompiledPatterns> {
        let count = pattern_sources.clone().count();
        if count == 0 || count > MAX_FUSED_FILTERS {
            return None;
        }
        let fused: Vec<&str> = pattern_sources.collect();
        let joined = fused.join("|");

        let case_sensitive = match Regex::new(&joined) {
            Ok(re) => re,
            Err(e) => {
                log::debug!("CompiledPatterns: case-sensitive fuse failed, disabling fast reject: {e}");
                return None;
            }
        };
        let case_insensitive = match Regex::new(&format!("(?i){joined}")) {
            Ok(re) => re,
            Err(e) => {
                log::debug!("CompiledPatterns: case-insensitive fuse failed, disabling fast reject: {e}");
                return None;
            }
        };
        Some(CompiledPatterns { case_sensitive, case_insensitive })
    }

    /// Fast-reject test: true iff either case variant's regex matches the
    /// respective case form of the href.
    pub fn test(&self, href: &str, lower_case_href: &str) -> bool {
        self.case_sensitive.is_match(href) || self.case_insensitive.is_match(lower_case_href)
    }
}

/// Translate a raw filter pattern string into its regex source, exposed for
/// building a `CompiledPatterns` from a bucket of raw patterns.
pub fn translate(pattern: &str) -> String {
    pattern_to_regex_source(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_patterns() {
        let sources = vec![translate("foo"), translate("bar")];
        let cp = CompiledPatterns::build(sources.iter().map(|s| s.as_str())).unwrap();
        assert!(cp.test("http://a.com/foo", "http://a.com/foo"));
        assert!(cp.test("http://a.com/BAR", "http://a.com/bar"));
        assert!(!cp.test("http://a.com/baz", "http://a.com/baz"));
    }

    #[test]
    fn too_many_patterns_is_none() {
        let sources: Vec<String> = (0..MAX_FUSED_FILTERS + 1).map(|i| translate(&format!("p{i}"))).collect();
        assert!(CompiledPatterns::build(sources.iter().map(|s| s.as_str())).is_none());
    }

    #[test]
    fn empty_is_none() {
        let empty: Vec<String> = Vec::new();
        assert!(CompiledPatterns::build(empty.iter().map(|s| s.as_str())).is_none());
    }
}
