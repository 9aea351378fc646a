//! `CombinedMatcher`: composes a blocking `Matcher` and a whitelist `Matcher`
//! behind one cached decision (spec.md §4.6).

use crate::content_type::{ContentType, WHITELISTING_TYPES};
use crate::filter::{Filter, Kind};
use crate::lru::LruCache;
use crate::matcher::Matcher;
use crate::request::URLRequest;

/// Which classes of filter a `search` call should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    All,
    Blocking,
    Whitelist,
}

/// Key for the result cache: every input that can change the answer, as a
/// structured tuple rather than a concatenated string (spec.md §9 "LRU
/// cache"). `search_selector` is `None` for a `match_url` entry and
/// `Some(filter_type)` for a `search` entry — this doubles as the "leading
/// sentinel plus filterType" spec.md §4.6 describes, since it keeps the two
/// call kinds from colliding on an otherwise-identical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    href: String,
    document_hostname: String,
    type_mask: u32,
    third_party: bool,
    sitekey: Option<String>,
    specific_only: bool,
    search_selector: Option<FilterType>,
}

/// A cached result: either the winning filter (or none) for `match_url`, or
/// the full `(blocking, whitelist)` accumulator pair for `search` (spec.md
/// §3 "Result cache": "values are either the winning filter reference, null,
/// or a `{blocking:[...], whitelist:[...]}` record").
#[derive(Debug, Clone)]
enum CacheValue {
    Single(Option<Filter>),
    Collected(Vec<Filter>, Vec<Filter>),
}

/// The default result cache capacity (spec.md §9: "~10 000 entries").
pub const DEFAULT_RESULT_CACHE_CAPACITY: usize = 10_000;

pub struct CombinedMatcher {
    blocking: Matcher,
    whitelist: Matcher,
    results: LruCache<MatchKey, CacheValue>,
}

impl CombinedMatcher {
    pub fn new() -> Self {
        CombinedMatcher::with_cache_capacity(DEFAULT_RESULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(cache_capacity: usize) -> Self {
        CombinedMatcher {
            blocking: Matcher::new(),
            whitelist: Matcher::new(),
            results: LruCache::new(cache_capacity),
        }
    }

    /// Routes by `filter.kind()`; filters of any other kind are ignored
    /// (only `Blocking`/`Whitelist` reach either sub-matcher, spec.md §3).
    pub fn add(&mut self, filter: Filter) {
        match filter.kind() {
            Kind::Blocking => self.blocking.add(filter),
            Kind::Whitelist => self.whitelist.add(filter),
            _ => return,
        }
        self.results.clear();
    }

    pub fn remove(&mut self, filter: &Filter) {
        match filter.kind() {
            Kind::Blocking => self.blocking.remove(filter),
            Kind::Whitelist => self.whitelist.remove(filter),
            _ => return,
        }
        self.results.clear();
    }

    pub fn has(&self, filter: &Filter) -> bool {
        match filter.kind() {
            Kind::Blocking => self.blocking.has(filter),
            Kind::Whitelist => self.whitelist.has(filter),
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.blocking = Matcher::new();
        self.whitelist = Matcher::new();
        self.results.clear();
    }

    /// spec.md §4.6 `match`: a blocking hit is overridden by a whitelist hit
    /// whenever one applies. Whitelist candidates are always scanned with
    /// `specificOnly = false`: an exception should apply regardless of
    /// whether the blocking side asked for generic filters only.
    pub fn match_url(
        &mut self,
        request: &URLRequest,
        type_mask: ContentType,
        sitekey: Option<&str>,
        specific_only: bool,
    ) -> Option<Filter> {
        let key = MatchKey {
            href: request.href.clone(),
            document_hostname: request.document_hostname.clone(),
            type_mask: type_mask.0,
            third_party: request.third_party,
            sitekey: sitekey.map(|s| s.to_string()),
            specific_only,
            search_selector: None,
        };
        if let Some(CacheValue::Single(cached)) = self.results.get(&key) {
            return cached;
        }

        let blocking_hit = self.blocking.match_url(request, type_mask, sitekey, specific_only);
        let result = if blocking_hit.is_some() || type_mask.intersects(WHITELISTING_TYPES) {
            match self.whitelist.match_url(request, type_mask, sitekey, false) {
                Some(exception) => Some(exception),
                None => blocking_hit,
            }
        } else {
            blocking_hit
        };

        self.results.insert(key, CacheValue::Single(result.clone()));
        result
    }

    /// `true` iff an applicable whitelist filter exists for this request,
    /// independent of whether anything would have blocked it.
    pub fn is_whitelisted(
        &mut self,
        request: &URLRequest,
        type_mask: ContentType,
        sitekey: Option<&str>,
    ) -> bool {
        self.whitelist.match_url(request, type_mask, sitekey, false).is_some()
    }

    /// spec.md §4.6 `search` (cached): walk all candidates through both
    /// matchers, honoring `filter_type` to select which accumulator(s) are
    /// returned. Cached the same way `match_url` is, keyed with `filter_type`
    /// folded in (spec.md §3: "keys include ... (for search) a filter-type
    /// selector").
    pub fn search(
        &mut self,
        request: &URLRequest,
        type_mask: ContentType,
        sitekey: Option<&str>,
        specific_only: bool,
        filter_type: FilterType,
    ) -> Vec<Filter> {
        let key = MatchKey {
            href: request.href.clone(),
            document_hostname: request.document_hostname.clone(),
            type_mask: type_mask.0,
            third_party: request.third_party,
            sitekey: sitekey.map(|s| s.to_string()),
            specific_only,
            search_selector: Some(filter_type),
        };
        if let Some(CacheValue::Collected(blocking, whitelist)) = self.results.get(&key) {
            return Self::assemble_search_result(filter_type, blocking, whitelist);
        }

        let blocking = self.blocking.search(request, type_mask, sitekey, specific_only);
        let whitelist = self.whitelist.search(request, type_mask, sitekey, specific_only);

        self.results.insert(key, CacheValue::Collected(blocking.clone(), whitelist.clone()));
        Self::assemble_search_result(filter_type, blocking, whitelist)
    }

    fn assemble_search_result(filter_type: FilterType, blocking: Vec<Filter>, whitelist: Vec<Filter>) -> Vec<Filter> {
        match filter_type {
            FilterType::All => blocking.into_iter().chain(whitelist).collect(),
            FilterType::Blocking => blocking,
            FilterType::Whitelist => whitelist,
        }
    }

    pub fn blocking_len(&self) -> usize {
        self.blocking.len()
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }
}

impl Default for CombinedMatcher {
    fn default() -> Self {
        CombinedMatcher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter_text;

    #[test]
    fn whitelist_overrides_blocking() {
        let mut cm = CombinedMatcher::new();
        cm.add(parse_filter_text("^foo^"));
        cm.add(parse_filter_text("@@^foo^$domain=example.com"));

        let req = URLRequest::new("http://a.com/foo", "example.com", false);
        let hit = cm.match_url(&req, ContentType::SCRIPT, None, false);
        assert_eq!(hit.map(|f| f.kind()), Some(Kind::Whitelist));

        let other = URLRequest::new("http://a.com/foo", "other.com", false);
        let hit2 = cm.match_url(&other, ContentType::SCRIPT, None, false);
        assert_eq!(hit2.map(|f| f.kind()), Some(Kind::Blocking));
    }

    #[test]
    fn no_block_no_hit() {
        let mut cm = CombinedMatcher::new();
        cm.add(parse_filter_text("^foo^"));
        let req = URLRequest::new("http://a.com/bar", "example.com", false);
        assert!(cm.match_url(&req, ContentType::SCRIPT, None, false).is_none());
    }

    #[test]
    fn cache_is_invalidated_on_add_and_remove() {
        let mut cm = CombinedMatcher::new();
        let req = URLRequest::new("http://a.com/foo", "example.com", false);
        assert!(cm.match_url(&req, ContentType::SCRIPT, None, false).is_none());

        let f = parse_filter_text("^foo^");
        cm.add(f.clone());
        assert!(cm.match_url(&req, ContentType::SCRIPT, None, false).is_some());

        cm.remove(&f);
        assert!(cm.match_url(&req, ContentType::SCRIPT, None, false).is_none());
    }

    #[test]
    fn search_result_is_cached_and_stable() {
        let mut cm = CombinedMatcher::new();
        cm.add(parse_filter_text("^foo^"));
        let req = URLRequest::new("http://a.com/foo", "example.com", false);

        let first = cm.search(&req, ContentType::SCRIPT, None, false, FilterType::All);
        let second = cm.search(&req, ContentType::SCRIPT, None, false, FilterType::All);
        assert_eq!(
            first.iter().map(|f| f.text().to_string()).collect::<Vec<_>>(),
            second.iter().map(|f| f.text().to_string()).collect::<Vec<_>>(),
        );
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn search_cache_is_invalidated_on_add_and_remove() {
        let mut cm = CombinedMatcher::new();
        let req = URLRequest::new("http://a.com/foo", "example.com", false);
        assert!(cm.search(&req, ContentType::SCRIPT, None, false, FilterType::All).is_empty());

        let f = parse_filter_text("^foo^");
        cm.add(f.clone());
        assert_eq!(cm.search(&req, ContentType::SCRIPT, None, false, FilterType::All).len(), 1);

        cm.remove(&f);
        assert!(cm.search(&req, ContentType::SCRIPT, None, false, FilterType::All).is_empty());
    }

    #[test]
    fn search_and_match_caches_do_not_collide() {
        let mut cm = CombinedMatcher::new();
        cm.add(parse_filter_text("^foo^"));
        let req = URLRequest::new("http://a.com/foo", "example.com", false);

        let matched = cm.match_url(&req, ContentType::SCRIPT, None, false);
        let searched = cm.search(&req, ContentType::SCRIPT, None, false, FilterType::All);
        assert!(matched.is_some());
        assert_eq!(searched.len(), 1);
    }

    #[test]
    fn search_honors_filter_type() {
        let mut cm = CombinedMatcher::new();
        cm.add(parse_filter_text("^foo^"));
        cm.add(parse_filter_text("@@^foo^"));
        let req = URLRequest::new("http://a.com/foo", "example.com", false);

        let all = cm.search(&req, ContentType::SCRIPT, None, false, FilterType::All);
        assert_eq!(all.len(), 2);

        let blocking_only = cm.search(&req, ContentType::SCRIPT, None, false, FilterType::Blocking);
        assert_eq!(blocking_only.len(), 1);
        assert_eq!(blocking_only[0].kind(), Kind::Blocking);
    }

    #[test]
    fn is_whitelisted_independent_of_any_blocking_rule() {
        let mut cm = CombinedMatcher::new();
        cm.add(parse_filter_text("@@^foo^"));
        let req = URLRequest::new("http://a.com/foo", "example.com", false);
        assert!(cm.is_whitelisted(&req, ContentType::SCRIPT, None));
    }
}
