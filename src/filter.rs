//! `Filter`: the immutable filter value model (spec.md §3), plus the
//! `Filter::from_text` memoization cache (spec.md §5, §9).

use std::sync::{LazyLock, Mutex};

use ahash::AHashMap;
use regex::Regex;

use crate::content_type::ContentType;
use crate::domain::domain_suffixes;
use crate::error::FilterParseError;
use crate::parse::{self, pattern_to_regex_source};
use crate::request::{ThirdParty, URLRequest};

/// Kind of a parsed filter line. Only `Blocking` and `Whitelist` reach the
/// URL matcher (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Blocking,
    Whitelist,
    ElemHide,
    ElemHideException,
    ElemHideEmulation,
    Snippet,
    Comment,
    Invalid,
}

/// An ordered `domain -> include` mapping built from a filter's `domain=`
/// option (spec.md §3 "Domain representation").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainMap {
    order: Vec<String>,
    include: AHashMap<String, bool>,
}

impl DomainMap {
    pub fn from_pairs(pairs: Vec<(String, bool)>) -> Self {
        let mut map = DomainMap::default();
        for (domain, include) in pairs {
            if map.include.insert(domain.clone(), include).is_none() {
                map.order.push(domain);
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn include(&self, domain: &str) -> Option<bool> {
        self.include.get(domain).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.order.iter().map(move |d| (d.as_str(), self.include[d]))
    }

    /// True iff this filter applies with no domain restriction anywhere
    /// (i.e. the blank key is included and there are no further entries, or
    /// the map is empty/absent — callers handle the `None` case themselves).
    pub fn is_unrestricted(&self) -> bool {
        self.order.len() == 1 && self.order[0].is_empty() && self.include[""]
    }
}

/// A successfully-parsed URL filter. Immutable after construction;
/// `text` is the stable equality key everywhere (spec.md §3 invariant).
#[derive(Debug, Clone)]
pub struct UrlFilter {
    pub text: String,
    pub kind: Kind,
    pub pattern: Option<String>,
    pub regexp: Option<Regex>,
    pub regexp_source: Option<String>,
    pub match_case: bool,
    pub content_type: ContentType,
    pub third_party: ThirdParty,
    pub domains: Option<DomainMap>,
    pub sitekeys: Option<Vec<String>>,
    pub rewrite: Option<String>,
    pub csp: Option<String>,
}

/// Top-level filter value (spec.md §3 "polymorphism over filters" design
/// note): a tagged variant with the URL-matcher-relevant fields carried by
/// `UrlFilter`, plus an `Invalid` marker for unparseable or rejected text.
#[derive(Debug, Clone)]
pub enum Filter {
    Url(UrlFilter),
    NonUrl { text: String, kind: Kind },
    Invalid { text: String, reason: FilterParseError },
}

impl Filter {
    pub fn text(&self) -> &str {
        match self {
            Filter::Url(f) => &f.text,
            Filter::NonUrl { text, .. } => text,
            Filter::Invalid { text, .. } => text,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Filter::Url(f) => f.kind,
            Filter::NonUrl { kind, .. } => *kind,
            Filter::Invalid { .. } => Kind::Invalid,
        }
    }

    /// True iff the filter applies on any domain and requires no sitekey
    /// (spec.md §3, Glossary "Generic filter").
    pub fn is_generic(&self) -> bool {
        match self {
            Filter::Url(f) => {
                f.sitekeys.is_none() && f.domains.as_ref().map_or(true, |d| d.is_unrestricted())
            }
            _ => true,
        }
    }

    /// spec.md §4.5 "isActiveOnDomain": is this filter active given the
    /// document hostname, honoring the domain-suffix walk and include/
    /// exclude semantics, independent of the pattern/type/third-party check.
    pub fn is_active_on_domain(&self, document_hostname: &str, sitekey: Option<&str>) -> bool {
        let Filter::Url(f) = self else { return false };

        if let Some(ref keys) = f.sitekeys {
            let Some(key) = sitekey else { return false };
            if !keys.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                return false;
            }
        }

        let Some(ref domains) = f.domains else { return true };

        // A single filter's own domain map has at most one entry per
        // domain key, so the most specific suffix with an entry decides
        // outright (unlike the multi-filter walk in the matcher, which
        // must track exclusions seen across several filters sharing a
        // keyword bucket — see `Matcher::checkEntryMatch`, spec.md §4.5).
        for suffix in domain_suffixes(document_hostname, true) {
            if let Some(include) = domains.include(suffix) {
                return include;
            }
        }
        false
    }

    /// spec.md §4.5 `filter.matches(request, typeMask, sitekey)`.
    pub fn matches(&self, request: &URLRequest, type_mask: ContentType, sitekey: Option<&str>) -> bool {
        let Filter::Url(f) = self else { return false };

        if !f.content_type.intersects(type_mask) {
            return false;
        }
        if !f.third_party.matches(request.third_party) {
            return false;
        }
        if !self.is_active_on_domain(&request.document_hostname, sitekey) {
            return false;
        }

        let haystack = if f.match_case { request.href.as_str() } else { request.lower_case_href.as_str() };
        match &f.regexp {
            Some(re) => re.is_match(haystack),
            None => false,
        }
    }
}

/// Build a `Filter` from already-parsed components (used by `parse.rs` via
/// `from_text`, and directly by tests).
fn build_url_filter(text: &str, parsed: parse::ParsedNetworkFilter) -> Filter {
    if let Err(reason) = parse::validate_whitelisting_types(parsed.kind, parsed.content_type) {
        return Filter::Invalid { text: text.to_string(), reason };
    }

    let regex_source = match (&parsed.pattern, &parsed.regexp) {
        (Some(p), None) => pattern_to_regex_source(p),
        (None, Some(r)) => r.clone(),
        _ => {
            return Filter::Invalid {
                text: text.to_string(),
                reason: FilterParseError::ConflictingOption(
                    "exactly one of pattern/regexp must be present".into(),
                ),
            }
        }
    };

    let mut builder = regex::RegexBuilder::new(&regex_source);
    builder.case_insensitive(!parsed.match_case);
    let regexp = match builder.build() {
        Ok(re) => Some(re),
        Err(e) => return Filter::Invalid { text: text.to_string(), reason: e.into() },
    };

    Filter::Url(UrlFilter {
        text: text.to_string(),
        kind: parsed.kind,
        pattern: parsed.pattern,
        regexp,
        regexp_source: Some(regex_source),
        match_case: parsed.match_case,
        content_type: parsed.content_type,
        third_party: parsed.third_party,
        domains: parsed.domains,
        sitekeys: parsed.sitekeys,
        rewrite: parsed.rewrite,
        csp: parsed.csp,
    })
}

/// Construct a `Filter` from filter-list text. Errors never propagate: an
/// unparseable or invalid-combination line becomes `Filter::Invalid` with a
/// machine-readable reason (spec.md §7). Comment lines (`!` prefix) and
/// cosmetic rules (containing `#`) are classified accordingly but not
/// decoded further — decoding them is out of scope (spec.md §1 Non-goals).
pub fn parse_filter_text(text: &str) -> Filter {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Filter::Invalid { text: text.to_string(), reason: FilterParseError::Empty };
    }
    if trimmed.starts_with('!') {
        return Filter::NonUrl { text: text.to_string(), kind: Kind::Comment };
    }
    if trimmed.contains("#@#") {
        return Filter::NonUrl { text: text.to_string(), kind: Kind::ElemHideException };
    }
    if trimmed.contains("#?#") || trimmed.contains("#@?#") {
        return Filter::NonUrl { text: text.to_string(), kind: Kind::ElemHideEmulation };
    }
    if trimmed.contains("##") {
        return Filter::NonUrl { text: text.to_string(), kind: Kind::ElemHide };
    }

    match parse::parse_network_filter(trimmed) {
        Ok(parsed) => build_url_filter(text, parsed),
        Err(reason) => Filter::Invalid { text: text.to_string(), reason },
    }
}

/// An injectable memoization cache for `Filter::from_text` (spec.md §9
/// "Global state" — make it injectable; tests must be able to construct an
/// isolated matcher). Capacity-bounded at `capacity` entries using simple
/// FIFO eviction over an `ahash` map, since exact LRU ordering for this memo
/// has no observable effect beyond the process-wide convenience wrapper.
pub struct FilterCache {
    capacity: usize,
    order: Mutex<Vec<String>>,
    entries: Mutex<AHashMap<String, Filter>>,
}

impl FilterCache {
    pub fn new(capacity: usize) -> Self {
        FilterCache { capacity, order: Mutex::new(Vec::new()), entries: Mutex::new(AHashMap::new()) }
    }

    pub fn from_text(&self, text: &str) -> Filter {
        if let Some(existing) = self.entries.lock().unwrap().get(text) {
            return existing.clone();
        }
        let filter = parse_filter_text(text);
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(text) {
            let mut order = self.order.lock().unwrap();
            order.push(text.to_string());
            if order.len() > self.capacity {
                let evicted = order.remove(0);
                entries.remove(&evicted);
            }
            entries.insert(text.to_string(), filter.clone());
        }
        filter
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Default memo capacity (spec.md §3: "memoized by an LRU of ~10 000
/// entries").
pub const DEFAULT_FILTER_CACHE_CAPACITY: usize = 10_000;

static DEFAULT_CACHE: LazyLock<FilterCache> = LazyLock::new(|| FilterCache::new(DEFAULT_FILTER_CACHE_CAPACITY));

/// `Filter::fromText(text) -> Filter`, backed by the process-wide default
/// cache. Referentially transparent: equal `text` always yields an
/// equivalent `Filter` (spec.md §3 invariant).
pub fn from_text(text: &str) -> Filter {
    DEFAULT_CACHE.from_text(text)
}

/// Build a `FiltersByDomain`-compatible entry iterator from a filter's
/// `DomainMap`, or the implicit `("", true)` pair when absent.
pub fn domain_pairs(filter: &UrlFilter) -> Vec<(String, bool)> {
    match &filter.domains {
        Some(map) => map.iter().map(|(d, i)| (d.to_string(), i)).collect(),
        None => vec![(String::new(), true)],
    }
}
