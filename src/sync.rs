//! `SyncCombinedMatcher`: a `CombinedMatcher` behind a `parking_lot::RwLock`
//! (spec.md §5 concurrency strategy (b) supplement — readers queries don't
//! block each other, writers get exclusive access for add/remove).

use parking_lot::RwLock;

use crate::combined_matcher::{CombinedMatcher, FilterType};
use crate::content_type::ContentType;
use crate::filter::Filter;
use crate::request::URLRequest;

/// Thread-safe wrapper over `CombinedMatcher`. Every operation here takes
/// the write lock: `add`/`remove`/`clear` mutate the filter sets, and
/// `match_url`/`is_whitelisted`/`search` mutate the result LRU's recency
/// bookkeeping even on a cache hit, so none of them can run concurrently with
/// each other. `has`/`blocking_len`/`whitelist_len` only read and take the
/// read lock, so they can run alongside other readers.
pub struct SyncCombinedMatcher {
    inner: RwLock<CombinedMatcher>,
}

impl SyncCombinedMatcher {
    pub fn new() -> Self {
        SyncCombinedMatcher { inner: RwLock::new(CombinedMatcher::new()) }
    }

    pub fn with_cache_capacity(cache_capacity: usize) -> Self {
        SyncCombinedMatcher { inner: RwLock::new(CombinedMatcher::with_cache_capacity(cache_capacity)) }
    }

    pub fn add(&self, filter: Filter) {
        self.inner.write().add(filter);
    }

    pub fn remove(&self, filter: &Filter) {
        self.inner.write().remove(filter);
    }

    pub fn has(&self, filter: &Filter) -> bool {
        self.inner.read().has(filter)
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn match_url(
        &self,
        request: &URLRequest,
        type_mask: ContentType,
        sitekey: Option<&str>,
        specific_only: bool,
    ) -> Option<Filter> {
        self.inner.write().match_url(request, type_mask, sitekey, specific_only)
    }

    pub fn is_whitelisted(&self, request: &URLRequest, type_mask: ContentType, sitekey: Option<&str>) -> bool {
        self.inner.write().is_whitelisted(request, type_mask, sitekey)
    }

    pub fn search(
        &self,
        request: &URLRequest,
        type_mask: ContentType,
        sitekey: Option<&str>,
        specific_only: bool,
        filter_type: FilterType,
    ) -> Vec<Filter> {
        self.inner.write().search(request, type_mask, sitekey, specific_only, filter_type)
    }

    pub fn blocking_len(&self) -> usize {
        self.inner.read().blocking_len()
    }

    pub fn whitelist_len(&self) -> usize {
        self.inner.read().whitelist_len()
    }
}

impl Default for SyncCombinedMatcher {
    fn default() -> Self {
        SyncCombinedMatcher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter_text;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_adds_and_queries_do_not_panic() {
        let matcher = Arc::new(SyncCombinedMatcher::new());

        let mut handles = Vec::new();
        for i in 0..8 {
            let matcher = Arc::clone(&matcher);
            handles.push(thread::spawn(move || {
                matcher.add(parse_filter_text(&format!("^thread-{i}-token^")));
                let req = URLRequest::new(
                    &format!("http://a.com/thread-{i}-token"),
                    "a.com",
                    false,
                );
                matcher.match_url(&req, ContentType::SCRIPT, None, false)
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(matcher.blocking_len(), 8);
    }
}
