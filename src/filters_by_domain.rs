//! `FiltersByDomain`: domain → (filter, include) index with the bimodal
//! bare-filter / `FilterMap` representation described in spec.md §3, §4.2,
//! and §9. The bare form is the overwhelmingly common "one filter per
//! domain, include=true" case; it collapses to avoid an allocation per
//! domain across the whole list corpus.

use ahash::AHashMap;

/// An ordered `filterText -> include` mapping, never a singleton `(_, true)`
/// (that shape always collapses to `Entry::Single`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMap {
    order: Vec<String>,
    include: AHashMap<String, bool>,
}

impl FilterMap {
    fn new() -> Self {
        FilterMap { order: Vec::new(), include: AHashMap::new() }
    }

    fn insert(&mut self, text: &str, include: bool) {
        if self.include.insert(text.to_string(), include).is_none() {
            self.order.push(text.to_string());
        }
    }

    fn remove(&mut self, text: &str) {
        if self.include.remove(text).is_some() {
            self.order.retain(|t| t != text);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate `(text, include)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.order.iter().map(move |t| (t.as_str(), self.include[t]))
    }

    /// If this map has collapsed to a single `(text, true)` pair, return it.
    fn as_single_inclusion(&self) -> Option<&str> {
        if self.order.len() == 1 {
            let text = &self.order[0];
            if self.include[text] {
                return Some(text.as_str());
            }
        }
        None
    }
}

/// A domain's entry: either a bare filter text (include=true, sole entry) or
/// a full `FilterMap` with at least one non-`(_, true)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Single(String),
    Many(FilterMap),
}

impl Entry {
    /// Iterate `(text, include)` pairs; a bare entry yields `(text, true)`.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, bool)> + '_> {
        match self {
            Entry::Single(text) => Box::new(std::iter::once((text.as_str(), true))),
            Entry::Many(map) => Box::new(map.iter()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Entry::Single(_) => 1,
            Entry::Many(map) => map.len(),
        }
    }
}

/// Domain → Entry index. The empty-string domain key means "applies
/// everywhere" (bare form) or "does not apply generically" (an exclusion
/// inside a `FilterMap`).
#[derive(Debug, Clone, Default)]
pub struct FiltersByDomain {
    domains: AHashMap<String, Entry>,
}

impl FiltersByDomain {
    pub fn new() -> Self {
        FiltersByDomain { domains: AHashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn get(&self, domain: &str) -> Option<&Entry> {
        self.domains.get(domain)
    }

    pub fn has(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.domains.iter().map(|(d, e)| (d.as_str(), e))
    }

    /// Add `(text, domain)` pairs from a filter's domain mapping. `domains`
    /// of `None` is treated as the single pair `("", true)`.
    pub fn add<'a, I>(&mut self, text: &str, domains: Option<I>)
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        match domains {
            None => self.add_one(text, "", true),
            Some(iter) => {
                for (domain, include) in iter {
                    if domain.is_empty() && !include {
                        continue;
                    }
                    self.add_one(text, domain, include);
                }
            }
        }
    }

    fn add_one(&mut self, text: &str, domain: &str, include: bool) {
        match self.domains.get_mut(domain) {
            None => {
                if include {
                    self.domains.insert(domain.to_string(), Entry::Single(text.to_string()));
                } else {
                    let mut map = FilterMap::new();
                    map.insert(text, false);
                    self.domains.insert(domain.to_string(), Entry::Many(map));
                }
            }
            Some(Entry::Single(existing)) => {
                if existing == text {
                    // no-op, idempotent re-add of the identical pair
                } else {
                    let mut map = FilterMap::new();
                    map.insert(existing, true);
                    map.insert(text, include);
                    *self.domains.get_mut(domain).unwrap() = Entry::Many(map);
                }
            }
            Some(Entry::Many(map)) => {
                map.insert(text, include);
            }
        }
    }

    /// Remove `(text, domain)` pairs, mirroring `add`'s argument shape.
    pub fn remove<'a, I>(&mut self, text: &str, domains: Option<I>)
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        match domains {
            None => self.remove_one(text, ""),
            Some(iter) => {
                for (domain, _include) in iter {
                    self.remove_one(text, domain);
                }
            }
        }
    }

    fn remove_one(&mut self, text: &str, domain: &str) {
        let Some(entry) = self.domains.get_mut(domain) else { return };
        match entry {
            Entry::Single(existing) => {
                if existing == text {
                    self.domains.remove(domain);
                }
            }
            Entry::Many(map) => {
                map.remove(text);
                if map.is_empty() {
                    self.domains.remove(domain);
                } else if let Some(sole) = map.as_single_inclusion() {
                    let sole = sole.to_string();
                    self.domains.insert(domain.to_string(), Entry::Single(sole));
                }
            }
        }
    }
}
