//! Filter-text grammar (spec.md §6, §3 "Domain representation" supplement).
//!
//! Translates `[@@]<pattern>[$<options>]` filter-list lines into `Filter`
//! values. This is the minimal external collaborator spec.md §6 describes —
//! just enough of EasyList/uBO/AdGuard's options grammar to produce correct
//! matcher input, not the full list-maintenance grammar `fop` implements for
//! sorting.

use std::sync::LazyLock;

use regex::Regex;

use crate::content_type::{ContentType, RESOURCE_TYPES, WHITELISTING_TYPES};
use crate::error::FilterParseError;
use crate::filter::{DomainMap, Kind};
use crate::request::ThirdParty;

static OPTION_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\$(~?[\w-]+(?:=[^,]*)?(?:,~?[\w-]+(?:=[^,]*)?)*)$").unwrap());

/// Separator character class for `^`, per spec.md §6: any byte in
/// `0x00-0x24, 0x26-0x2C, 0x2F, 0x3A-0x40, 0x5B-0x5E, 0x60, 0x7B-0x7F`.
pub fn is_separator_byte(b: u8) -> bool {
    matches!(b,
        0x00..=0x24 | 0x26..=0x2C | 0x2F | 0x3A..=0x40 | 0x5B..=0x5E | 0x60 | 0x7B..=0x7F)
}

/// Regex character-class source for the same byte set `is_separator_byte`
/// recognizes; used when translating `^` into a pattern regex.
const SEPARATOR_CLASS_REGEX: &str = r"[\x00-\x24\x26-\x2c\x2f\x3a-\x40\x5b-\x5e\x60\x7b-\x7f]";

/// Translate a wildcard/anchor pattern into regex source text.
/// `*` -> `.*`, `^` -> separator class, `|` at start/end -> boundary anchor,
/// `||` at start -> domain-boundary anchor.
pub fn pattern_to_regex_source(pattern: &str) -> String {
    let mut rest = pattern;
    let mut out = String::with_capacity(pattern.len() * 2);

    if let Some(stripped) = rest.strip_prefix("||") {
        // Domain-boundary anchor: scheme, then optional subdomain labels.
        out.push_str(r"^[a-z-]+://([a-z0-9-]+\.)*");
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('|') {
        out.push('^');
        rest = stripped;
    }

    let had_trailing_anchor = rest.ends_with('|') && rest.len() > 1;
    let body = if had_trailing_anchor { &rest[..rest.len() - 1] } else { rest };

    for ch in body.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '^' => out.push_str(SEPARATOR_CLASS_REGEX),
            c if is_regex_meta_character(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }

    if had_trailing_anchor {
        out.push('$');
    }

    out
}

/// Characters `regex` treats specially outside a character class, which need
/// escaping when copying literal pattern text into a translated regex.
fn is_regex_meta_character(c: char) -> bool {
    matches!(c, '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$')
}

/// Build a `DomainMap` from a `domain=` option value, e.g.
/// `example.com|~www.example.com`. See spec.md §3 "Domain representation".
pub fn parse_domain_option(value: &str) -> DomainMap {
    let mut entries: Vec<(String, bool)> = Vec::new();
    let mut any_inclusion = false;
    let mut any_exclusion = false;

    for token in value.split('|') {
        if token.is_empty() {
            continue;
        }
        if let Some(excluded) = token.strip_prefix('~') {
            any_exclusion = true;
            entries.push((excluded.to_ascii_lowercase(), false));
        } else {
            any_inclusion = true;
            entries.push((token.to_ascii_lowercase(), true));
        }
    }

    // An inclusion list implicitly sets "" to false; a pure-exclusion list
    // implicitly sets "" to true, unless explicitly overridden below.
    let blank_default = if any_inclusion {
        false
    } else if any_exclusion {
        true
    } else {
        true
    };

    if !entries.iter().any(|(d, _)| d.is_empty()) {
        entries.insert(0, (String::new(), blank_default));
    }

    DomainMap::from_pairs(entries)
}

/// A successfully-parsed URL filter's components, prior to being wrapped in
/// the `Filter` enum.
pub struct ParsedNetworkFilter {
    pub kind: Kind,
    pub pattern: Option<String>,
    pub regexp: Option<String>,
    pub match_case: bool,
    pub content_type: ContentType,
    pub third_party: ThirdParty,
    pub domains: Option<DomainMap>,
    pub sitekeys: Option<Vec<String>>,
    pub rewrite: Option<String>,
    pub csp: Option<String>,
}

/// Parse `[@@]<pattern>[$<options>]` into its components.
pub fn parse_network_filter(text: &str) -> Result<ParsedNetworkFilter, FilterParseError> {
    if text.is_empty() {
        return Err(FilterParseError::Empty);
    }

    let (is_whitelist, rest) = match text.strip_prefix("@@") {
        Some(r) => (true, r),
        None => (false, text),
    };
    if rest.is_empty() {
        return Err(FilterParseError::Empty);
    }

    let (pattern_part, options_part) = match OPTION_SPLIT.captures(rest) {
        Some(caps) => (
            caps.get(1).unwrap().as_str().to_string(),
            Some(caps.get(2).unwrap().as_str().to_string()),
        ),
        None => (rest.to_string(), None),
    };

    let (pattern, regexp) = if pattern_part.starts_with('/') && pattern_part.ends_with('/') && pattern_part.len() >= 2
    {
        (None, Some(pattern_part[1..pattern_part.len() - 1].to_string()))
    } else {
        (Some(pattern_part), None)
    };

    if let Some(ref r) = regexp {
        Regex::new(r).map_err(FilterParseError::from)?;
    }

    let mut content_type = RESOURCE_TYPES;
    let mut seen_inclusion_type = false;
    let mut match_case = false;
    let mut third_party = ThirdParty::Any;
    let mut domains: Option<DomainMap> = None;
    let mut sitekeys: Option<Vec<String>> = None;
    let mut rewrite = None;
    let mut csp = None;

    if let Some(options) = options_part {
        for option in options.split(',') {
            let (excluded, name_value) =
                if let Some(rest) = option.strip_prefix('~') { (true, rest) } else { (false, option) };
            let (name, value) = match name_value.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (name_value, None),
            };

            if name == "domain" {
                let value = value.ok_or_else(|| FilterParseError::ConflictingOption("domain= requires a value".into()))?;
                domains = Some(parse_domain_option(value));
                continue;
            }
            if name == "sitekey" {
                let value = value.ok_or_else(|| FilterParseError::ConflictingOption("sitekey= requires a value".into()))?;
                sitekeys = Some(value.split('|').map(|s| s.to_ascii_uppercase()).collect());
                continue;
            }
            if name == "match-case" {
                match_case = true;
                continue;
            }
            if name == "third-party" {
                third_party = if excluded { ThirdParty::OnlyFirst } else { ThirdParty::OnlyThird };
                continue;
            }
            if name == "rewrite" {
                rewrite = value.map(|v| v.to_string());
                continue;
            }
            if name == "csp" {
                csp = value.map(|v| v.to_string());
                continue;
            }

            if let Some(bit) = ContentType::from_name(name) {
                if excluded {
                    content_type = content_type.remove(bit);
                } else {
                    if !seen_inclusion_type {
                        content_type = ContentType::NONE;
                        seen_inclusion_type = true;
                    }
                    content_type = content_type.union(bit);
                }
                continue;
            }

            return Err(FilterParseError::UnknownOption(name.to_string()));
        }
    }

    if domains.as_ref().is_some_and(|d| d.is_empty()) {
        domains = None;
    }

    Ok(ParsedNetworkFilter {
        kind: if is_whitelist { Kind::Whitelist } else { Kind::Blocking },
        pattern,
        regexp,
        match_case,
        content_type,
        third_party,
        domains,
        sitekeys,
        rewrite,
        csp,
    })
}

/// Whitelisting-only special types (`document`, `elemhide`, `generichide`,
/// `genericblock`) may only be carried by whitelist filters; reject them on
/// a blocking filter at construction time is a design choice left to the
/// caller (spec.md leaves invalid-combination handling as "yields an
/// invalid filter"); exposed here so `Filter::from_text` can apply it.
pub fn validate_whitelisting_types(kind: Kind, content_type: ContentType) -> Result<(), FilterParseError> {
    if kind == Kind::Blocking && content_type.intersects(WHITELISTING_TYPES) {
        return Err(FilterParseError::ConflictingOption(
            "whitelisting-only type used on a blocking filter".into(),
        ));
    }
    Ok(())
}
