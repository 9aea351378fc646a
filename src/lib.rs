//! adfilter - a keyword- and domain-partitioned URL filter matching engine
//! for ad-blockers.
//!
//! Filter-list text is parsed into [`Filter`] values, added to a
//! [`CombinedMatcher`] (or its thread-safe wrapper, [`SyncCombinedMatcher`]),
//! and queried against [`URLRequest`] views of individual network requests.
//! See `DESIGN.md` for how each module is grounded and `SPEC_FULL.md` for the
//! full behavioral specification this crate implements.

pub mod cli_config;
pub mod combined_matcher;
pub mod compiled_patterns;
pub mod content_type;
pub mod domain;
pub mod error;
pub mod filter;
pub mod filters_by_domain;
pub mod keyword;
pub mod lru;
pub mod matcher;
pub mod parse;
pub mod request;
pub mod sync;

pub use combined_matcher::{CombinedMatcher, FilterType};
pub use content_type::ContentType;
pub use error::FilterParseError;
pub use filter::{from_text, parse_filter_text, Filter, FilterCache, Kind};
pub use matcher::Matcher;
pub use request::{ThirdParty, URLRequest};
pub use sync::SyncCombinedMatcher;
