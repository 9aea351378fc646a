//! Content-type bitmask: the closed enumeration of resource and special
//! types a filter can restrict itself to, and the three derived masks
//! dispatch depends on (`RESOURCE_TYPES`, `SPECIAL_TYPES`, `WHITELISTING_TYPES`).

use std::fmt;

/// A bitmask over the fixed content-type universe.
///
/// Bits `0..=13` are resource types, `14..=18` are special types. The
/// whitelisting types are a named subset of the special types that only
/// exception filters are expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentType(pub u32);

macro_rules! bits {
    ($($name:ident = $bit:expr),* $(,)?) => {
        $(pub const $name: ContentType = ContentType(1 << $bit);)*
    };
}

impl ContentType {
    bits! {
        OTHER = 0,
        SCRIPT = 1,
        IMAGE = 2,
        STYLESHEET = 3,
        OBJECT = 4,
        SUBDOCUMENT = 5,
        WEBSOCKET = 6,
        WEBRTC = 7,
        PING = 8,
        XMLHTTPREQUEST = 9,
        OBJECT_SUBREQUEST = 10,
        MEDIA = 11,
        FONT = 12,
        POPUP = 13,
        DOCUMENT = 14,
        ELEMHIDE = 15,
        GENERICHIDE = 16,
        GENERICBLOCK = 17,
        CSP = 18,
    }

    pub const NONE: ContentType = ContentType(0);

    /// Parse a filter-option or request-type name into its bit, e.g. "script",
    /// "document", "xmlhttprequest". Returns `None` for unrecognized names.
    pub fn from_name(name: &str) -> Option<ContentType> {
        Some(match name {
            "other" => Self::OTHER,
            "script" => Self::SCRIPT,
            "image" => Self::IMAGE,
            "stylesheet" => Self::STYLESHEET,
            "object" => Self::OBJECT,
            "subdocument" => Self::SUBDOCUMENT,
            "websocket" => Self::WEBSOCKET,
            "webrtc" => Self::WEBRTC,
            "ping" => Self::PING,
            "xmlhttprequest" => Self::XMLHTTPREQUEST,
            "object-subrequest" => Self::OBJECT_SUBREQUEST,
            "media" => Self::MEDIA,
            "font" => Self::FONT,
            "popup" => Self::POPUP,
            "document" => Self::DOCUMENT,
            "elemhide" => Self::ELEMHIDE,
            "generichide" => Self::GENERICHIDE,
            "genericblock" => Self::GENERICBLOCK,
            "csp" => Self::CSP,
            _ => return None,
        })
    }

    #[inline]
    pub fn union(self, other: ContentType) -> ContentType {
        ContentType(self.0 | other.0)
    }

    #[inline]
    pub fn intersects(self, other: ContentType) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn contains(self, other: ContentType) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn remove(self, other: ContentType) -> ContentType {
        ContentType(self.0 & !other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True iff exactly one bit is set.
    #[inline]
    pub fn is_single_bit(self) -> bool {
        self.0 != 0 && self.0 & (self.0 - 1) == 0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Union of all resource-type bits.
pub const RESOURCE_TYPES: ContentType = ContentType(
    ContentType::OTHER.0
        | ContentType::SCRIPT.0
        | ContentType::IMAGE.0
        | ContentType::STYLESHEET.0
        | ContentType::OBJECT.0
        | ContentType::SUBDOCUMENT.0
        | ContentType::WEBSOCKET.0
        | ContentType::WEBRTC.0
        | ContentType::PING.0
        | ContentType::XMLHTTPREQUEST.0
        | ContentType::OBJECT_SUBREQUEST.0
        | ContentType::MEDIA.0
        | ContentType::FONT.0
        | ContentType::POPUP.0,
);

/// Union of all special-type bits (everything not a resource type).
pub const SPECIAL_TYPES: ContentType = ContentType(
    ContentType::DOCUMENT.0
        | ContentType::ELEMHIDE.0
        | ContentType::GENERICHIDE.0
        | ContentType::GENERICBLOCK.0
        | ContentType::CSP.0,
);

/// Subset of special types that only whitelist (exception) filters carry.
pub const WHITELISTING_TYPES: ContentType = ContentType(
    ContentType::DOCUMENT.0
        | ContentType::ELEMHIDE.0
        | ContentType::GENERICHIDE.0
        | ContentType::GENERICBLOCK.0,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_and_special_are_disjoint() {
        assert_eq!(RESOURCE_TYPES.0 & SPECIAL_TYPES.0, 0);
    }

    #[test]
    fn whitelisting_is_subset_of_special() {
        assert!(SPECIAL_TYPES.contains(WHITELISTING_TYPES));
    }

    #[test]
    fn single_bit_detection() {
        assert!(ContentType::SCRIPT.is_single_bit());
        assert!(!ContentType::NONE.is_single_bit());
        assert!(!ContentType::SCRIPT.union(ContentType::IMAGE).is_single_bit());
    }

    #[test]
    fn from_name_round_trip() {
        assert_eq!(ContentType::from_name("script"), Some(ContentType::SCRIPT));
        assert_eq!(ContentType::from_name("xhr"), None);
    }
}
