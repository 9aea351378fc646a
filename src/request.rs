//! `URLRequest`: a derived, cache-friendly view of a URL request (spec.md
//! §3, §6). Lifetime is one match call; it is cheap to build and carries no
//! state beyond what a single query needs.

/// Tri-state third-party relationship between the request URL and the
/// document domain (spec.md §3 `Filter.thirdParty`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThirdParty {
    Any,
    OnlyThird,
    OnlyFirst,
}

impl ThirdParty {
    /// True iff a filter carrying `self` (the filter's restriction) allows a
    /// request whose actual third-party-ness is `actual`.
    pub fn matches(self, actual: bool) -> bool {
        match self {
            ThirdParty::Any => true,
            ThirdParty::OnlyThird => actual,
            ThirdParty::OnlyFirst => !actual,
        }
    }
}

/// A parsed, lowercase-aware view of a single network request.
#[derive(Debug, Clone)]
pub struct URLRequest {
    pub href: String,
    pub lower_case_href: String,
    pub document_hostname: String,
    pub third_party: bool,
}

impl URLRequest {
    /// Build a request view. `document_hostname` is lowercased and has any
    /// trailing dot trimmed. `third_party` is computed by the caller via the
    /// registrable-domain relation (an external collaborator, spec.md §6) —
    /// passed in directly here rather than recomputed.
    pub fn new(href: &str, document_hostname: &str, third_party: bool) -> Self {
        let lower_case_href = href.to_ascii_lowercase();
        let document_hostname = document_hostname.to_ascii_lowercase();
        let document_hostname = document_hostname.strip_suffix('.').unwrap_or(&document_hostname).to_string();
        URLRequest { href: href.to_string(), lower_case_href, document_hostname, third_party }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims_trailing_dot() {
        let req = URLRequest::new("https://A.com/Path", "Example.com.", false);
        assert_eq!(req.lower_case_href, "https://a.com/path");
        assert_eq!(req.document_hostname, "example.com");
        assert_eq!(req.href, "https://A.com/Path");
    }

    #[test]
    fn third_party_tri_state() {
        assert!(ThirdParty::Any.matches(true));
        assert!(ThirdParty::Any.matches(false));
        assert!(ThirdParty::OnlyThird.matches(true));
        assert!(!ThirdParty::OnlyThird.matches(false));
        assert!(ThirdParty::OnlyFirst.matches(false));
        assert!(!ThirdParty::OnlyFirst.matches(true));
    }
}
