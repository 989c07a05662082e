/// Country names whose postings are never admitted. Terms overlap on purpose
/// ("arabia" / "saudi arabia"); keep the list verbatim.
pub const BLOCKED_COUNTRIES: &[&str] = &[
    "indian",
    "india",
    "uae",
    "emirates",
    "bahrain",
    "kuwait",
    "oman",
    "qatar",
    "saudi arabia",
    "arabia",
    "united arab emirates",
];

/// First blocklist term found in `url`, case-insensitively.
pub fn blocked_term(url: &str) -> Option<&'static str> {
    let haystack = url.to_lowercase();
    BLOCKED_COUNTRIES
        .iter()
        .copied()
        .find(|term| haystack.contains(term))
}

pub fn admit(url: &str) -> bool {
    blocked_term(url).is_none()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_uae_posting() {
        assert!(!admit("https://site/jobs/Dubai-UAE-engineer"));
        assert_eq!(blocked_term("https://site/jobs/Dubai-UAE-engineer"), Some("uae"));
    }

    #[test]
    fn admits_unlisted_country() {
        assert!(admit("https://site/jobs/Germany-engineer"));
        assert_eq!(blocked_term("https://site/jobs/Germany-engineer"), None);
    }

    #[test]
    fn first_matching_term_wins() {
        // "indian" precedes "india" in the list
        assert_eq!(blocked_term("https://site/jobs/indian-chef/"), Some("indian"));
        assert_eq!(blocked_term("https://site/jobs/SAUDI ARABIA driver/"), Some("saudi arabia"));
        assert_eq!(blocked_term("https://site/jobs/saudi-arabia-driver/"), Some("arabia"));
    }

    #[test]
    fn matches_anywhere_in_url() {
        assert!(!admit("https://qatar.example.com/jobs/welder/"));
        assert!(!admit("https://site/jobs/welder/?loc=Kuwait"));
        // substring semantics: "romania" contains "oman"
        assert!(!admit("https://site/jobs/romania-nurse/"));
    }

    #[test]
    fn every_term_blocks_itself() {
        for term in BLOCKED_COUNTRIES {
            let url = format!("https://site/jobs/{}/", term.to_uppercase());
            assert!(!admit(&url), "{} was admitted", url);
        }
    }
}
