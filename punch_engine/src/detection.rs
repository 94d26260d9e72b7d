//! Tracked-link detection.
//!
//! Case-insensitive substring containment against an ordered domain
//! list. No URL parsing and no domain-boundary checks: "ubereats.com"
//! inside any longer word still counts.

/// Ordered set of tracked domain substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDetector {
    domains: Vec<String>, // lowercased, configured order, no empties
}

impl LinkDetector {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// First tracked domain (in configured order) contained in `content`.
    ///
    /// Short-circuits on the first match, so a message yields at most
    /// one match no matter how many links it carries.
    pub fn detect(&self, content: &str) -> Option<&str> {
        let haystack = content.to_lowercase();
        self.domains
            .iter()
            .find(|domain| haystack.contains(domain.as_str()))
            .map(String::as_str)
    }

    /// Like `detect`, but bot-authored messages never match.
    pub fn detect_message(&self, author_is_bot: bool, content: &str) -> Option<&str> {
        if author_is_bot {
            return None;
        }
        self.detect(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> LinkDetector {
        LinkDetector::new(["ubereats.com", "doordash.com", "grubhub.com"])
    }

    #[test]
    fn matches_case_insensitively() {
        assert_eq!(
            detector().detect("order here: https://UberEats.com/abc"),
            Some("ubereats.com")
        );
    }

    #[test]
    fn matches_inside_other_words() {
        assert_eq!(detector().detect("notgrubhub.company"), Some("grubhub.com"));
    }

    #[test]
    fn first_configured_domain_wins() {
        assert_eq!(
            detector().detect("doordash.com/x and ubereats.com/y"),
            Some("ubereats.com")
        );
    }

    #[test]
    fn bots_never_match() {
        assert_eq!(detector().detect_message(true, "ubereats.com/abc"), None);
        assert_eq!(
            detector().detect_message(false, "ubereats.com/abc"),
            Some("ubereats.com")
        );
    }

    #[test]
    fn plain_text_does_not_match() {
        assert_eq!(detector().detect("ordering uber eats tonight"), None);
    }

    #[test]
    fn configured_domains_are_normalised() {
        let d = LinkDetector::new(["  DoorDash.com ", ""]);
        assert_eq!(d.domains(), ["doordash.com".to_string()]);
    }
}
