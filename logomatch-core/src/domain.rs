// Domain identifiers and the validated input set

use crate::error::{GroupError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

/// A trimmed, non-empty domain name without whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Normalize a raw entry. Returns `None` for empty or whitespace-bearing input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Domain(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Domain {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The domains submitted for one run: validated, deduplicated, never empty.
///
/// Order of first appearance is kept but carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSet {
    domains: Vec<Domain>,
}

impl DomainSet {
    /// Validate a raw collection. Any malformed entry or an empty collection
    /// is rejected before any work starts.
    pub fn new<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut domains = Vec::new();

        for (index, entry) in raw.into_iter().enumerate() {
            let entry = entry.as_ref();
            let domain = Domain::parse(entry).ok_or_else(|| GroupError::MalformedDomain {
                index,
                value: entry.to_string(),
            })?;
            if seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }

        if domains.is_empty() {
            return Err(GroupError::EmptyInput);
        }

        Ok(Self { domains })
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.iter()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d.as_str() == domain)
    }
}

impl<'a> IntoIterator for &'a DomainSet {
    type Item = &'a Domain;
    type IntoIter = std::slice::Iter<'a, Domain>;

    fn into_iter(self) -> Self::IntoIter {
        self.domains.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse_trims() {
        let domain = Domain::parse("  example.com\t").unwrap();
        assert_eq!(domain.as_str(), "example.com");
    }

    #[test]
    fn test_domain_parse_rejects_blank_and_inner_space() {
        assert!(Domain::parse("").is_none());
        assert!(Domain::parse("   ").is_none());
        assert!(Domain::parse("exa mple.com").is_none());
    }

    #[test]
    fn test_domain_set_dedups_keeping_first_order() {
        let set = DomainSet::new(["b.com", "a.com", " b.com ", "c.com"]).unwrap();
        let names: Vec<&str> = set.iter().map(Domain::as_str).collect();
        assert_eq!(names, vec!["b.com", "a.com", "c.com"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_domain_set_empty_is_error() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(DomainSet::new(empty), Err(GroupError::EmptyInput)));
    }

    #[test]
    fn test_domain_set_malformed_entry_is_error() {
        let result = DomainSet::new(["a.com", "   ", "b.com"]);
        match result {
            Err(GroupError::MalformedDomain { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected MalformedDomain, got {:?}", other),
        }
    }
}
