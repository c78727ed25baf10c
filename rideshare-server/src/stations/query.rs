//! Validated free-text station queries.

use std::fmt;

/// Minimum number of characters in a station query.
pub const MIN_QUERY_CHARS: usize = 2;

/// Minimum length of a query word to be matched on its own.
const MIN_TOKEN_CHARS: usize = 3;

/// Error returned when a query is too short to search with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("query must be at least {} characters", MIN_QUERY_CHARS)]
pub struct InvalidQuery;

/// A trimmed free-text query of at least [`MIN_QUERY_CHARS`] characters.
///
/// # Examples
///
/// ```
/// use rideshare_server::stations::SearchText;
///
/// let q = SearchText::parse("  Rabat EMI ").unwrap();
/// assert_eq!(q.as_str(), "Rabat EMI");
/// assert_eq!(q.tokens(), vec!["rabat", "emi"]);
///
/// assert!(SearchText::parse(" a ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SearchText(String);

impl SearchText {
    pub fn parse(s: &str) -> Result<Self, InvalidQuery> {
        let trimmed = s.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            return Err(InvalidQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form, used for matching and cache keys.
    pub fn normalized(&self) -> String {
        self.0.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    /// Lowercased words longer than two characters.
    ///
    /// Lets multi-word input like "Rabat EMI" match stations that contain
    /// only one of the words.
    pub fn tokens(&self) -> Vec<String> {
        self.0
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
            .map(str::to_lowercase)
            .collect()
    }
}

impl fmt::Debug for SearchText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchText({:?})", self.0)
    }
}

impl fmt::Display for SearchText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
