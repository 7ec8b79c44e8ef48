//! # Header Matching Module
//!
//! Declarative patterns that identify which spreadsheet column holds a logical field, and the
//! resolver that binds them to the columns of an actual header row.
use crate::error::RefineryError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use regex::Regex;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;
use thiserror::Error;

pub mod resolver;

/// Errors raised while composing header matchers.
#[derive(Error, Debug, PartialEq)]
pub enum HeaderError {
    #[error("Merged header representative '{0}' cannot be an ordered matcher")]
    OrderedRepresentative(String),

    #[error("Header matcher needs at least one pattern")]
    EmptyPatterns,
}

/// A pattern identifying a header column.
#[derive(Clone, Debug)]
pub enum HeaderMatcher {
    /// Trimmed cell text equals the text exactly.
    Exact(String),
    /// Trimmed cell text contains any pattern, case-insensitively.
    Substring(Vec<String>),
    /// A string cell matches any regex somewhere in its value.
    Regex(Vec<Regex>),
    /// Competes for duplicate headers; lower priority picks first.
    Ordered(OrderedMatcher),
    /// A merged header spanning one column per sub-matcher.
    Merged(MergedMatcher),
}

#[derive(Clone, Debug)]
pub struct OrderedMatcher {
    inner: Box<HeaderMatcher>,
    priority: i32,
}

impl OrderedMatcher {
    pub fn inner(&self) -> &HeaderMatcher {
        &self.inner
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

#[derive(Clone, Debug)]
pub struct MergedMatcher {
    representative: Box<HeaderMatcher>,
    sub_matchers: Vec<HeaderMatcher>,
}

impl MergedMatcher {
    pub fn representative(&self) -> &HeaderMatcher {
        &self.representative
    }

    /// Matchers of the merged sub-columns, left to right.
    pub fn sub_matchers(&self) -> &[HeaderMatcher] {
        &self.sub_matchers
    }
}

impl HeaderMatcher {
    pub fn exact(text: &str) -> Self {
        Self::Exact(text.to_owned())
    }

    pub fn substring(pattern: &str) -> Self {
        Self::Substring(vec![pattern.to_lowercase()])
    }

    pub fn substrings<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RefineryError> {
        if patterns.is_empty() {
            Err(HeaderError::EmptyPatterns)?
        }
        Ok(Self::Substring(patterns.iter().map(|it| it.as_ref().to_lowercase()).collect()))
    }

    pub fn regex(pattern: &str) -> Result<Self, RefineryError> {
        Self::regexes(&[pattern])
    }

    pub fn regexes<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RefineryError> {
        if patterns.is_empty() {
            Err(HeaderError::EmptyPatterns)?
        }
        let patterns = patterns
            .iter()
            .map(|pattern| Regex::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Regex(patterns))
    }

    pub fn ordered(inner: HeaderMatcher, priority: i32) -> Self {
        Self::Ordered(OrderedMatcher { inner: Box::new(inner), priority })
    }

    /// Builds a merged header matcher. The representative cannot be ordered.
    pub fn merged(representative: HeaderMatcher, sub_matchers: Vec<HeaderMatcher>) -> Result<Self, HeaderError> {
        if let HeaderMatcher::Ordered(_) = representative {
            return Err(HeaderError::OrderedRepresentative(representative.name().to_owned()));
        }
        Ok(Self::Merged(MergedMatcher {
            representative: Box::new(representative),
            sub_matchers,
        }))
    }

    /// Returns true if the header cell satisfies this matcher.
    pub fn matches(&self, cell: &Cell) -> bool {
        match self {
            Self::Exact(text) => cell.to_string().trim() == text,
            Self::Substring(patterns) => {
                let text = cell.to_string().trim().to_lowercase();
                patterns.iter().any(|pattern| text.contains(pattern.as_str()))
            }
            Self::Regex(patterns) => match cell.string_value() {
                Some(text) if cell.effective_type() == CellType::String => {
                    patterns.iter().any(|pattern| pattern.is_match(text))
                }
                _ => false,
            },
            Self::Ordered(ordered) => ordered.inner.matches(cell),
            Self::Merged(merged) => merged.representative.matches(cell),
        }
    }

    /// Human-readable name: the first pattern of the innermost matcher.
    pub fn name(&self) -> &str {
        match self {
            Self::Exact(text) => text,
            Self::Substring(patterns) => patterns.first().map(String::as_str).unwrap_or_default(),
            Self::Regex(patterns) => patterns.first().map(Regex::as_str).unwrap_or_default(),
            Self::Ordered(ordered) => ordered.inner.name(),
            Self::Merged(merged) => merged.representative.name(),
        }
    }

    pub fn priority(&self) -> Option<i32> {
        match self {
            Self::Ordered(ordered) => Some(ordered.priority),
            _ => None,
        }
    }
}

impl PartialEq for HeaderMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Substring(a), Self::Substring(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.iter().map(Regex::as_str).eq(b.iter().map(Regex::as_str)),
            (Self::Ordered(a), Self::Ordered(b)) => a.priority == b.priority && a.inner == b.inner,
            (Self::Merged(a), Self::Merged(b)) => {
                a.representative == b.representative && a.sub_matchers == b.sub_matchers
            }
            _ => false,
        }
    }
}

impl Eq for HeaderMatcher {}

impl Hash for HeaderMatcher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Exact(text) => text.hash(state),
            Self::Substring(patterns) => patterns.hash(state),
            Self::Regex(patterns) => patterns.iter().for_each(|pattern| pattern.as_str().hash(state)),
            Self::Ordered(ordered) => {
                ordered.priority.hash(state);
                ordered.inner.hash(state);
            }
            Self::Merged(merged) => {
                merged.representative.hash(state);
                merged.sub_matchers.hash(state);
            }
        }
    }
}

impl Display for HeaderMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(text) => write!(f, "exact({text})"),
            Self::Substring(patterns) => write!(f, "substring({})", patterns.join("|")),
            Self::Regex(patterns) => {
                let patterns: Vec<&str> = patterns.iter().map(Regex::as_str).collect();
                write!(f, "regex({})", patterns.join("|"))
            }
            Self::Ordered(ordered) => write!(f, "{}#{}", ordered.inner, ordered.priority),
            Self::Merged(merged) => {
                let subs: Vec<String> = merged.sub_matchers.iter().map(ToString::to_string).collect();
                write!(f, "{}[{}]", merged.representative, subs.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_trimmed_text_of_any_type() {
        let matcher = HeaderMatcher::exact("Total");
        assert!(matcher.matches(&Cell::new(0, 0, "  Total ")));
        assert!(!matcher.matches(&Cell::new(0, 0, "total")));
        assert!(HeaderMatcher::exact("2021").matches(&Cell::new(0, 0, 2021.0)));
    }

    #[test]
    fn substring_is_case_insensitive() {
        let matcher = HeaderMatcher::substrings(&["Price", "cost"]).unwrap();
        assert!(matcher.matches(&Cell::new(0, 0, "Unit PRICE (USD)")));
        assert!(matcher.matches(&Cell::new(0, 0, "Cost")));
        assert!(!matcher.matches(&Cell::new(0, 0, "Quantity")));
        assert!(HeaderMatcher::substrings::<&str>(&[]).is_err());
    }

    #[test]
    fn regex_only_matches_string_cells() {
        let matcher = HeaderMatcher::regex(r"^\d+$").unwrap();
        assert!(matcher.matches(&Cell::new(0, 0, "2021")));
        assert!(!matcher.matches(&Cell::new(0, 0, 2021.0)));
        assert!(!matcher.matches(&Cell::new(0, 0, true)));
        assert!(HeaderMatcher::regex("(").is_err());
    }

    #[test]
    fn wrappers_delegate_to_inner_matcher() {
        let ordered = HeaderMatcher::ordered(HeaderMatcher::exact("name"), 1);
        assert!(ordered.matches(&Cell::new(0, 0, "name")));
        assert_eq!(ordered.priority(), Some(1));
        assert_eq!(ordered.name(), "name");

        let merged = HeaderMatcher::merged(
            HeaderMatcher::substring("period"),
            vec![HeaderMatcher::exact("from"), HeaderMatcher::exact("to")],
        )
        .unwrap();
        assert!(merged.matches(&Cell::new(0, 0, "Reporting Period")));
        assert!(!merged.matches(&Cell::new(0, 0, "from")));
    }

    #[test]
    fn merged_rejects_ordered_representative() {
        let error = HeaderMatcher::merged(HeaderMatcher::ordered(HeaderMatcher::exact("a"), 1), vec![]).unwrap_err();
        assert_eq!(error, HeaderError::OrderedRepresentative("a".to_owned()));
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(HeaderMatcher::regex("a+").unwrap(), HeaderMatcher::regex("a+").unwrap());
        assert_ne!(
            HeaderMatcher::ordered(HeaderMatcher::exact("a"), 1),
            HeaderMatcher::ordered(HeaderMatcher::exact("a"), 2)
        );
        assert_eq!(HeaderMatcher::ordered(HeaderMatcher::exact("a"), 2).to_string(), "exact(a)#2");
    }
}
