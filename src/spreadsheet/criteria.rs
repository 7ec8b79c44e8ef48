use crate::error::RefineryError;
use crate::error::ResultMessage;
use glob::Pattern;
use std::fmt::Debug;

/// Caller-supplied sheet predicate. An error aborts the whole workbook scan.
pub type SheetPredicate = Box<dyn Fn(&str) -> anyhow::Result<bool>>;

/// Criteria for selecting which sheets a sheet definition applies to.
#[derive(Default)]
pub enum SheetFilter {
    /// Accepts every sheet.
    #[default]
    All,
    /// Sheet name patterns; a sheet is accepted if any pattern matches.
    Patterns(Vec<Pattern>),
    /// Arbitrary, fallible predicate over the sheet name.
    Predicate(SheetPredicate),
}

impl SheetFilter {
    /// Builds a filter from shell-style patterns such as "Report*".
    pub fn patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, RefineryError> {
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern.as_ref()).map_err(RefineryError::from))
            .collect::<Result<Vec<_>, _>>();
        Ok(Self::Patterns(patterns.with_prefix("Invalid sheet name pattern")?))
    }

    /// Accepts only the sheet with exactly this name.
    pub fn name(name: &str) -> Self {
        Self::Patterns(vec![Pattern::new(&Pattern::escape(name)).expect("Escaped pattern")])
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<bool> + 'static,
    {
        Self::Predicate(Box::new(predicate))
    }

    /// Checks if a sheet name matches the criteria.
    pub fn accept(&self, sheet_name: &str) -> anyhow::Result<bool> {
        match self {
            Self::All => Ok(true),
            Self::Patterns(patterns) => Ok(patterns.iter().any(|pattern| pattern.matches(sheet_name))),
            Self::Predicate(predicate) => predicate(sheet_name),
        }
    }
}

impl Debug for SheetFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Patterns(patterns) => f.debug_tuple("Patterns").field(patterns).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}
