use crate::header::HeaderMatcher;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::merged::MergedCells;
use crate::spreadsheet::Row;
use std::collections::BTreeSet;

/// Matcher to column bindings of one header row.
///
/// Merged matchers never appear as keys: they are expanded into one entry per sub-matcher.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnIndexMap {
    entries: Vec<(HeaderMatcher, usize)>,
}

impl ColumnIndexMap {
    fn insert(&mut self, matcher: HeaderMatcher, col: usize) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == matcher) {
            Some(entry) => entry.1 = col,
            None => self.entries.push((matcher, col)),
        }
    }

    /// Returns the column bound to the matcher.
    pub fn get(&self, matcher: &HeaderMatcher) -> Option<usize> {
        self.entries.iter().find(|(existing, _)| existing == matcher).map(|(_, col)| *col)
    }

    /// Every column claimed by some matcher.
    pub fn columns(&self) -> BTreeSet<usize> {
        self.entries.iter().map(|(_, col)| *col).collect()
    }

    /// Bindings ordered by column.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderMatcher, usize)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(matcher, col)| (matcher, *col)).collect();
        entries.sort_by_key(|(_, col)| *col);
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides whether rows are header rows and binds header matchers to columns.
#[derive(Clone, Copy, Debug)]
pub struct HeaderRowResolver<'a> {
    merged: &'a MergedCells<'a>,
}

impl<'a> HeaderRowResolver<'a> {
    pub fn new(merged: &'a MergedCells<'a>) -> Self {
        Self { merged }
    }

    /// Physical cells of the row, each replaced by its merged representative when that
    /// representative lives in the same column.
    ///
    /// Only vertical merges carry a header down. The trailing cells of a horizontal merge keep
    /// their own (usually blank) content, so a header text binds once per merged block; use a
    /// merged matcher to name the columns it spans.
    fn header_cells<'r>(&'r self, row: &'r Row) -> impl Iterator<Item = &'r Cell> + 'r {
        row.cells().iter().map(move |cell| match self.merged.get(row.index(), cell.col) {
            Some(representative) if representative.col == cell.col => representative,
            _ => cell,
        })
    }

    /// True iff every required matcher matches at least one cell of the row.
    pub fn is_header_row(&self, row: &Row, required: &[HeaderMatcher]) -> bool {
        required
            .iter()
            .all(|matcher| self.header_cells(row).any(|cell| matcher.matches(cell)))
    }

    /// Binds matchers to the columns of the header row.
    pub fn resolve(&self, row: &Row, matchers: &[HeaderMatcher]) -> ColumnIndexMap {
        let (ordered, unordered): (Vec<&HeaderMatcher>, Vec<&HeaderMatcher>) =
            matchers.iter().partition(|matcher| matches!(matcher, HeaderMatcher::Ordered(_)));

        let mut bindings = self.resolve_ordered(row, ordered);
        bindings.extend(self.resolve_unordered(row, unordered));

        let mut map = ColumnIndexMap::default();
        for (matcher, col) in bindings {
            let expanded = match matcher {
                HeaderMatcher::Ordered(ordered) => ordered.inner(),
                other => other,
            };
            match expanded {
                HeaderMatcher::Merged(merged) => {
                    for (offset, sub_matcher) in merged.sub_matchers().iter().enumerate() {
                        map.insert(sub_matcher.clone(), col + offset);
                    }
                }
                _ => map.insert(matcher.clone(), col),
            }
        }
        map
    }

    /// Lower priority values pick first.
    fn resolve_ordered<'m>(&self, row: &Row, mut matchers: Vec<&'m HeaderMatcher>) -> Vec<(&'m HeaderMatcher, usize)> {
        matchers.sort_by_key(|matcher| matcher.priority());
        self.resolve_unordered(row, matchers)
    }

    /// Walks cells left to right; each cell binds the first matching matcher not bound yet.
    fn resolve_unordered<'m>(&self, row: &Row, matchers: Vec<&'m HeaderMatcher>) -> Vec<(&'m HeaderMatcher, usize)> {
        let mut bound = vec![false; matchers.len()];
        let mut bindings = Vec::new();
        for cell in self.header_cells(row) {
            let candidate = matchers
                .iter()
                .enumerate()
                .find(|(i, matcher)| !bound[*i] && matcher.matches(cell));
            if let Some((i, matcher)) = candidate {
                bound[i] = true;
                bindings.push((*matcher, cell.col));
            }
        }
        bindings
    }
}
