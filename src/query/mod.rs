// Copyright (c) 2025 - Cowboy AI, Inc.
//! Query Language
//!
//! A [`Query`] is an immutable, ordered list of fragments describing a
//! traversal independent of any storage engine:
//!
//! ```text
//! Query::path()                                cursor: all entities
//!     .with([Filter::of_type(Tenant), Filter::id("acme")])
//!     .with([Related::contains()])             cursor: children of acme
//!     .filter()
//!     .with([Filter::of_type(Environment)])    narrowed to environments
//!     .build()
//! ```
//!
//! - **Path fragments** move the cursor (relationship following)
//! - **Filter fragments** narrow the cursor without moving it
//! - `SwitchElementType` and `Recurse` move the cursor either way
//! - `Noop` starts a new alternative group over the cursor at the first
//!   `Noop`; the results of all groups are unioned
//!
//! Queries never refer to backend-native identifiers and compare
//! structurally, fragment by fragment.

pub mod filter;
pub mod pager;

pub use filter::{EdgeEnd, EntityRole, Filter, Related, SwitchElementType};
pub use pager::{Order, Page, Pager, SortDirection};

use serde::{Deserialize, Serialize};

/// One step of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFragment {
    Path(Filter),
    Filter(Filter),
}

impl QueryFragment {
    pub fn filter(&self) -> &Filter {
        match self {
            QueryFragment::Path(f) | QueryFragment::Filter(f) => f,
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, QueryFragment::Path(_))
    }
}

/// Backend-independent traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Query {
    fragments: Vec<QueryFragment>,
}

impl Query {
    /// The query matching its starting set unchanged
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Builder in path mode
    pub fn path() -> QueryBuilder {
        Self::builder().path()
    }

    /// Builder in filter mode
    pub fn filter() -> QueryBuilder {
        Self::builder().filter()
    }

    pub fn fragments(&self) -> &[QueryFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// This query followed by `other`
    pub fn extend(&self, other: &Query) -> Query {
        let mut fragments = self.fragments.clone();
        fragments.extend(other.fragments.iter().cloned());
        Query { fragments }
    }

    /// A builder continuing from this query's fragments
    pub fn modified(&self) -> QueryBuilder {
        QueryBuilder {
            fragments: self.fragments.clone(),
            mode: Mode::Path,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Path,
    Filter,
}

/// Builder for [`Query`]
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    fragments: Vec<QueryFragment>,
    mode: Mode,
}

impl QueryBuilder {
    /// Following `with` calls add path fragments
    pub fn path(mut self) -> Self {
        self.mode = Mode::Path;
        self
    }

    /// Following `with` calls add filter fragments
    pub fn filter(mut self) -> Self {
        self.mode = Mode::Filter;
        self
    }

    /// Append fragments in the current mode
    pub fn with<I, F>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Filter>,
    {
        let mode = self.mode;
        self.fragments
            .extend(filters.into_iter().map(Into::into).map(|f| match mode {
                Mode::Path => QueryFragment::Path(f),
                Mode::Filter => QueryFragment::Filter(f),
            }));
        self
    }

    /// Union of independent filter groups over the current cursor
    ///
    /// An empty slice adds nothing. Alternatives extend to the end of the
    /// query.
    pub fn alternatives(mut self, groups: &[Vec<Filter>]) -> Self {
        for group in groups {
            self.fragments.push(QueryFragment::Filter(Filter::Noop));
            self.fragments
                .extend(group.iter().cloned().map(QueryFragment::Filter));
        }
        self
    }

    /// Append another query's fragments verbatim
    pub fn extend(mut self, other: &Query) -> Self {
        self.fragments.extend(other.fragments.iter().cloned());
        self
    }

    pub fn build(self) -> Query {
        Query {
            fragments: self.fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::SegmentType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_structural_equality_across_call_chains() {
        let direct = Query::path()
            .with([Filter::of_type(SegmentType::Resource), Filter::id("id")])
            .build();
        let split = Query::builder()
            .path()
            .with([Filter::of_type(SegmentType::Resource)])
            .filter()
            .path()
            .with([Filter::id("id")])
            .build();
        assert_eq!(direct, split);

        let prefixed = Query::path()
            .with([Filter::of_type(SegmentType::Resource)])
            .build()
            .modified()
            .with([Filter::id("id")])
            .build();
        assert_eq!(direct, prefixed);
    }

    #[test]
    fn test_modes_differ() {
        let as_path = Query::path().with([Filter::id("x")]).build();
        let as_filter = Query::filter().with([Filter::id("x")]).build();
        assert_ne!(as_path, as_filter);
    }

    #[test]
    fn test_alternatives_layout() {
        let query = Query::builder()
            .alternatives(&[vec![Filter::id("a")], vec![Filter::id("b"), Filter::name("n")]])
            .build();
        assert_eq!(
            query.fragments(),
            &[
                QueryFragment::Filter(Filter::Noop),
                QueryFragment::Filter(Filter::id("a")),
                QueryFragment::Filter(Filter::Noop),
                QueryFragment::Filter(Filter::id("b")),
                QueryFragment::Filter(Filter::name("n")),
            ]
        );
    }

    #[test]
    fn test_extend_concatenates() {
        let a = Query::path().with([Related::contains()]).build();
        let b = Query::filter().with([Filter::name("x")]).build();
        let joined = a.extend(&b);
        assert_eq!(joined.fragments().len(), 2);
        assert_eq!(joined, Query::builder().extend(&a).extend(&b).build());
    }
}
