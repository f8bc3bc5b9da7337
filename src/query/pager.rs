// Copyright (c) 2025 - Cowboy AI, Inc.
//! Paging
//!
//! A [`Pager`] selects one page of an ordered result. Ordering and the
//! offset/limit are applied after every filter, so
//! [`Page::total_size`] counts filtered results only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort key
///
/// `id`, `name` and `path` are the element's own fields; any other name
/// refers to a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub direction: SortDirection,
}

impl Order {
    pub const ID: &'static str = "id";
    pub const NAME: &'static str = "name";
    pub const PATH: &'static str = "path";

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Ascending by canonical path
    pub fn unspecified() -> Self {
        Self::asc(Self::PATH)
    }
}

/// Which page of the result to return
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pager {
    pub page_index: usize,
    /// `None` returns everything from the offset on
    pub page_size: Option<usize>,
    #[serde(default)]
    pub order: Vec<Order>,
}

impl Pager {
    pub fn unlimited() -> Self {
        Self {
            page_index: 0,
            page_size: None,
            order: Vec::new(),
        }
    }

    /// At most one element
    pub fn single() -> Self {
        Self::page(0, 1)
    }

    pub fn page(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size: Some(page_size),
            order: Vec::new(),
        }
    }

    pub fn ordered_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn is_limited(&self) -> bool {
        self.page_size.is_some()
    }

    /// Index of the first element on this page
    pub fn offset(&self) -> usize {
        self.page_size
            .map(|size| size.saturating_mul(self.page_index))
            .unwrap_or(0)
    }

    /// Select this page from already filtered and ordered items
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skipped = items.into_iter().skip(self.offset());
        match self.page_size {
            Some(size) => skipped.take(size).collect(),
            None => skipped.collect(),
        }
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// One page of results
///
/// A single-pass cursor. Dropping or closing it early releases the
/// underlying iterator.
pub struct Page<T> {
    items: Option<Box<dyn Iterator<Item = T> + Send>>,
    pager: Pager,
    total_size: usize,
}

impl<T: Send + 'static> Page<T> {
    pub fn new(items: Vec<T>, pager: Pager, total_size: usize) -> Self {
        Self {
            items: Some(Box::new(items.into_iter())),
            pager,
            total_size,
        }
    }

    pub fn empty(pager: Pager) -> Self {
        Self::new(Vec::new(), pager, 0)
    }

    /// Convert every remaining item, keeping paging information
    pub fn map<U, F>(mut self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U + Send + 'static,
        U: Send + 'static,
    {
        let items = self
            .items
            .take()
            .map(|it| Box::new(it.map(f)) as Box<dyn Iterator<Item = U> + Send>);
        Page {
            items,
            pager: self.pager.clone(),
            total_size: self.total_size,
        }
    }
}

impl<T> Page<T> {
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Number of results across all pages
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Release the cursor; further iteration yields nothing
    pub fn close(&mut self) {
        self.items = None;
    }

    pub fn is_closed(&self) -> bool {
        self.items.is_none()
    }
}

impl<T> Iterator for Page<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.items.as_mut()?.next()
    }
}

impl<T> fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("pager", &self.pager)
            .field("total_size", &self.total_size)
            .field("closed", &self.is_closed())
            .finish()
    }
}
