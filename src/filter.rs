//! Search and pagination over a fetched collection.
//!
//! Everything is derived on demand from the store's items; the engine only
//! owns the query and the requested page.
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::error::FieldError;
use crate::model::Resource;

/// Per-field search text. Blank fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    fields: BTreeMap<&'static str, String>,
}

impl SearchQuery {
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }

    /// A record matches when any non-blank query field is contained,
    /// case-insensitively, in the record's field of the same name.
    pub fn matches<R: Resource>(&self, item: &R) -> bool {
        let mut active = self
            .fields
            .iter()
            .filter(|(_, q)| !q.trim().is_empty())
            .peekable();
        if active.peek().is_none() {
            return true;
        }
        active.any(|(name, q)| {
            let needle = q.to_lowercase();
            item.field(name)
                .map_or(false, |v| v.to_lowercase().contains(&needle))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// One rendered page.
#[derive(Debug)]
pub struct Page<'a, R> {
    pub items: Vec<&'a R>,
    pub filtered_count: usize,
    pub state: PaginationState,
}

/// Keep matching items, preserving their order.
pub fn filter_items<'a, R: Resource>(items: &'a [R], query: &SearchQuery) -> Vec<&'a R> {
    items.iter().filter(|item| query.matches(*item)).collect()
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Items of 1-based `page`. Out-of-range pages yield an empty slice.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = page.saturating_mul(page_size).min(items.len());
    &items[start..end]
}

/// Clamp a requested page to `[1, total]`; 1 when there are no pages.
pub fn clamp_page(page: usize, total: usize) -> usize {
    page.clamp(1, total.max(1))
}

#[derive(Debug, Clone)]
pub struct FilterEngine<R> {
    query: SearchQuery,
    current_page: usize,
    page_size: usize,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> FilterEngine<R> {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: SearchQuery::default(),
            current_page: 1,
            page_size: page_size.max(1),
            _resource: PhantomData,
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Set one search field. Always returns to page 1.
    pub fn set_query(&mut self, field: &str, value: impl Into<String>) -> Result<(), FieldError> {
        let name = R::SEARCHABLE
            .iter()
            .copied()
            .find(|f| *f == field)
            .ok_or_else(|| FieldError(field.to_string()))?;
        self.query.fields.insert(name, value.into());
        self.current_page = 1;
        Ok(())
    }

    pub fn clear_query(&mut self) {
        self.query = SearchQuery::default();
        self.current_page = 1;
    }

    /// Move to `page`, clamped against the current filtered collection.
    pub fn go_to_page(&mut self, page: usize, items: &[R]) -> usize {
        let total = total_pages(filter_items(items, &self.query).len(), self.page_size);
        self.current_page = clamp_page(page, total);
        self.current_page
    }

    pub fn filtered<'a>(&self, items: &'a [R]) -> Vec<&'a R> {
        filter_items(items, &self.query)
    }

    /// The visible page. A page left beyond the end by a shrinking
    /// collection is shown as the last page.
    pub fn page<'a>(&self, items: &'a [R]) -> Page<'a, R> {
        let filtered = self.filtered(items);
        let total = total_pages(filtered.len(), self.page_size);
        let current = clamp_page(self.current_page, total);
        let visible = page_slice(&filtered, current, self.page_size).to_vec();
        Page {
            items: visible,
            filtered_count: filtered.len(),
            state: PaginationState {
                current_page: current,
                page_size: self.page_size,
                total_pages: total,
            },
        }
    }
}
