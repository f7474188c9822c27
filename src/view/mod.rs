//! Client-side table pipeline: search, then sort, then page.
//!
//! Every render recomputes the whole pipeline from the last fetched
//! collection; nothing derived is cached between renders.

pub mod filter;
pub mod page;
pub mod sort;

pub use filter::SearchFilter;
pub use page::{page_count, PageSize, PageSlice, PageWindow};
pub use sort::{Direction, SortKey};

use crate::records::{Record, RecordKind};

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedPage<R> {
    pub rows: Vec<R>,
    pub padding: usize,
    /// Rows left after searching, across all pages.
    pub matched: usize,
    pub page: usize,
    pub page_count: usize,
}

/// Transient UI state of one table: search box, active sort column and
/// pager position.
#[derive(Clone, Debug, PartialEq)]
pub struct TableView {
    search_field: String,
    pub search: SearchFilter,
    pub sort: Option<SortKey>,
    pub window: PageWindow,
}

impl TableView {
    pub fn new(search_field: impl Into<String>) -> Self {
        Self {
            search_field: search_field.into(),
            search: SearchFilter::default(),
            sort: None,
            window: PageWindow::default(),
        }
    }

    pub fn for_kind(kind: RecordKind) -> Self {
        Self::new(kind.search_field())
    }

    pub fn search_field(&self) -> &str {
        &self.search_field
    }

    /// Updating the term only changes what the next render keeps; it never
    /// touches the collection itself.
    pub fn set_search(&mut self, term: &str) {
        self.search.set_term(term);
        self.window.page = 0;
    }

    pub fn sort_by(&mut self, field: &str) {
        match self.sort.as_mut() {
            Some(key) => key.toggle(field),
            None => self.sort = Some(SortKey::ascending(field)),
        }
    }

    pub fn render<R: Record>(&mut self, collection: &[R]) -> RenderedPage<R> {
        let mut rows = filter::apply(collection, &self.search, &self.search_field);
        if let Some(key) = self.sort.as_ref() {
            sort::sort_in_place(&mut rows, key);
        }
        let matched = rows.len();
        self.window.clamp(matched);
        let PageSlice { rows, padding } = page::slice(&rows, self.window);
        RenderedPage {
            rows,
            padding,
            matched,
            page: self.window.page,
            page_count: page_count(matched, self.window.size),
        }
    }
}
