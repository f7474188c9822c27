use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageSize {
    #[default]
    Five,
    Ten,
    TwentyFive,
    All,
}

impl PageSize {
    pub const OPTIONS: [PageSize; 4] = [
        PageSize::Five,
        PageSize::Ten,
        PageSize::TwentyFive,
        PageSize::All,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "5" => Some(Self::Five),
            "10" => Some(Self::Ten),
            "25" => Some(Self::TwentyFive),
            "all" | "-1" => Some(Self::All),
            _ => None,
        }
    }

    /// Row count per page, `None` for unlimited.
    pub fn rows(self) -> Option<usize> {
        match self {
            Self::Five => Some(5),
            Self::Ten => Some(10),
            Self::TwentyFive => Some(25),
            Self::All => None,
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rows() {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("all"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub size: PageSize,
}

impl PageWindow {
    pub fn new(page: usize, size: PageSize) -> Self {
        Self { page, size }
    }

    /// Switching the page size always returns to the first page.
    pub fn set_size(&mut self, size: PageSize) {
        self.size = size;
        self.page = 0;
    }

    pub fn next(&mut self, total: usize) {
        if self.page + 1 < page_count(total, self.size) {
            self.page += 1;
        }
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Pulls the page index back onto the last page that has rows.
    pub fn clamp(&mut self, total: usize) {
        let pages = page_count(total, self.size);
        if self.page >= pages {
            self.page = pages.saturating_sub(1);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageSlice<T> {
    pub rows: Vec<T>,
    /// Blank rows to draw after a short page so the table keeps its height.
    pub padding: usize,
}

/// Number of pages needed for `total` rows. An empty collection still has
/// one (empty) page.
pub fn page_count(total: usize, size: PageSize) -> usize {
    match size.rows() {
        Some(n) if total > 0 => total.div_ceil(n),
        _ => 1,
    }
}

/// Cuts the visible window out of `collection`. Does not clamp: a page past
/// the end yields no rows.
pub fn slice<T: Clone>(collection: &[T], window: PageWindow) -> PageSlice<T> {
    let Some(size) = window.size.rows() else {
        return PageSlice {
            rows: collection.to_vec(),
            padding: 0,
        };
    };
    let start = window.page.saturating_mul(size).min(collection.len());
    let end = start.saturating_add(size).min(collection.len());
    let rows = collection[start..end].to_vec();
    let padding = if window.page > 0 {
        size.saturating_sub(rows.len())
    } else {
        0
    };
    PageSlice { rows, padding }
}
