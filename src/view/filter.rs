use crate::records::Record;

/// Case-insensitive substring search over one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilter {
    term: String,
}

impl SearchFilter {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_lowercase(),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    pub fn set_term(&mut self, term: &str) {
        *self = Self::new(term);
    }

    pub fn matches<R: Record>(&self, record: &R, field: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        match record.field(field) {
            Some(value) => value.display_text().to_lowercase().contains(&self.term),
            None => false,
        }
    }
}

/// Keeps the records whose `field` contains `term`. An empty term keeps
/// everything.
pub fn filter<R: Record>(collection: &[R], term: &str, field: &str) -> Vec<R> {
    let search = SearchFilter::new(term);
    apply(collection, &search, field)
}

pub(crate) fn apply<R: Record>(collection: &[R], search: &SearchFilter, field: &str) -> Vec<R> {
    if search.is_empty() {
        return collection.to_vec();
    }
    collection
        .iter()
        .filter(|r| search.matches(*r, field))
        .cloned()
        .collect()
}
