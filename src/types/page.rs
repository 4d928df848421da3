//! One page of a paginated forge listing.

/// A page of items plus the cursor of the page after it.
///
/// `next` is `None` only when the forge signals end-of-data. An empty
/// `items` vector with a `next` cursor is a valid, non-terminal page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Page number this page was fetched with
    pub number: u32,
    /// Items on this page
    pub items: Vec<T>,
    /// Next page number, if any
    pub next: Option<u32>,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(number: u32, items: Vec<T>, next: Option<u32>) -> Self {
        Self {
            number,
            items,
            next,
        }
    }

    /// Whether the forge signalled there is nothing after this page.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}
