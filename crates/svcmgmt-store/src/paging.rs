//! Page cursor over a filtered instance collection
//!
//! The cursor holds at most one page in memory. Each call to
//! [`PageCursor::next_page`] issues one fetch; the walk ends as soon as the
//! store returns a page without continuation.

use crate::api::{DomInstanceFilter, DomInstanceStore, PageToken};
use crate::error::StoreError;
use svcmgmt_model::DomInstance;

/// Cursor over the pages of a filtered collection
#[derive(Debug)]
pub struct PageCursor<'s, S: ?Sized> {
    store: &'s S,
    filter: DomInstanceFilter,
    page_size: usize,
    after: Option<PageToken>,
    exhausted: bool,
    pages_fetched: usize,
}

/// Prepare a paged walk over the instances matching `filter`
///
/// A `page_size` of zero is treated as one.
#[inline]
pub fn prepare_paging<S>(store: &S, filter: DomInstanceFilter, page_size: usize) -> PageCursor<'_, S>
where
    S: DomInstanceStore + ?Sized,
{
    PageCursor::new(store, filter, page_size)
}

impl<'s, S> PageCursor<'s, S>
where
    S: DomInstanceStore + ?Sized,
{
    /// Create a cursor positioned before the first page
    #[must_use]
    pub fn new(store: &'s S, filter: DomInstanceFilter, page_size: usize) -> Self {
        Self {
            store,
            filter,
            page_size: page_size.max(1),
            after: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Fetch the next page
    ///
    /// Returns `Ok(None)` once the collection is exhausted.
    ///
    /// # Errors
    /// Returns the store error of the failed fetch; the cursor is exhausted
    /// afterwards
    pub fn next_page(&mut self) -> Result<Option<Vec<DomInstance>>, StoreError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = match self
            .store
            .fetch_page(&self.filter, self.after.as_ref(), self.page_size)
        {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        // A continuation that does not advance would loop forever
        let stalled = page.next.is_some() && page.next == self.after;
        match page.next {
            Some(token) if !page.instances.is_empty() && !stalled => self.after = Some(token),
            _ => self.exhausted = true,
        }

        if page.instances.is_empty() {
            return Ok(None);
        }
        Ok(Some(page.instances))
    }

    /// Number of fetches issued so far
    #[inline]
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Configured page size
    #[inline]
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl<S> Iterator for PageCursor<'_, S>
where
    S: DomInstanceStore + ?Sized,
{
    type Item = Result<Vec<DomInstance>, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page().transpose()
    }
}
