//! Cursor pagination driver.
//!
//! The driver keeps requesting pages until the server stops returning a next
//! cursor. No page count bound is assumed; a cursor that comes back a second
//! time ends the walk and is reported as a [`PaginationAnomaly`].

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::exchange_source::SourceError;
use crate::ExchangeId;

/// One page of results and the cursor for the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    pub fn with_cursor(items: Vec<T>, next_cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: Some(next_cursor.into()),
        }
    }
}

/// Fetches a single page for a cursor (`None` for the first page).
pub trait PageFetcher<T>: Send + Sync {
    fn fetch_page<'a>(
        &'a self,
        cursor: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Page<T>, SourceError>> + Send + 'a>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationAnomaly {
    /// The server handed back a cursor that was already followed.
    RepeatedCursor { cursor: String, page: usize },
}

impl Display for PaginationAnomaly {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RepeatedCursor { cursor, page } => {
                write!(f, "cursor '{cursor}' repeated after page {page}; pagination stopped")
            }
        }
    }
}

/// Concatenated result of a pagination walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub anomaly: Option<PaginationAnomaly>,
}

#[derive(Debug, Clone, Copy)]
pub struct PaginationDriver {
    exchange: ExchangeId,
    page_delay: Duration,
}

impl PaginationDriver {
    pub fn new(exchange: ExchangeId, page_delay: Duration) -> Self {
        Self {
            exchange,
            page_delay,
        }
    }

    /// Walks every page in order. The first error aborts the walk.
    pub async fn collect<T, F>(&self, fetcher: &F) -> Result<Paginated<T>, SourceError>
    where
        T: Send,
        F: PageFetcher<T> + ?Sized,
    {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0_usize;
        let mut anomaly = None;

        loop {
            if pages > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let page = fetcher.fetch_page(cursor.as_deref()).await?;
            pages += 1;
            tracing::info!(
                exchange = %self.exchange,
                page = pages,
                items = page.items.len(),
                "fetched page"
            );
            items.extend(page.items);

            let Some(next) = normalize_cursor(page.next_cursor) else {
                break;
            };
            if !seen.insert(next.clone()) {
                let repeated = PaginationAnomaly::RepeatedCursor {
                    cursor: next,
                    page: pages,
                };
                tracing::warn!(exchange = %self.exchange, %repeated, "pagination anomaly");
                anomaly = Some(repeated);
                break;
            }
            cursor = Some(next);
        }

        Ok(Paginated {
            items,
            pages,
            anomaly,
        })
    }
}

fn normalize_cursor(cursor: Option<String>) -> Option<String> {
    cursor
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
