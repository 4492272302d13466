//! Cursor pagination over `startAt` / `maxResults` endpoints.
//!
//! The agile API uses two termination conventions: list endpoints return an
//! `isLast` flag, issue endpoints only a `total`. Both run through
//! [`paginate`].

use std::future::Future;

/// How the last page is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stop when the page says `isLast: true`.
    IsLastFlag,
    /// Stop once the number of items seen reaches the reported `total`.
    RunningTotal,
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub is_last: bool,
    pub total: u64,
}

/// Fetch pages until `termination` says stop, concatenating their items.
///
/// `fetch_page` receives the `startAt` offset for each request. It returns
/// `Ok(None)` when the endpoint answered "not found", which makes the whole
/// result empty. An empty page always ends the walk so a server that never
/// sets `isLast` cannot loop us forever.
pub async fn paginate<T, E, F, Fut>(termination: Termination, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Option<Page<T>>, E>>,
{
    let mut items = Vec::new();
    let mut start_at = 0u64;
    loop {
        let Some(page) = fetch_page(start_at).await? else {
            return Ok(Vec::new());
        };
        let received = page.items.len() as u64;
        items.extend(page.items);

        let finished = match termination {
            Termination::IsLastFlag => page.is_last,
            Termination::RunningTotal => items.len() as u64 >= page.total,
        };
        if finished || received == 0 {
            return Ok(items);
        }
        start_at += received;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn page(range: std::ops::Range<u64>, is_last: bool, total: u64) -> Page<u64> {
        Page {
            items: range.collect(),
            is_last,
            total,
        }
    }

    #[tokio::test]
    async fn running_total_stops_when_count_reaches_total() {
        let calls = RefCell::new(Vec::new());
        let out: Vec<u64> = paginate(Termination::RunningTotal, |start_at| {
            calls.borrow_mut().push(start_at);
            let p = if start_at == 0 {
                page(0..100, false, 150)
            } else {
                page(100..150, false, 150)
            };
            async move { Ok::<_, ()>(Some(p)) }
        })
        .await
        .unwrap();
        assert_eq!(out.len(), 150);
        assert_eq!(*calls.borrow(), vec![0, 100]);
    }

    #[tokio::test]
    async fn is_last_flag_ignores_totals() {
        let calls = RefCell::new(0);
        let out: Vec<u64> = paginate(Termination::IsLastFlag, |start_at| {
            *calls.borrow_mut() += 1;
            // total is nonsense on purpose
            let p = page(start_at..start_at + 2, start_at > 0, 1);
            async move { Ok::<_, ()>(Some(p)) }
        })
        .await
        .unwrap();
        assert_eq!(out, vec![0, 1, 2, 3]);
        assert_eq!(*calls.borrow(), 2);
    }

    #[tokio::test]
    async fn empty_page_ends_the_walk() {
        let calls = RefCell::new(0);
        let out: Vec<u64> = paginate(Termination::IsLastFlag, |_| {
            *calls.borrow_mut() += 1;
            async move { Ok::<_, ()>(Some(page(0..0, false, 0))) }
        })
        .await
        .unwrap();
        assert!(out.is_empty());
        assert_eq!(*calls.borrow(), 1);
    }

    #[tokio::test]
    async fn not_found_yields_empty() {
        let out: Vec<u64> = paginate(Termination::RunningTotal, |_| async move {
            Ok::<_, ()>(None)
        })
        .await
        .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn errors_propagate() {
        let out: Result<Vec<u64>, &str> =
            paginate(Termination::RunningTotal, |_| async move { Err("boom") }).await;
        assert_eq!(out, Err("boom"));
    }
}
