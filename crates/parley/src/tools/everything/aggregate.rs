use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use super::fetch::{FetchError, PageFetcher};
use super::page::{PageParser, SearchResult};

/// Distance between consecutive page offsets.
pub const PAGE_STRIDE: u64 = 32;

/// Most pages fetched for one query, counting the first.
pub const MAX_PAGES: u64 = 1024;

const MAX_OFFSET: u64 = PAGE_STRIDE * (MAX_PAGES - 1);

type FetchReport = (u64, Result<String, FetchError>);

/// Offsets disclosed by a page at `offset` whose navigation reaches
/// `max_offset`.
#[inline]
fn following_offsets(
    offset: u64,
    max_offset: u64,
) -> impl Iterator<Item = u64> {
    (offset + PAGE_STRIDE..=max_offset).step_by(PAGE_STRIDE as usize)
}

/// Collects pages by offset and remembers the first failure.
#[derive(Default)]
struct Collector {
    scheduled: HashSet<u64>,
    pages: BTreeMap<u64, Vec<SearchResult>>,
    first_error: Option<FetchError>,
    capped: bool,
}

impl Collector {
    /// Marks `offset` as scheduled, returning `false` if it already was.
    #[inline]
    fn schedule(&mut self, offset: u64) -> bool {
        self.scheduled.insert(offset)
    }

    /// Records a fetch outcome and returns the offsets it disclosed.
    fn record(
        &mut self,
        parser: &PageParser,
        offset: u64,
        result: Result<String, FetchError>,
    ) -> Vec<u64> {
        match result {
            Ok(html) => {
                let page = parser.parse(&html);
                trace!(
                    "page at {offset}: {} result(s), max offset {}",
                    page.results.len(),
                    page.max_offset
                );
                self.pages.insert(offset, page.results);
                let max_offset = self.cap(offset, page.max_offset);
                following_offsets(offset, max_offset)
                    .filter(|next| self.schedule(*next))
                    .collect()
            }
            Err(err) => {
                warn!("failed to fetch page at {offset}: {err}");
                self.first_error.get_or_insert(err);
                vec![]
            }
        }
    }

    /// Clamps a disclosed offset to [`MAX_PAGES`], warning once per search.
    fn cap(&mut self, offset: u64, max_offset: u64) -> u64 {
        if max_offset <= MAX_OFFSET {
            return max_offset;
        }
        if !self.capped {
            warn!(
                "page at {offset} names offset {max_offset}, \
                 fetching only up to {MAX_OFFSET}"
            );
            self.capped = true;
        }
        MAX_OFFSET
    }

    fn finish(self) -> Result<Vec<SearchResult>, FetchError> {
        if let Some(err) = self.first_error {
            return Err(err);
        }
        Ok(self.pages.into_values().flatten().collect())
    }
}

/// Fetches every page of `query` concurrently.
///
/// The first page discloses how far the results go, the remaining pages are
/// then fetched in parallel. Only this function touches the bookkeeping,
/// fetch tasks report back through a channel. It returns once every fetch it
/// issued has reported, with the results in ascending offset order.
pub async fn search_concurrent<F: PageFetcher>(
    fetcher: Arc<F>,
    query: &str,
) -> Result<Vec<SearchResult>, FetchError> {
    let parser = PageParser::new();
    let mut collector = Collector::default();
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<FetchReport>();

    let spawn_fetch = |offset: u64| {
        let fut = fetcher.fetch_page(query, offset);
        let report_tx = report_tx.clone();
        tokio::spawn(
            async move {
                report_tx.send((offset, fut.await)).ok();
            }
            .instrument(trace_span!("fetch page", offset)),
        );
    };

    collector.schedule(0);
    spawn_fetch(0);
    let mut in_flight = 1usize;

    while in_flight > 0 {
        // `report_tx` is alive, so the channel cannot close here.
        let Some((offset, result)) = report_rx.recv().await else {
            break;
        };
        in_flight -= 1;
        for next in collector.record(&parser, offset, result) {
            spawn_fetch(next);
            in_flight += 1;
        }
    }

    collector.finish()
}

/// Fetches every page of `query` one after another.
///
/// Produces the same output as [`search_concurrent`].
pub async fn search_sequential<F: PageFetcher>(
    fetcher: &F,
    query: &str,
) -> Result<Vec<SearchResult>, FetchError> {
    let parser = PageParser::new();
    let mut collector = Collector::default();
    let mut queue = VecDeque::from([0]);
    collector.schedule(0);

    while let Some(offset) = queue.pop_front() {
        let result = fetcher.fetch_page(query, offset).await;
        queue.extend(collector.record(&parser, offset, result));
    }

    collector.finish()
}
