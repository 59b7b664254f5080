// ── Bounded fleet runner ──
//
// Per-device work is independent, so the fleet is driven as a stream of
// futures with at most `max_workers` in flight. Results keep input order.

use std::future::Future;

use futures::StreamExt;
use futures::stream;

/// Default number of routers worked on concurrently.
pub const DEFAULT_WORKERS: usize = 5;

/// Run `f` over `items` with at most `max_workers` futures in flight.
///
/// A `max_workers` of 0 is treated as 1.
pub async fn run_bounded<I, F, Fut>(items: I, max_workers: usize, f: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(f)
        .buffered(max_workers.max(1))
        .collect()
        .await
}
