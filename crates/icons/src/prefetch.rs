use crate::cache::{IconCache, icon_path};
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use titledb_model::TitleId;

/// Running counters of a [`prefetch`](IconCache::prefetch) sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchProgress {
    /// Title ids handed to the sweep.
    pub total: u64,
    /// Title ids dealt with so far: already on disk, or fetch attempted.
    pub scanned: u64,
    /// Title ids that had no icon on disk.
    pub missing: u64,
    /// Missing icons that were fetched and stored.
    pub fetched: u64,
}

/// Progress events emitted by [`IconCache::prefetch`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`Progress`](Self::Progress), once after the disk tier has been
///    checked and once per fetch attempt.
/// 3. [`Complete`](Self::Complete), exactly once, with the final counters.
///
/// If the disk tier can't be listed the stream yields that error and ends
/// without [`Complete`](Self::Complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchEvent {
    Started,
    Progress(PrefetchProgress),
    Complete(PrefetchProgress),
}

impl IconCache {
    /// Download every icon in `title_ids` that the disk tier doesn't have.
    ///
    /// The disk tier is listed once up front. Fetches run concurrently (see
    /// [`Options::prefetch_concurrency`](crate::Options::prefetch_concurrency))
    /// and go to disk only: the memory tier is left alone and the interactive
    /// in-flight registry is not consulted, so a sweep and a [`load()`](Self::load)
    /// may both fetch the same icon. Both write the same bytes; the last write
    /// wins. Failed fetches are counted, not reported. Dropping the stream
    /// abandons the sweep.
    pub fn prefetch(&self, title_ids: impl IntoIterator<Item = TitleId>) -> impl Stream<Item = Result<PrefetchEvent>> {
        let inner = self.inner.clone();
        let title_ids: Vec<TitleId> = title_ids.into_iter().collect();
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            yield Ok(PrefetchEvent::Started);
            let mut progress = PrefetchProgress {
                total: title_ids.len() as u64,
                ..PrefetchProgress::default()
            };

            let cached: HashSet<PathBuf> = match inner.disk.list().await.or_raise(|| ErrorKind::Storage) {
                Ok(files) => files.into_iter().map(|file| file.path).collect(),
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            let mut missing = Vec::new();
            for title_id in title_ids {
                match cached.contains(&icon_path(&title_id)) {
                    true => progress.scanned += 1,
                    false => {
                        progress.missing += 1;
                        missing.push(title_id);
                    },
                }
            }
            tracing::info!(total = progress.total, missing = progress.missing, "Prefetching icons");
            yield Ok(PrefetchEvent::Progress(progress));

            let inner = &inner;
            let mut pending = missing.into_iter().map(|title_id| async move {
                match inner.fetch_to_disk(&title_id).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!(%title_id, error = ?e, "Prefetch miss");
                        false
                    },
                }
            });
            let mut processing = FuturesUnordered::new();
            processing.extend(pending.by_ref().take(inner.options.prefetch_concurrency));
            while let Some(fetched) = processing.next().await {
                progress.scanned += 1;
                if fetched {
                    progress.fetched += 1;
                }
                yield Ok(PrefetchEvent::Progress(progress));
                if let Some(next) = pending.next() {
                    processing.push(next);
                }
            }

            tracing::info!(fetched = progress.fetched, missing = progress.missing, "Prefetch complete");
            yield Ok(PrefetchEvent::Complete(progress));
        })
    }
}
