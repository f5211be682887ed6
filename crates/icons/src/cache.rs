use crate::error::{ErrorKind, Result};
use crate::source::SourceHandle;
use crate::validate::validate;
use exn::ResultExt;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use titledb_model::TitleId;
use titledb_storage::BackendHandle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Shared, immutable icon bytes.
pub type IconBytes = Arc<[u8]>;
/// Receiving end of the completion channel returned by [`IconCache::new`].
pub type IconEvents = UnboundedReceiver<IconEvent>;

/// Result of an [`IconCache::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Served from the in-memory tier.
    Memory(IconBytes),
    /// Read from the disk tier (and now in memory too).
    Disk(IconBytes),
    /// Nothing cached; a background fetch was started. Its outcome arrives
    /// as an [`IconEvent`].
    FetchStarted,
    /// Nothing cached and a fetch for this title is already running.
    FetchInProgress,
}

/// Completion of a background fetch, delivered on [`IconEvents`].
#[derive(Debug)]
pub struct IconEvent {
    pub title_id: TitleId,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub enum Outcome {
    /// The icon is on disk and in memory.
    Fetched(IconBytes),
    /// No icon this time; a later lookup will try again.
    Missing(crate::error::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Upper bound on a single network fetch.
    pub timeout: Duration,
    /// Number of concurrent fetches during [`prefetch()`](IconCache::prefetch).
    pub prefetch_concurrency: usize,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(12),
            prefetch_concurrency: 4,
        }
    }
}

/// The only state touched from more than one task. Always locked as a unit.
#[derive(Default)]
struct State {
    memory: HashMap<TitleId, IconBytes>,
    inflight: HashSet<TitleId>,
}

pub(crate) struct Inner {
    pub(crate) disk: BackendHandle,
    pub(crate) source: SourceHandle,
    pub(crate) options: Options,
    state: Mutex<State>,
    events: UnboundedSender<IconEvent>,
}

/// Title icons from memory, then disk, then the network.
///
/// Lookups never wait on the network: a miss on both local tiers starts a
/// background task and returns straight away, and the task reports back over
/// the [`IconEvents`] channel handed out by [`new()`](Self::new). At most one
/// fetch per title id runs at any time.
///
/// Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct IconCache {
    pub(crate) inner: Arc<Inner>,
}

/// Disk tier file name: `<titleid-lower>.png`.
pub(crate) fn icon_path(title_id: &TitleId) -> PathBuf {
    PathBuf::from(format!("{title_id}.png"))
}

impl IconCache {
    pub fn new(disk: BackendHandle, source: SourceHandle, options: Options) -> (Self, IconEvents) {
        let (events, receiver) = unbounded_channel();
        let options = Options {
            prefetch_concurrency: options.prefetch_concurrency.max(1),
            ..options
        };
        let inner = Inner {
            disk,
            source,
            options,
            state: Mutex::new(State::default()),
            events,
        };
        (Self { inner: Arc::new(inner) }, receiver)
    }

    /// Look up a title's icon.
    ///
    /// Must be called from within a Tokio runtime, as a miss spawns the
    /// fetch task. A disk read failure counts as a miss.
    pub async fn load(&self, title_id: &TitleId) -> Lookup {
        if let Some(bytes) = self.inner.state().memory.get(title_id) {
            return Lookup::Memory(bytes.clone());
        }

        if let Some(bytes) = self.inner.read_disk(title_id).await {
            let bytes = self.inner.state().memory.entry(title_id.clone()).or_insert(bytes).clone();
            return Lookup::Disk(bytes);
        }

        {
            let mut state = self.inner.state();
            // A fetch may have landed while the disk was being read.
            if let Some(bytes) = state.memory.get(title_id) {
                return Lookup::Memory(bytes.clone());
            }
            if !state.inflight.insert(title_id.clone()) {
                tracing::trace!(%title_id, "Icon fetch already in progress");
                return Lookup::FetchInProgress;
            }
        }

        let inner = Arc::clone(&self.inner);
        let title_id = title_id.clone();
        tokio::spawn(async move { inner.fetch_in_background(title_id).await });
        Lookup::FetchStarted
    }

    /// Whether a background fetch for this title is running.
    pub fn is_fetching(&self, title_id: &TitleId) -> bool {
        self.inner.state().inflight.contains(title_id)
    }

    /// Drop the whole in-memory tier.
    pub fn clear_memory(&self) {
        self.inner.state().memory.clear();
    }

    /// Move a title's cached icon to a new id.
    ///
    /// The old key always leaves the memory tier; its bytes move to the new
    /// key unless that key already has some. On disk the file is renamed only
    /// when the destination doesn't exist, so an existing icon is never
    /// overwritten. Failures are logged and otherwise ignored.
    pub async fn rename(&self, old: &TitleId, new: &TitleId) {
        if old == new {
            return;
        }
        {
            let mut state = self.inner.state();
            if let Some(bytes) = state.memory.remove(old) {
                state.memory.entry(new.clone()).or_insert(bytes);
            }
        }

        let disk = &self.inner.disk;
        let (from, to) = (icon_path(old), icon_path(new));
        match (disk.exists(&from).await, disk.exists(&to).await) {
            (Ok(false), _) => {},
            (Ok(true), Ok(true)) => {
                tracing::debug!(%old, %new, "Icon already cached under new id; leaving old file in place");
            },
            (Ok(true), Ok(false)) => match disk.rename(&from, &to).await {
                Ok(()) => tracing::debug!(%old, %new, "Moved cached icon"),
                Err(e) => tracing::warn!(%old, %new, error = ?e, "Failed to move cached icon"),
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(%old, %new, error = ?e, "Failed to check cached icon");
            },
        }
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        // Nothing panics while holding the lock, but don't lose the cache if
        // something ever does.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn read_disk(&self, title_id: &TitleId) -> Option<IconBytes> {
        let path = icon_path(title_id);
        match self.disk.exists(&path).await {
            Ok(true) => {},
            Ok(false) => return None,
            Err(e) => {
                tracing::debug!(%title_id, error = ?e, "Icon disk check failed");
                return None;
            },
        }
        match self.disk.read(&path).await {
            Ok(bytes) => Some(bytes.into()),
            Err(e) => {
                tracing::debug!(%title_id, error = ?e, "Icon disk read failed");
                None
            },
        }
    }

    /// Fetch from the source under the timeout and validate the payload.
    pub(crate) async fn fetch_validated(&self, title_id: &TitleId) -> Result<Vec<u8>> {
        let timeout = self.options.timeout;
        let bytes = match tokio::time::timeout(timeout, self.source.fetch(title_id)).await {
            Ok(result) => result?,
            Err(_elapsed) => exn::bail!(ErrorKind::Timeout(timeout)),
        };
        validate(&bytes).map_err(ErrorKind::Rejected)?;
        Ok(bytes)
    }

    /// Fetch, then persist to the disk tier.
    pub(crate) async fn fetch_to_disk(&self, title_id: &TitleId) -> Result<Vec<u8>> {
        let bytes = self.fetch_validated(title_id).await?;
        self.disk.write(&icon_path(title_id), &bytes).await.or_raise(|| ErrorKind::Storage)?;
        Ok(bytes)
    }

    async fn fetch_in_background(&self, title_id: TitleId) {
        let outcome = match self.fetch_validated(&title_id).await {
            Ok(bytes) => {
                if let Err(e) = self.disk.write(&icon_path(&title_id), &bytes).await {
                    // Still worth showing; the next session will fetch again.
                    tracing::warn!(%title_id, error = ?e, "Failed to write icon to disk cache");
                }
                Ok(IconBytes::from(bytes))
            },
            Err(e) => Err(e),
        };

        let outcome = {
            let mut state = self.state();
            state.inflight.remove(&title_id);
            match outcome {
                Ok(bytes) => {
                    state.memory.insert(title_id.clone(), bytes.clone());
                    Outcome::Fetched(bytes)
                },
                Err(e) => Outcome::Missing(e),
            }
        };
        match &outcome {
            Outcome::Fetched(bytes) => tracing::info!(%title_id, bytes = bytes.len(), "Fetched icon"),
            Outcome::Missing(e) => tracing::debug!(%title_id, error = ?e, "No icon"),
        }
        // The receiver may be gone if the owner shut down; nothing to do then.
        let _ = self.events.send(IconEvent { title_id, outcome });
    }
}
