//! Where icons come from when neither memory nor disk has them.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use titledb_model::TitleId;
use tracing::instrument;

pub type SourceHandle = Arc<dyn IconSource + Send + Sync>;

/// The network tier of the icon cache.
#[async_trait]
pub trait IconSource: Send + Sync {
    /// Fetch the raw bytes of one title's icon.
    ///
    /// Payload validation and the timeout are the cache's job; a source only
    /// reports transport-level failures.
    async fn fetch(&self, title_id: &TitleId) -> Result<Vec<u8>>;
}

/// Icons served over HTTP from a static file host.
///
/// The remote layout is `<base_url>/icon/<TID[:4]>/<TID>.png` with the title
/// id in uppercase, unlike the lowercase file names of the disk tier.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build().or_raise(|| ErrorKind::Client)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn url(&self, title_id: &TitleId) -> String {
        let upper = title_id.to_upper();
        let (group, _) = upper.split_at(4);
        format!("{}/icon/{group}/{upper}.png", self.base_url)
    }
}

#[async_trait]
impl IconSource for HttpSource {
    #[instrument(skip_all, fields(%title_id))]
    async fn fetch(&self, title_id: &TitleId) -> Result<Vec<u8>> {
        let url = self.url(title_id);
        let response = self.client.get(&url).send().await.or_raise(|| ErrorKind::Network(url.clone()))?;
        let status = response.status();
        if status != StatusCode::OK {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        let bytes = response.bytes().await.or_raise(|| ErrorKind::Network(url))?;
        tracing::debug!(bytes = bytes.len(), "Downloaded icon");
        Ok(bytes.to_vec())
    }
}

#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockResponse, MockSource};

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// One scripted answer of a [`MockSource`].
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        Bytes(Vec<u8>),
        Status(u16),
        /// Never answers; the cache's timeout has to kick in.
        Hang,
    }

    /// Scripted [`IconSource`] for tests.
    ///
    /// Each title id has a queue of responses; once a queue is empty the
    /// last response is repeated, and ids without a script answer 404.
    /// Calls are counted before the optional gate is passed, so tests can
    /// hold fetches open with [`gated()`](Self::gated) and let them finish
    /// with [`release()`](Self::release).
    #[derive(Default)]
    pub struct MockSource {
        scripts: Mutex<HashMap<TitleId, VecDeque<MockResponse>>>,
        calls: Mutex<HashMap<TitleId, usize>>,
        total: AtomicUsize,
        gate: Option<Semaphore>,
    }

    impl MockSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fetches block until [`release()`](Self::release) is called.
        pub fn gated(mut self) -> Self {
            self.gate = Some(Semaphore::new(0));
            self
        }

        pub fn with_response(self, title_id: &TitleId, response: MockResponse) -> Self {
            self.push(title_id, response);
            self
        }

        /// Queue another response for `title_id`.
        pub fn push(&self, title_id: &TitleId, response: MockResponse) {
            let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
            scripts.entry(title_id.clone()).or_default().push_back(response);
        }

        /// Let `n` gated fetches through.
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        /// Total number of fetches started.
        pub fn calls(&self) -> usize {
            self.total.load(Ordering::SeqCst)
        }

        pub fn calls_for(&self, title_id: &TitleId) -> usize {
            let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            calls.get(title_id).copied().unwrap_or(0)
        }

        fn next_response(&self, title_id: &TitleId) -> MockResponse {
            let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
            match scripts.get_mut(title_id) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockResponse::Status(404)),
                Some(queue) => queue.front().cloned().unwrap_or(MockResponse::Status(404)),
                None => MockResponse::Status(404),
            }
        }
    }

    #[async_trait]
    impl IconSource for MockSource {
        async fn fetch(&self, title_id: &TitleId) -> Result<Vec<u8>> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.calls.lock().unwrap_or_else(|e| e.into_inner()).entry(title_id.clone()).or_default() += 1;
            if let Some(gate) = &self.gate
                && let Ok(permit) = gate.acquire().await
            {
                permit.forget();
            }
            match self.next_response(title_id) {
                MockResponse::Bytes(bytes) => Ok(bytes),
                MockResponse::Status(status) => exn::bail!(ErrorKind::Status(status)),
                MockResponse::Hang => {
                    std::future::pending::<()>().await;
                    exn::bail!(ErrorKind::Network(title_id.to_string()))
                },
            }
        }
    }
}
