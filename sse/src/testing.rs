//! Fakes shared by the unit tests in this crate.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use upstream::{Error, ErrorKind, RepoKey, RepoSnapshot, ResourceSource};

/// Only `stars` and `forks` vary; `open_issues` and `watchers` are fixed.
pub(crate) fn snapshot(stars: u64, forks: u64) -> RepoSnapshot {
    RepoSnapshot {
        full_name: "acme/widget".to_string(),
        stars,
        forks,
        open_issues: 0,
        watchers: 5,
    }
}

/// Parse the JSON envelope out of an SSE frame.
pub(crate) fn decode(frame: &Bytes) -> Value {
    let text = std::str::from_utf8(frame).expect("frames are utf-8");
    let data = text
        .strip_prefix("event: message\ndata: ")
        .and_then(|rest| rest.strip_suffix("\n\n"))
        .expect("malformed frame");
    serde_json::from_str(data).expect("data is json")
}

/// Replays a scripted list of fetch results, then keeps returning the last
/// successful snapshot (or `NotFound` if there never was one).
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<Result<RepoSnapshot, Error>>>,
    last: Mutex<Option<RepoSnapshot>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<RepoSnapshot, Error>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceSource for ScriptedSource {
    async fn fetch_repository(&self, _key: &RepoKey) -> Result<RepoSnapshot, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(snapshot)) => {
                *self.last.lock() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .clone()
                .ok_or_else(|| Error::new(ErrorKind::NotFound)),
        }
    }
}

/// Never answers; used to exercise the fetch timeout.
pub(crate) struct StalledSource;

#[async_trait]
impl ResourceSource for StalledSource {
    async fn fetch_repository(&self, _key: &RepoKey) -> Result<RepoSnapshot, Error> {
        std::future::pending().await
    }
}
