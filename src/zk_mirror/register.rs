use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc::Receiver, RwLock};

use super::event::MirrorEvent;
use super::freshness::FreshnessClock;
use super::state::MirrorState;

/// Holds the latest [`MirrorState`] of one ZooKeeper path, together with the
/// mirror's [`FreshnessClock`], and keeps both current as events arrive.
///
/// Readers go through the async accessors; writes happen on an internal task,
/// one event at a time, so a reader always sees a coherent per-node value.
#[derive(Debug)]
pub struct MirrorRegister {
    state: Arc<RwLock<MirrorState>>,
    clock: Arc<FreshnessClock>,
}

impl MirrorRegister {
    pub fn new(root: String, mut rx: Receiver<MirrorEvent>) -> Self {
        let reg = Self {
            state: Arc::new(RwLock::new(MirrorState::new(root.clone()))),
            clock: Arc::new(FreshnessClock::new()),
        };

        let state_clone = reg.state.clone();
        let clock_clone = reg.clock.clone();

        // Feed the state from the emitter's channel until it closes, which
        // happens once the emitter shuts down and drops its sender.
        tokio::spawn(async move {
            debug!("Begin receiving mirror events for '{root}'");

            while let Some(event) = rx.recv().await {
                trace!("Received:\n{:#?}", event);

                state_clone.write().await.apply(&event);
                clock_clone.touch();
            }

            debug!("Mirror event channel for '{root}' closed");
        });

        reg
    }

    /// `(version, data)` of the znode at `path`, if mirrored.
    pub async fn data_at(&self, path: &str) -> Option<(i32, Vec<u8>)> {
        self.state.read().await.data_at(path)
    }

    /// Whether a znode at `path` is currently mirrored.
    pub async fn has_node(&self, path: &str) -> bool {
        self.state.read().await.has_node(path)
    }

    /// The direct children of the znode at `path`: `name -> (version, data)`.
    pub async fn children_of(&self, path: &str) -> BTreeMap<String, (i32, Vec<u8>)> {
        self.state.read().await.children_of(path)
    }

    /// The names of the direct children of the znode at `path`.
    pub async fn child_names(&self, path: &str) -> Vec<String> {
        self.state.read().await.child_names(path)
    }

    /// Every mirrored znode below the root, as `(path, version, data)`.
    pub async fn snapshot(&self) -> Vec<(String, i32, Vec<u8>)> {
        self.state.read().await.snapshot()
    }

    /// Milliseconds since UTC Epoch of the last change observed by this mirror.
    pub fn last_update_millis(&self) -> i64 {
        self.clock.last_update_millis()
    }
}

#[cfg(test)]
impl MirrorRegister {
    /// A register over a pre-built state, with no feeding task behind it.
    pub(crate) fn with_state(state: MirrorState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            clock: Arc::new(FreshnessClock::new()),
        }
    }

    pub(crate) fn touch_clock(&self) {
        self.clock.touch();
    }
}
