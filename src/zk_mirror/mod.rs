// Inner modules
mod emitter;
mod event;
mod freshness;
mod register;
mod state;

// Exports
pub use emitter::{MirrorEmitter, MirrorMode};
pub use event::{MirrorEvent, MirrorEventKind, NodeRecord};
pub use register::MirrorRegister;
#[cfg(test)]
pub use state::MirrorState;

// Imports
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use zookeeper_async::{WatchedEvent, Watcher, ZooKeeper};

use crate::internals::Emitter;

/// Default watcher for the shared ZooKeeper session.
///
/// Mirrors arm their own per-znode watches; session-level events are only
/// worth a log line (reconnection is handled by the client, and the mirrors'
/// resync interval covers watches lost across a session change).
pub struct SessionLogger;

impl Watcher for SessionLogger {
    fn handle(&self, event: WatchedEvent) {
        debug!("ZooKeeper session event: {event:?}");
    }
}

/// Start mirroring a ZooKeeper path: emitter and register.
///
/// # Arguments
///
/// * `zk` - Shared handle to the ZooKeeper session
/// * `root` - Absolute path to mirror
/// * `mode` - Whether to mirror the whole subtree or a single level
/// * `resync_interval` - How often to rescan absent any watch notification
/// * `shutdown_token` - A [`CancellationToken`] to stop the mirror
pub fn init(
    zk: Arc<ZooKeeper>,
    root: &str,
    mode: MirrorMode,
    resync_interval: Duration,
    shutdown_token: CancellationToken,
) -> (Arc<MirrorRegister>, JoinHandle<()>) {
    let (rx, join) = MirrorEmitter::new(zk, root, mode, resync_interval).spawn(shutdown_token);
    let reg = Arc::new(MirrorRegister::new(root.to_string(), rx));

    debug!("Initialized mirror of '{root}'");
    (reg, join)
}
