use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use zookeeper_async::{WatchedEvent, ZkError, ZkResult, ZooKeeper};

use super::event::{MirrorEvent, NodeRecord};
use crate::internals::Emitter;

const CHANNEL_SIZE: usize = 64;

/// How much of the ZooKeeper hierarchy below the root a mirror shadows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorMode {
    /// The whole subtree below the root.
    Subtree,

    /// The root and its direct children only.
    SingleLevel,
}

/// Build a one-shot ZooKeeper watch closure that nudges the owning mirror to
/// rescan.
///
/// The payload of the notification is irrelevant: the scan re-reads whatever
/// is live and diffs against its shadow, so a unit signal is enough.
fn rescan_trigger(trigger: &mpsc::UnboundedSender<()>) -> impl FnOnce(WatchedEvent) + Send + 'static {
    let trigger = trigger.clone();
    move |_event: WatchedEvent| {
        let _ = trigger.send(());
    }
}

/// Emits [`MirrorEvent`]s for one ZooKeeper path via a provided [`mpsc::channel`].
///
/// The emitter keeps a private shadow of the path, rescans it whenever a watch
/// fires (or the resync interval elapses, the guard against lost watches), and
/// emits the difference between consecutive scans. A scan that fails wholesale
/// leaves the shadow untouched: the mirror goes stale, never torn.
///
/// It shuts down when the provided [`CancellationToken`] is cancelled.
pub struct MirrorEmitter {
    zk: Arc<ZooKeeper>,
    root: String,
    mode: MirrorMode,
    resync_interval: Duration,
}

impl MirrorEmitter {
    /// Create a new [`MirrorEmitter`].
    ///
    /// # Arguments
    ///
    /// * `zk` - Shared handle to the ZooKeeper session
    /// * `root` - Absolute path this mirror shadows
    /// * `mode` - Whether to shadow the whole subtree or a single level
    /// * `resync_interval` - How often to rescan absent any watch notification
    pub fn new(
        zk: Arc<ZooKeeper>,
        root: &str,
        mode: MirrorMode,
        resync_interval: Duration,
    ) -> Self {
        Self {
            zk,
            root: root.to_string(),
            mode,
            resync_interval,
        }
    }

    /// Read the live content of the mirrored path, re-arming watches on every
    /// visited znode.
    ///
    /// Nodes that vanish mid-scan are skipped; any other ZooKeeper error
    /// aborts the scan so the caller can keep its previous shadow intact.
    async fn scan(
        zk: &ZooKeeper,
        root: &str,
        mode: MirrorMode,
        trigger: &mpsc::UnboundedSender<()>,
    ) -> ZkResult<BTreeMap<String, NodeRecord>> {
        let mut nodes = BTreeMap::new();

        // An absent root is a valid, empty mirror. Data and children watches
        // only fire for live nodes, so arm an exists watch for its creation.
        if let Err(ZkError::NoNode) = zk.exists_w(root, rescan_trigger(trigger)).await {
            return Ok(nodes);
        }

        let mut pending = vec![root.to_string()];
        while let Some(path) = pending.pop() {
            match zk.get_data_w(&path, rescan_trigger(trigger)).await {
                Ok((data, stat)) => {
                    nodes.insert(
                        path.clone(),
                        NodeRecord {
                            version: stat.version,
                            mtime_millis: stat.mtime,
                            data,
                        },
                    );
                },
                Err(ZkError::NoNode) => continue, //< vanished mid-scan
                Err(e) => return Err(e),
            }

            if mode == MirrorMode::SingleLevel && path != root {
                continue;
            }

            match zk.get_children_w(&path, rescan_trigger(trigger)).await {
                Ok(children) => {
                    for child in children {
                        pending.push(format!("{path}/{child}"));
                    }
                },
                Err(ZkError::NoNode) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(nodes)
    }
}

impl Emitter for MirrorEmitter {
    type Emitted = MirrorEvent;

    /// Spawn a new async task to run the business logic of this struct.
    ///
    /// When this emitter gets spawned, it returns a [`mpsc::Receiver`] for
    /// [`MirrorEvent`], and a [`JoinHandle`] to help join on the task spawned
    /// internally.
    ///
    /// # Arguments
    ///
    /// * `shutdown_token`: A [`CancellationToken`] that, when cancelled, will make the internal loop terminate.
    fn spawn(
        &self,
        shutdown_token: CancellationToken,
    ) -> (mpsc::Receiver<Self::Emitted>, JoinHandle<()>) {
        let (sx, rx) = mpsc::channel::<Self::Emitted>(CHANNEL_SIZE);

        let zk = self.zk.clone();
        let root = self.root.clone();
        let mode = self.mode;
        let resync_interval = self.resync_interval;

        let join_handle = tokio::spawn(async move {
            let (trigger_sx, mut trigger_rx) = mpsc::unbounded_channel::<()>();

            let mut shadow: BTreeMap<String, NodeRecord> = BTreeMap::new();
            let mut resync = interval(resync_interval);
            resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
            resync.tick().await; //< first tick completes immediately

            'outer: loop {
                match Self::scan(&zk, &root, mode, &trigger_sx).await {
                    Ok(fresh) => {
                        let events = diff(&shadow, &fresh, Utc::now().timestamp_millis());
                        if !events.is_empty() {
                            debug!("Scan of '{root}' produced {} events", events.len());
                        }
                        for event in events {
                            if sx.send(event).await.is_err() {
                                info!("Receiver of '{root}' mirror events dropped: terminating");
                                break 'outer;
                            }
                        }
                        shadow = fresh;
                    },
                    Err(e) => {
                        error!("Failed to scan '{root}': {e:?}");
                    },
                }

                tokio::select! {
                    _ = trigger_rx.recv() => {
                        // Coalesce a burst of watch notifications into one rescan
                        while trigger_rx.try_recv().is_ok() {}
                    },
                    _ = resync.tick() => {
                        trace!("Resync interval elapsed for '{root}'");
                    },
                    _ = shutdown_token.cancelled() => {
                        info!("Shutting down mirror of '{root}'");
                        break;
                    },
                }
            }
        });

        (rx, join_handle)
    }
}

/// Difference between two consecutive scans of the same path, as events.
///
/// # Arguments
///
/// * `shadow` - The previous scan
/// * `fresh` - The scan just completed
/// * `removed_at_millis` - Event time for removals, where ZooKeeper offers none
fn diff(
    shadow: &BTreeMap<String, NodeRecord>,
    fresh: &BTreeMap<String, NodeRecord>,
    removed_at_millis: i64,
) -> Vec<MirrorEvent> {
    let mut events = Vec::new();

    for (path, node) in fresh {
        match shadow.get(path) {
            None => events.push(MirrorEvent::added(path.clone(), node.clone())),
            Some(old) if old.version != node.version || old.data != node.data => {
                events.push(MirrorEvent::updated(path.clone(), node.clone()));
            },
            Some(_) => {},
        }
    }

    for path in shadow.keys() {
        if !fresh.contains_key(path) {
            events.push(MirrorEvent::removed(path.clone(), removed_at_millis));
        }
    }

    events
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::diff;
    use crate::zk_mirror::event::{MirrorEvent, MirrorEventKind, NodeRecord};

    fn record(version: i32, mtime_millis: i64, data: &[u8]) -> NodeRecord {
        NodeRecord {
            version,
            mtime_millis,
            data: data.to_vec(),
        }
    }

    fn tree(entries: &[(&str, NodeRecord)]) -> BTreeMap<String, NodeRecord> {
        entries.iter().map(|(p, n)| (p.to_string(), n.clone())).collect()
    }

    #[test]
    fn first_scan_is_all_additions() {
        let fresh = tree(&[
            ("/admin", record(0, 100, b"")),
            ("/admin/reassign_partitions", record(0, 150, b"{}")),
        ]);

        let events = diff(&BTreeMap::new(), &fresh, 999);

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == MirrorEventKind::Added));
        // Additions carry the znode mtime as event time
        assert_eq!(events[1].at_millis, 150);
    }

    #[test]
    fn version_change_is_an_update() {
        let shadow = tree(&[("/admin/x", record(0, 100, b"a"))]);
        let fresh = tree(&[("/admin/x", record(1, 200, b"b"))]);

        let events = diff(&shadow, &fresh, 999);

        assert_eq!(
            events,
            vec![MirrorEvent::updated("/admin/x".to_string(), record(1, 200, b"b"))]
        );
    }

    #[test]
    fn unchanged_nodes_emit_nothing() {
        let shadow = tree(&[("/admin/x", record(3, 100, b"a"))]);

        assert!(diff(&shadow, &shadow, 999).is_empty());
    }

    #[test]
    fn vanished_nodes_are_removals_at_observation_time() {
        let shadow = tree(&[
            ("/admin/x", record(0, 100, b"a")),
            ("/admin/y", record(0, 100, b"b")),
        ]);
        let fresh = tree(&[("/admin/y", record(0, 100, b"b"))]);

        let events = diff(&shadow, &fresh, 2000);

        assert_eq!(events, vec![MirrorEvent::removed("/admin/x".to_string(), 2000)]);
    }
}
