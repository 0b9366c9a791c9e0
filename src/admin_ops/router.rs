use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::constants::{PREFERRED_REPLICA_ELECTION_NODE, REASSIGN_PARTITIONS_NODE};
use crate::observer::{ObserverCommand, ObserverMessage};
use crate::zk_mirror::{MirrorEvent, MirrorEventKind};

/// Translate one `/admin` mirror event into an observer command.
///
/// Only the two tracked operation znodes matter; events about the `/admin`
/// root itself, or about any other child, yield nothing.
pub(crate) fn route(event: &MirrorEvent) -> Option<ObserverCommand> {
    let name = event.path.rsplit('/').next().unwrap_or_default();

    match (name, event.kind) {
        (PREFERRED_REPLICA_ELECTION_NODE, MirrorEventKind::Added | MirrorEventKind::Updated) => {
            Some(ObserverCommand::UpdatePreferredLeaderElection {
                at_millis: event.at_millis,
                payload: event.node.as_ref()?.data.clone(),
            })
        },
        (PREFERRED_REPLICA_ELECTION_NODE, MirrorEventKind::Removed) => {
            Some(ObserverCommand::EndPreferredLeaderElection {
                at_millis: event.at_millis,
            })
        },
        (REASSIGN_PARTITIONS_NODE, MirrorEventKind::Added | MirrorEventKind::Updated) => {
            Some(ObserverCommand::UpdateReassignPartition {
                at_millis: event.at_millis,
                payload: event.node.as_ref()?.data.clone(),
            })
        },
        (REASSIGN_PARTITIONS_NODE, MirrorEventKind::Removed) => {
            Some(ObserverCommand::EndReassignPartition {
                at_millis: event.at_millis,
            })
        },
        _ => None,
    }
}

/// Spawn the async task that feeds `/admin` mirror events, translated to
/// commands, into the observer's message queue.
///
/// Routing through the same queue that serves queries keeps operation tracker
/// transitions totally ordered with respect to the queries that read them.
///
/// # Arguments
///
/// * `admin_rx` - Channel [`mpsc::Receiver`] of the `/admin` mirror emitter
/// * `observer_sx` - The observer's message queue
/// * `shutdown_token` - A [`CancellationToken`] to stop the routing
pub fn init(
    mut admin_rx: mpsc::Receiver<MirrorEvent>,
    observer_sx: mpsc::Sender<ObserverMessage>,
    shutdown_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe_event = admin_rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Some(command) = route(&event) {
                                trace!("Routing admin event for '{}' as {:?}", event.path, command);
                                if observer_sx.send(ObserverMessage::Command(command)).await.is_err() {
                                    info!("Observer message queue closed: stopping admin event routing");
                                    break;
                                }
                            }
                        },
                        None => {
                            info!("Admin mirror emitter stopped: stopping admin event routing");
                            break;
                        },
                    }
                },
                _ = shutdown_token.cancelled() => {
                    info!("Shutting down");
                    break;
                },
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::route;
    use crate::observer::ObserverCommand;
    use crate::zk_mirror::{MirrorEvent, NodeRecord};

    fn node(data: &[u8], mtime_millis: i64) -> NodeRecord {
        NodeRecord {
            version: 0,
            mtime_millis,
            data: data.to_vec(),
        }
    }

    #[test]
    fn election_events_route_to_election_commands() {
        let added = MirrorEvent::added(
            "/admin/preferred_replica_election".to_string(),
            node(b"{}", 1000),
        );
        match route(&added) {
            Some(ObserverCommand::UpdatePreferredLeaderElection { at_millis, payload }) => {
                assert_eq!(at_millis, 1000);
                assert_eq!(payload, b"{}");
            },
            other => panic!("Unexpected routing: {other:?}"),
        }

        let removed = MirrorEvent::removed("/admin/preferred_replica_election".to_string(), 2000);
        assert_eq!(
            route(&removed),
            Some(ObserverCommand::EndPreferredLeaderElection { at_millis: 2000 })
        );
    }

    #[test]
    fn reassignment_events_route_to_reassignment_commands() {
        let updated = MirrorEvent::updated(
            "/admin/reassign_partitions".to_string(),
            node(b"{}", 1500),
        );
        match route(&updated) {
            Some(ObserverCommand::UpdateReassignPartition { at_millis, .. }) => {
                assert_eq!(at_millis, 1500);
            },
            other => panic!("Unexpected routing: {other:?}"),
        }

        let removed = MirrorEvent::removed("/admin/reassign_partitions".to_string(), 2500);
        assert_eq!(
            route(&removed),
            Some(ObserverCommand::EndReassignPartition { at_millis: 2500 })
        );
    }

    #[test]
    fn other_admin_children_are_ignored() {
        let root = MirrorEvent::added("/admin".to_string(), node(b"", 100));
        assert_eq!(route(&root), None);

        let unrelated = MirrorEvent::added("/admin/delete_topics".to_string(), node(b"", 100));
        assert_eq!(route(&unrelated), None);
    }
}
