// Inner modules
mod engine;
mod handle;
mod messages;

// Exports
pub use engine::{ClusterMirrors, ObserverConfig, QueryEngine};
pub use handle::{ObserverError, ObserverHandle, ObserverResult};
pub use messages::{
    ConsumedTopicState, ConsumerDescription, ConsumerDescriptions, ObserverCommand,
    ObserverMessage, ObserverQuery, TopicDescription, TopicDescriptions, TopicList,
};

// Imports
use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::partition_offsets::LatestOffsetSource;

const CHANNEL_SIZE: usize = 64;

/// Start the observer: one [`QueryEngine`] actor over one message queue.
///
/// # Arguments
///
/// * `mirrors` - The cluster's mirror registers
/// * `offsets` - Source of partition latest offsets
/// * `config` - Engine behaviour knobs
/// * `shutdown_token` - A [`CancellationToken`] to stop the engine
pub fn init(
    mirrors: ClusterMirrors,
    offsets: Arc<dyn LatestOffsetSource>,
    config: ObserverConfig,
    shutdown_token: CancellationToken,
) -> (ObserverHandle, JoinHandle<()>) {
    let (sx, rx) = mpsc::channel::<ObserverMessage>(CHANNEL_SIZE);

    let engine = QueryEngine::new(mirrors, offsets, config);
    let join = tokio::spawn(engine.run(rx, shutdown_token));

    debug!("Initialized");
    (ObserverHandle::new(sx), join)
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::{init, ClusterMirrors, ObserverCommand, ObserverConfig, ObserverMessage};
    use crate::partition_offsets::LatestOffsetSource;
    use crate::zk_mirror::{MirrorEvent, MirrorRegister, MirrorState, NodeRecord};

    /// Source that knows no offsets at all: every partition answers "unknown".
    struct NullOffsets;

    #[async_trait]
    impl LatestOffsetSource for NullOffsets {
        async fn latest_offsets(
            &self,
            _topic: &str,
            leaders: &BTreeMap<u32, Option<u32>>,
        ) -> BTreeMap<u32, Option<u64>> {
            leaders.keys().map(|p| (*p, None)).collect()
        }
    }

    fn register(root: &str, nodes: &[(&str, &[u8])]) -> Arc<MirrorRegister> {
        let mut state = MirrorState::new(root.to_string());
        for (i, (path, data)) in nodes.iter().enumerate() {
            state.apply(&MirrorEvent::added(
                path.to_string(),
                NodeRecord {
                    version: 0,
                    mtime_millis: i as i64 + 1,
                    data: data.to_vec(),
                },
            ));
        }
        Arc::new(MirrorRegister::with_state(state))
    }

    fn small_cluster() -> ClusterMirrors {
        ClusterMirrors {
            topics: register(
                "/brokers/topics",
                &[
                    ("/brokers/topics", b""),
                    ("/brokers/topics/t", br#"{"version":1,"partitions":{"0":[1]}}"#),
                    ("/brokers/topics/t/partitions", b""),
                    ("/brokers/topics/t/partitions/0", b""),
                    ("/brokers/topics/t/partitions/0/state", br#"{"leader":1,"isr":[1]}"#),
                ],
            ),
            brokers: register(
                "/brokers/ids",
                &[("/brokers/ids", b""), ("/brokers/ids/1", br#"{"host":"b1","port":9092}"#)],
            ),
            topic_configs: register(
                "/config/topics",
                &[("/config/topics", b""), ("/config/topics/t", br#"{"retention.ms":"1"}"#)],
            ),
            consumers: register(
                "/consumers",
                &[
                    ("/consumers", b""),
                    ("/consumers/g", b""),
                    ("/consumers/g/offsets", b""),
                    ("/consumers/g/offsets/t", b""),
                    ("/consumers/g/offsets/t/0", b"42"),
                ],
            ),
            delete_topics: None,
        }
    }

    fn observer() -> (super::ObserverHandle, CancellationToken) {
        let shutdown_token = CancellationToken::new();
        let (handle, _) = init(
            small_cluster(),
            Arc::new(NullOffsets),
            ObserverConfig {
                filter_inactive_groups: false,
                active_group_min_children: 3,
            },
            shutdown_token.clone(),
        );
        (handle, shutdown_token)
    }

    #[tokio::test]
    async fn the_whole_message_surface_round_trips() {
        let (handle, shutdown_token) = observer();

        let list = handle.get_topics().await.unwrap();
        assert_eq!(list.topics, vec!["t"]);
        assert!(list.pending_deletion.is_empty());

        let description = handle.get_topic_description("t").await.unwrap().unwrap();
        assert_eq!(description.partition_latest_offsets, BTreeMap::from([(0, None)]));
        assert!(handle.get_topic_description("ghost").await.unwrap().is_none());

        let batch = handle
            .get_topic_descriptions(vec!["t".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.descriptions.len(), 1);

        assert!(handle.get_topic_config("t").await.unwrap().is_some());

        assert_eq!(handle.get_consumers().await.unwrap(), vec!["g"]);
        assert!(handle.get_consumer_description("g").await.unwrap().is_some());
        assert_eq!(
            handle.get_consumer_descriptions(vec!["g".to_string()]).await.unwrap().descriptions.len(),
            1
        );

        let state = handle.get_consumed_topic_state("g", "t").await.unwrap().unwrap();
        assert_eq!(state.committed_offsets, BTreeMap::from([(0, 42)]));

        let brokers = handle.get_brokers().await.unwrap();
        assert_eq!(brokers.len(), 1);
        assert_eq!(brokers[0].host, "b1");

        assert!(handle.get_preferred_leader_election().await.unwrap().is_none());
        assert!(handle.get_reassign_partition().await.unwrap().is_none());

        // Registers were built without feeding tasks, so the clocks never moved:
        // the delta queries answer accordingly
        assert_eq!(handle.get_topics_last_update_millis().await.unwrap(), 0);
        assert!(handle.get_all_topic_descriptions(0).await.unwrap().is_none());
        assert!(handle.get_all_consumer_descriptions(-1).await.unwrap().is_some());

        shutdown_token.cancel();
    }

    #[tokio::test]
    async fn commands_serialise_with_queries_on_the_same_queue() {
        let (handle, shutdown_token) = observer();
        let queue = handle.message_queue();

        queue
            .send(ObserverMessage::Command(ObserverCommand::UpdatePreferredLeaderElection {
                at_millis: 1000,
                payload: br#"{"version":1,"partitions":[{"topic":"t","partition":0}]}"#.to_vec(),
            }))
            .await
            .unwrap();
        queue
            .send(ObserverMessage::Command(ObserverCommand::EndPreferredLeaderElection {
                at_millis: 2000,
            }))
            .await
            .unwrap();

        // Enqueued after both commands, so it observes both
        let election = handle.get_preferred_leader_election().await.unwrap().unwrap();
        assert_eq!(election.started_at_millis, 1000);
        assert_eq!(election.ended_at_millis, Some(2000));

        shutdown_token.cancel();
    }
}
