use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::{mpsc::Receiver, oneshot};
use tokio_util::sync::CancellationToken;

use super::messages::{
    ConsumedTopicState, ConsumerDescription, ConsumerDescriptions, ObserverCommand,
    ObserverMessage, ObserverQuery, TopicDescription, TopicDescriptions, TopicList,
};
use crate::admin_ops::{ElectionTracker, ReassignmentTracker};
use crate::constants::{BROKER_TOPICS_PATH, CONSUMERS_PATH, DELETE_TOPICS_PATH};
use crate::kafka_types::{leader_of_partition_state, Broker};
use crate::partition_offsets::LatestOffsetSource;
use crate::zk_mirror::MirrorRegister;

/// The mirror registers one observed cluster is composed of.
pub struct ClusterMirrors {
    /// Subtree mirror of `/brokers/topics`.
    pub topics: Arc<MirrorRegister>,

    /// Single-level mirror of `/brokers/ids`.
    pub brokers: Arc<MirrorRegister>,

    /// Single-level mirror of `/config/topics`.
    pub topic_configs: Arc<MirrorRegister>,

    /// Subtree mirror of `/consumers`.
    pub consumers: Arc<MirrorRegister>,

    /// Single-level mirror of `/admin/delete_topics`; `None` when the cluster
    /// does not support topic deletion.
    pub delete_topics: Option<Arc<MirrorRegister>>,
}

/// Engine behaviour knobs, injected at construction.
#[derive(Debug, Clone, Copy)]
pub struct ObserverConfig {
    /// Whether [`ObserverQuery::GetConsumers`] filters out groups that look inactive.
    pub filter_inactive_groups: bool,

    /// Minimum group-znode children for a group to count as active.
    ///
    /// An active group carries `ids/`, `offsets/` and `owners/`; the ZooKeeper
    /// layout has shifted between Kafka versions, hence a knob and not a constant.
    pub active_group_min_children: usize,
}

/// Serves the observer's read queries by composing mirror snapshots, stored
/// payloads, the admin operation trackers and the partition leaders' latest
/// offsets.
///
/// One engine serves one cluster, one message at a time: queries and tracker
/// commands arrive on the same queue, which makes their interleaving totally
/// ordered without further locking.
pub struct QueryEngine {
    mirrors: ClusterMirrors,
    offsets: Arc<dyn LatestOffsetSource>,
    config: ObserverConfig,
    elections: ElectionTracker,
    reassignments: ReassignmentTracker,
}

impl QueryEngine {
    /// Create a new [`QueryEngine`].
    ///
    /// # Arguments
    ///
    /// * `mirrors` - The cluster's mirror registers
    /// * `offsets` - Source of partition latest offsets
    /// * `config` - Behaviour knobs
    pub fn new(
        mirrors: ClusterMirrors,
        offsets: Arc<dyn LatestOffsetSource>,
        config: ObserverConfig,
    ) -> Self {
        Self {
            mirrors,
            offsets,
            config,
            elections: ElectionTracker::default(),
            reassignments: ReassignmentTracker::default(),
        }
    }

    /// Serve messages until the queue closes or shutdown is requested.
    pub async fn run(mut self, mut rx: Receiver<ObserverMessage>, shutdown_token: CancellationToken) {
        info!("Serving queries");

        loop {
            tokio::select! {
                maybe_message = rx.recv() => {
                    match maybe_message {
                        Some(ObserverMessage::Query(query)) => self.handle_query(query).await,
                        Some(ObserverMessage::Command(command)) => self.handle_command(command),
                        None => {
                            info!("Message queue closed: stopping");
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
    }

    async fn handle_query(&self, query: ObserverQuery) {
        trace!("Handling {query:?}");

        match query {
            ObserverQuery::GetTopics { reply } => {
                send_reply(reply, self.topic_list().await);
            },
            ObserverQuery::GetTopicDescription { topic, reply } => {
                send_reply(reply, self.topic_description(&topic).await);
            },
            ObserverQuery::GetTopicDescriptions { topics, reply } => {
                send_reply(reply, self.topic_descriptions(&topics).await);
            },
            ObserverQuery::GetAllTopicDescriptions { since_millis, reply } => {
                send_reply(reply, self.all_topic_descriptions(since_millis).await);
            },
            ObserverQuery::GetTopicConfig { topic, reply } => {
                send_reply(reply, self.topic_config(&topic).await);
            },
            ObserverQuery::GetConsumers { reply } => {
                send_reply(reply, self.consumer_groups().await);
            },
            ObserverQuery::GetConsumerDescription { group, reply } => {
                send_reply(reply, self.consumer_description(&group).await);
            },
            ObserverQuery::GetConsumerDescriptions { groups, reply } => {
                send_reply(reply, self.consumer_descriptions(&groups).await);
            },
            ObserverQuery::GetAllConsumerDescriptions { since_millis, reply } => {
                send_reply(reply, self.all_consumer_descriptions(since_millis).await);
            },
            ObserverQuery::GetConsumedTopicState { group, topic, reply } => {
                send_reply(reply, self.consumed_topic_state(&group, &topic).await);
            },
            ObserverQuery::GetBrokers { reply } => {
                let brokers = Broker::from_ids_snapshot(&self.mirrors.brokers.snapshot().await);
                send_reply(reply, brokers);
            },
            ObserverQuery::GetPreferredLeaderElection { reply } => {
                send_reply(reply, self.elections.current());
            },
            ObserverQuery::GetReassignPartition { reply } => {
                send_reply(reply, self.reassignments.current());
            },
            ObserverQuery::GetTopicsLastUpdateMillis { reply } => {
                send_reply(reply, self.mirrors.topics.last_update_millis());
            },
        }
    }

    fn handle_command(&mut self, command: ObserverCommand) {
        trace!("Handling {command:?}");

        match command {
            ObserverCommand::UpdatePreferredLeaderElection { at_millis, payload } => {
                self.elections.apply_update(at_millis, &payload);
            },
            ObserverCommand::EndPreferredLeaderElection { at_millis } => {
                self.elections.apply_end(at_millis);
            },
            ObserverCommand::UpdateReassignPartition { at_millis, payload } => {
                self.reassignments.apply_update(at_millis, &payload);
            },
            ObserverCommand::EndReassignPartition { at_millis } => {
                self.reassignments.apply_end(at_millis);
            },
        }
    }

    async fn topic_list(&self) -> TopicList {
        let topics = self.mirrors.topics.child_names(BROKER_TOPICS_PATH).await;

        let pending_deletion = match &self.mirrors.delete_topics {
            Some(register) => {
                register.child_names(DELETE_TOPICS_PATH).await.into_iter().collect()
            },
            None => BTreeSet::new(),
        };

        TopicList {
            topics,
            pending_deletion,
        }
    }

    /// Compose the denormalised description of one Topic.
    ///
    /// Returns `None` only when the topic znode itself is absent. Everything
    /// else degrades per partition: a missing state znode drops the partition
    /// from the state map, an unparsable state leaves its leader unresolved,
    /// an unreachable leader leaves the latest offset unknown.
    async fn topic_description(&self, topic: &str) -> Option<TopicDescription> {
        let topic_path = format!("{BROKER_TOPICS_PATH}/{topic}");
        let raw_state = self.mirrors.topics.data_at(&topic_path).await?;

        let partitions_path = format!("{topic_path}/partitions");
        let mut partition_state_json = BTreeMap::new();
        let mut leaders = BTreeMap::new();

        for name in self.mirrors.topics.child_names(&partitions_path).await {
            let partition = match name.parse::<u32>() {
                Ok(partition) => partition,
                Err(_) => {
                    warn!("Ignoring partition znode '{name}' of topic '{topic}': not a partition id");
                    continue;
                },
            };

            match self.mirrors.topics.data_at(&format!("{partitions_path}/{name}/state")).await {
                Some((_, data)) => {
                    let json = String::from_utf8_lossy(&data).into_owned();
                    leaders.insert(partition, leader_of_partition_state(&json));
                    partition_state_json.insert(partition, json);
                },
                None => {
                    debug!("Topic '{topic}' partition {partition} has no state znode: skipping");
                },
            }
        }

        let partition_latest_offsets = self.offsets.latest_offsets(topic, &leaders).await;

        Some(TopicDescription {
            topic: topic.to_string(),
            raw_state,
            partition_state_json,
            partition_latest_offsets,
            config: self.topic_config(topic).await,
            delete_supported: self.mirrors.delete_topics.is_some(),
        })
    }

    async fn topic_config(&self, topic: &str) -> Option<(i32, Vec<u8>)> {
        self.mirrors
            .topic_configs
            .snapshot()
            .await
            .into_iter()
            .find(|(path, _, _)| path.rsplit('/').next() == Some(topic))
            .map(|(_, version, data)| (version, data))
    }

    async fn topic_descriptions(&self, topics: &[String]) -> TopicDescriptions {
        let mut descriptions = Vec::with_capacity(topics.len());

        for topic in topics {
            if let Some(description) = self.topic_description(topic).await {
                descriptions.push(description);
            }
        }

        TopicDescriptions {
            descriptions,
            last_update_millis: self.mirrors.topics.last_update_millis(),
        }
    }

    async fn all_topic_descriptions(&self, since_millis: i64) -> Option<TopicDescriptions> {
        if self.mirrors.topics.last_update_millis() <= since_millis {
            return None; //< no novelty for this caller
        }

        let topics = self.mirrors.topics.child_names(BROKER_TOPICS_PATH).await;
        Some(self.topic_descriptions(&topics).await)
    }

    async fn consumer_groups(&self) -> Vec<String> {
        let groups = self.mirrors.consumers.child_names(CONSUMERS_PATH).await;

        if !self.config.filter_inactive_groups {
            return groups;
        }

        let mut active = Vec::with_capacity(groups.len());
        for group in groups {
            let children =
                self.mirrors.consumers.child_names(&format!("{CONSUMERS_PATH}/{group}")).await;
            if children.len() >= self.config.active_group_min_children {
                active.push(group);
            } else {
                trace!(
                    "Group '{group}' looks inactive ({} group znode children): filtered out",
                    children.len()
                );
            }
        }
        active
    }

    /// Compose what `group` knows about `topic`.
    ///
    /// Produced only if at least one of the group's `offsets/` or `owners/`
    /// subtrees exists for the topic.
    async fn consumed_topic_state(&self, group: &str, topic: &str) -> Option<ConsumedTopicState> {
        let offsets_path = format!("{CONSUMERS_PATH}/{group}/offsets/{topic}");
        let owners_path = format!("{CONSUMERS_PATH}/{group}/owners/{topic}");

        if !self.mirrors.consumers.has_node(&offsets_path).await
            && !self.mirrors.consumers.has_node(&owners_path).await
        {
            return None;
        }

        let mut committed_offsets = BTreeMap::new();
        for (name, (_, data)) in self.mirrors.consumers.children_of(&offsets_path).await {
            let partition = match name.parse::<u32>() {
                Ok(partition) => partition,
                Err(_) => {
                    warn!("Ignoring offset znode '{name}' of group '{group}': not a partition id");
                    continue;
                },
            };
            let text = String::from_utf8_lossy(&data).into_owned();
            match text.trim().parse::<u64>() {
                Ok(offset) => {
                    committed_offsets.insert(partition, offset);
                },
                Err(_) => {
                    error!(
                        "Committed offset of group '{group}' for '{topic}:{partition}' \
                         is not a number: '{text}'"
                    );
                },
            }
        }

        let mut partition_owners = BTreeMap::new();
        for (name, (_, data)) in self.mirrors.consumers.children_of(&owners_path).await {
            let partition = match name.parse::<u32>() {
                Ok(partition) => partition,
                Err(_) => {
                    warn!("Ignoring owner znode '{name}' of group '{group}': not a partition id");
                    continue;
                },
            };
            partition_owners.insert(partition, String::from_utf8_lossy(&data).into_owned());
        }

        let (topic_latest_offsets, state_count) = match self.topic_description(topic).await {
            Some(description) => {
                let count = description.partition_state_json.len();
                (description.partition_latest_offsets, count)
            },
            None => (BTreeMap::new(), 0), //< topic is gone, offsets unknown
        };

        Some(ConsumedTopicState {
            group: group.to_string(),
            topic: topic.to_string(),
            partition_count: state_count.max(committed_offsets.len()),
            topic_latest_offsets,
            partition_owners,
            committed_offsets,
        })
    }

    async fn consumer_description(&self, group: &str) -> Option<ConsumerDescription> {
        if !self.mirrors.consumers.has_node(&format!("{CONSUMERS_PATH}/{group}")).await {
            return None;
        }

        let mut topics = BTreeMap::new();
        for topic in
            self.mirrors.consumers.child_names(&format!("{CONSUMERS_PATH}/{group}/offsets")).await
        {
            if let Some(state) = self.consumed_topic_state(group, &topic).await {
                topics.insert(topic, state);
            }
        }

        Some(ConsumerDescription {
            group: group.to_string(),
            topics,
        })
    }

    async fn consumer_descriptions(&self, groups: &[String]) -> ConsumerDescriptions {
        let mut descriptions = Vec::with_capacity(groups.len());

        for group in groups {
            if let Some(description) = self.consumer_description(group).await {
                descriptions.push(description);
            }
        }

        ConsumerDescriptions {
            descriptions,
            last_update_millis: self.mirrors.consumers.last_update_millis(),
        }
    }

    async fn all_consumer_descriptions(&self, since_millis: i64) -> Option<ConsumerDescriptions> {
        if self.mirrors.consumers.last_update_millis() <= since_millis {
            return None; //< no novelty for this caller
        }

        let groups = self.consumer_groups().await;
        Some(self.consumer_descriptions(&groups).await)
    }
}

fn send_reply<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        warn!("Query reply receiver dropped before the response was sent");
    }
}
