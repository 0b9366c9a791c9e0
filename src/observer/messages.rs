use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::oneshot;

use crate::admin_ops::{PreferredReplicaElection, ReassignPartitions};
use crate::kafka_types::Broker;

/// Topic names currently present in the cluster, with those pending deletion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopicList {
    pub topics: Vec<String>,

    /// Always empty when the cluster does not support topic deletion.
    pub pending_deletion: BTreeSet<String>,
}

/// Denormalised description of one Topic, composed out of the topics mirror,
/// the config mirror and the partition leaders' latest offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub topic: String,

    /// `(version, data)` of the topic znode: the raw partition assignment JSON,
    /// passed through verbatim.
    pub raw_state: (i32, Vec<u8>),

    /// Raw partition state JSON per partition.
    ///
    /// Partitions whose state znode is missing are absent from the map.
    pub partition_state_json: BTreeMap<u32, String>,

    /// Latest (log-end) offset per partition, `None` where it could not be read.
    pub partition_latest_offsets: BTreeMap<u32, Option<u64>>,

    /// `(version, data)` of the topic config override znode, if any.
    pub config: Option<(i32, Vec<u8>)>,

    /// Whether this cluster supports topic deletion.
    pub delete_supported: bool,
}

/// A batch of [`TopicDescription`]s, stamped with the topics mirror freshness.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopicDescriptions {
    pub descriptions: Vec<TopicDescription>,
    pub last_update_millis: i64,
}

/// What one Consumer Group knows about one consumed Topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedTopicState {
    pub group: String,
    pub topic: String,

    /// Upper bound on the partitions involved: the larger of the topic's
    /// partition-state count and the committed-offset count.
    pub partition_count: usize,

    /// Latest topic offsets per partition; empty when the topic is gone.
    pub topic_latest_offsets: BTreeMap<u32, Option<u64>>,

    /// Owner id per partition, out of the group's `owners/` subtree.
    pub partition_owners: BTreeMap<u32, String>,

    /// Committed offset per partition, out of the group's `offsets/` subtree.
    pub committed_offsets: BTreeMap<u32, u64>,
}

/// Denormalised description of one Consumer Group across the Topics it consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerDescription {
    pub group: String,
    pub topics: BTreeMap<String, ConsumedTopicState>,
}

/// A batch of [`ConsumerDescription`]s, stamped with the consumers mirror freshness.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsumerDescriptions {
    pub descriptions: Vec<ConsumerDescription>,
    pub last_update_millis: i64,
}

/// The read requests the observer serves.
///
/// Replies travel over the enclosed [`oneshot::Sender`]s. The two `GetAll*`
/// delta queries reply `None` when nothing changed since the caller-provided
/// `since_millis`.
#[derive(Debug)]
pub enum ObserverQuery {
    GetTopics {
        reply: oneshot::Sender<TopicList>,
    },
    GetTopicDescription {
        topic: String,
        reply: oneshot::Sender<Option<TopicDescription>>,
    },
    GetTopicDescriptions {
        topics: Vec<String>,
        reply: oneshot::Sender<TopicDescriptions>,
    },
    GetAllTopicDescriptions {
        since_millis: i64,
        reply: oneshot::Sender<Option<TopicDescriptions>>,
    },
    GetTopicConfig {
        topic: String,
        reply: oneshot::Sender<Option<(i32, Vec<u8>)>>,
    },
    GetConsumers {
        reply: oneshot::Sender<Vec<String>>,
    },
    GetConsumerDescription {
        group: String,
        reply: oneshot::Sender<Option<ConsumerDescription>>,
    },
    GetConsumerDescriptions {
        groups: Vec<String>,
        reply: oneshot::Sender<ConsumerDescriptions>,
    },
    GetAllConsumerDescriptions {
        since_millis: i64,
        reply: oneshot::Sender<Option<ConsumerDescriptions>>,
    },
    GetConsumedTopicState {
        group: String,
        topic: String,
        reply: oneshot::Sender<Option<ConsumedTopicState>>,
    },
    GetBrokers {
        reply: oneshot::Sender<Vec<Broker>>,
    },
    GetPreferredLeaderElection {
        reply: oneshot::Sender<Option<PreferredReplicaElection>>,
    },
    GetReassignPartition {
        reply: oneshot::Sender<Option<ReassignPartitions>>,
    },
    GetTopicsLastUpdateMillis {
        reply: oneshot::Sender<i64>,
    },
}

/// Internal commands, emitted by the admin event router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverCommand {
    UpdatePreferredLeaderElection { at_millis: i64, payload: Vec<u8> },
    EndPreferredLeaderElection { at_millis: i64 },
    UpdateReassignPartition { at_millis: i64, payload: Vec<u8> },
    EndReassignPartition { at_millis: i64 },
}

/// Everything that can land on the observer's message queue.
#[derive(Debug)]
pub enum ObserverMessage {
    Query(ObserverQuery),
    Command(ObserverCommand),
}
