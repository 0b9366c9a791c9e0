/// ZooKeeper path where Kafka Brokers register themselves.
///
/// Children are broker ids; each child holds the broker registration JSON.
pub const BROKER_IDS_PATH: &str = "/brokers/ids";

/// ZooKeeper subtree where Kafka keeps Topic assignment and Partition state.
pub const BROKER_TOPICS_PATH: &str = "/brokers/topics";

/// ZooKeeper path where Kafka keeps per-Topic config overrides.
pub const TOPIC_CONFIGS_PATH: &str = "/config/topics";

/// ZooKeeper subtree where (old style) Consumer Groups keep offsets and ownership.
pub const CONSUMERS_PATH: &str = "/consumers";

/// ZooKeeper path where Kafka admin operations are triggered.
pub const ADMIN_PATH: &str = "/admin";

/// ZooKeeper path listing Topics pending deletion.
///
/// Only mirrored when the cluster supports topic deletion.
pub const DELETE_TOPICS_PATH: &str = "/admin/delete_topics";

/// Name of the `/admin` child that triggers a preferred replica leader election.
pub const PREFERRED_REPLICA_ELECTION_NODE: &str = "preferred_replica_election";

/// Name of the `/admin` child that triggers a partition reassignment.
pub const REASSIGN_PARTITIONS_NODE: &str = "reassign_partitions";

/// `client.id` used by the Kafka Consumers that fetch partition latest offsets.
pub const OFFSET_FETCHER_CLIENT_ID: &str = "partitionOffsetGetter";

/// The default ZooKeeper session timeout, in milliseconds.
pub const DEFAULT_ZK_SESSION_TIMEOUT_MS: &str = "30000"; //< `u64` after parsing

/// The default interval between full mirror resyncs, in seconds.
///
/// Resyncs are the safety net for lost ZooKeeper watches: between resyncs,
/// mirrors are driven by watch notifications alone.
pub const DEFAULT_RESYNC_INTERVAL_SECS: &str = "60"; //< `u64` after parsing

/// The default minimum amount of group znode children for a Consumer Group
/// to be considered "active".
///
/// An active group znode carries all of `ids/`, `offsets/` and `owners/`.
pub const DEFAULT_ACTIVE_GROUP_MIN_CHILDREN: &str = "3"; //< `usize` after parsing
