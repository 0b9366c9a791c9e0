// Inner modules
mod broker;
mod partition_state;
mod topic_partition;

// Exports
pub use broker::Broker;
pub use partition_state::leader_of_partition_state;
pub use topic_partition::TopicPartition;
