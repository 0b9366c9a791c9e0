//! Kafka cluster state observer.
//!
//! One observer mirrors the live state of one Kafka 0.8.x cluster — brokers,
//! topics, partitions, consumer groups and in-flight admin operations — by
//! maintaining incremental caches over its ZooKeeper subtree, and serves read
//! queries over that materialised view together with the latest partition
//! offsets fetched directly from partition leaders.
//!
//! The host talks to an observer through an [`observer::ObserverHandle`];
//! everything else in here is plumbing behind it.

#[macro_use]
extern crate log;

pub mod admin_ops;
pub mod cli;
pub mod constants;
pub mod internals;
pub mod kafka_types;
pub mod logging;
pub mod observer;
pub mod partition_offsets;
pub mod zk_mirror;
