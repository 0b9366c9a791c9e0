use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rdkafka::{
    consumer::{BaseConsumer, Consumer},
    ClientConfig,
};
use tokio::time::Duration;

use super::errors::OffsetFetchError;
use crate::constants::OFFSET_FETCHER_CLIENT_ID;
use crate::kafka_types::Broker;
use crate::zk_mirror::MirrorRegister;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const SOCKET_TIMEOUT_MS: &str = "10000";
const RECEIVE_MAX_BYTES: &str = "100000";

/// Source of the latest (log-end) offset per partition of a Topic.
///
/// The query engine reaches offsets through this seam, so the backend is
/// swappable; tests substitute a canned source.
#[async_trait]
pub trait LatestOffsetSource: Send + Sync {
    /// Latest offset per partition; `None` where the offset could not be read.
    ///
    /// Implementations never fail the call as a whole: a partition whose
    /// leader is unresolved or unreachable is reported as unknown, and the
    /// rest of the map is still meaningful.
    ///
    /// # Arguments
    ///
    /// * `topic` - Topic the partitions belong to
    /// * `leaders` - Leader Broker id per partition, `None` for unresolved leaders
    async fn latest_offsets(
        &self,
        topic: &str,
        leaders: &BTreeMap<u32, Option<u32>>,
    ) -> BTreeMap<u32, Option<u64>>;
}

/// Fetches partition latest offsets straight from each partition leader.
///
/// Leader ids are resolved against the `/brokers/ids` mirror; per leader, a
/// short-lived Kafka consumer is pointed directly at `host:port` and asked
/// for the high watermark of each led partition.
pub struct OffsetFetcher {
    client_config: ClientConfig,
    brokers: Arc<MirrorRegister>,
}

impl OffsetFetcher {
    /// Create a new [`OffsetFetcher`].
    ///
    /// # Arguments
    ///
    /// * `client_config` - Base Kafka client configuration; bootstrap and
    ///   identity are overridden per leader
    /// * `brokers` - Mirror register of `/brokers/ids`, to resolve leader ids
    pub fn new(client_config: ClientConfig, brokers: Arc<MirrorRegister>) -> Self {
        Self {
            client_config,
            brokers,
        }
    }

    fn consumer_for(&self, broker: &Broker) -> Result<BaseConsumer, OffsetFetchError> {
        let bootstrap = format!("{}:{}", broker.host, broker.port);

        let mut config = self.client_config.clone();
        config
            .set("bootstrap.servers", bootstrap.clone())
            .set("client.id", OFFSET_FETCHER_CLIENT_ID)
            .set("socket.timeout.ms", SOCKET_TIMEOUT_MS)
            .set("receive.message.max.bytes", RECEIVE_MAX_BYTES);

        config.create().map_err(|e| OffsetFetchError::ConsumerBuild(broker.id, bootstrap, e))
    }
}

#[async_trait]
impl LatestOffsetSource for OffsetFetcher {
    async fn latest_offsets(
        &self,
        topic: &str,
        leaders: &BTreeMap<u32, Option<u32>>,
    ) -> BTreeMap<u32, Option<u64>> {
        // Every requested partition gets an answer, if only "unknown"
        let mut offsets: BTreeMap<u32, Option<u64>> =
            leaders.keys().map(|p| (*p, None)).collect();

        let known = Broker::from_ids_snapshot(&self.brokers.snapshot().await);

        for (leader_id, partitions) in partitions_by_leader(leaders) {
            let broker = match known.iter().find(|b| b.id == leader_id) {
                Some(broker) => broker,
                None => {
                    debug!(
                        "Leader broker {leader_id} of topic '{topic}' is not registered: \
                         leaving {} partition(s) unknown",
                        partitions.len()
                    );
                    continue;
                },
            };

            let consumer = match self.consumer_for(broker) {
                Ok(consumer) => consumer,
                Err(e) => {
                    error!("{e}");
                    continue;
                },
            };

            for partition in partitions {
                match consumer.fetch_watermarks(topic, partition as i32, FETCH_TIMEOUT) {
                    Ok((_, latest)) => {
                        offsets.insert(partition, Some(latest as u64));
                    },
                    Err(e) => {
                        error!(
                            "{}",
                            OffsetFetchError::WatermarkFetch(
                                topic.to_string(),
                                partition,
                                broker.id,
                                e
                            )
                        );
                    },
                }
            }
        }

        offsets
    }
}

/// Group partitions by their resolved leader id; unresolved leaders drop out
/// (their partitions stay at "unknown offset" in the caller's result).
fn partitions_by_leader(leaders: &BTreeMap<u32, Option<u32>>) -> BTreeMap<u32, Vec<u32>> {
    let mut by_leader: BTreeMap<u32, Vec<u32>> = BTreeMap::new();

    for (partition, leader) in leaders {
        if let Some(leader) = leader {
            by_leader.entry(*leader).or_default().push(*partition);
        }
    }

    by_leader
}
