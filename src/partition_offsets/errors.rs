use rdkafka::error::KafkaError;
use thiserror::Error;

/// Possible errors from the [`super::fetcher`] module.
///
/// These never reach a query caller: the fetcher logs them and reports the
/// affected partition offsets as unknown instead.
#[derive(Error, Debug)]
pub enum OffsetFetchError {
    /// A per-leader Kafka consumer could not be built.
    #[error("Failed to build consumer for broker {0} at {1}: {2}")]
    ConsumerBuild(u32, String, KafkaError),

    /// A watermark fetch against a partition leader failed.
    #[error("Failed to fetch latest offset of '{0}:{1}' from broker {2}: {3}")]
    WatermarkFetch(String, u32, u32, KafkaError),
}
