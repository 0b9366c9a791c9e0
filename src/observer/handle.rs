use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::messages::{
    ConsumedTopicState, ConsumerDescription, ConsumerDescriptions, ObserverMessage, ObserverQuery,
    TopicDescription, TopicDescriptions, TopicList,
};
use crate::admin_ops::{PreferredReplicaElection, ReassignPartitions};
use crate::kafka_types::Broker;

/// Possible errors when talking to the observer through an [`ObserverHandle`].
#[derive(Error, Debug, Eq, PartialEq)]
pub enum ObserverError {
    /// The observer is gone (shut down, or crashed and awaiting its
    /// supervisor); the request cannot be served.
    #[error("Observer is not serving requests")]
    Unavailable,
}

pub type ObserverResult<T> = Result<T, ObserverError>;

/// Cloneable, typed front door to one observer.
///
/// Each method enqueues one [`ObserverQuery`] and awaits its reply; requests
/// are served by the observer one at a time, in arrival order.
#[derive(Clone)]
pub struct ObserverHandle {
    sx: mpsc::Sender<ObserverMessage>,
}

impl ObserverHandle {
    pub(crate) fn new(sx: mpsc::Sender<ObserverMessage>) -> Self {
        Self {
            sx,
        }
    }

    /// The raw message queue, for feeders that enqueue commands directly.
    pub fn message_queue(&self) -> mpsc::Sender<ObserverMessage> {
        self.sx.clone()
    }

    async fn query<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ObserverQuery,
    ) -> ObserverResult<T> {
        let (reply_sx, reply_rx) = oneshot::channel();

        self.sx
            .send(ObserverMessage::Query(make(reply_sx)))
            .await
            .map_err(|_| ObserverError::Unavailable)?;

        reply_rx.await.map_err(|_| ObserverError::Unavailable)
    }

    pub async fn get_topics(&self) -> ObserverResult<TopicList> {
        self.query(|reply| ObserverQuery::GetTopics {
            reply,
        })
        .await
    }

    pub async fn get_topic_description(
        &self,
        topic: &str,
    ) -> ObserverResult<Option<TopicDescription>> {
        let topic = topic.to_string();
        self.query(|reply| ObserverQuery::GetTopicDescription {
            topic,
            reply,
        })
        .await
    }

    pub async fn get_topic_descriptions(
        &self,
        topics: Vec<String>,
    ) -> ObserverResult<TopicDescriptions> {
        self.query(|reply| ObserverQuery::GetTopicDescriptions {
            topics,
            reply,
        })
        .await
    }

    /// `Ok(None)` means: nothing changed since `since_millis`.
    pub async fn get_all_topic_descriptions(
        &self,
        since_millis: i64,
    ) -> ObserverResult<Option<TopicDescriptions>> {
        self.query(|reply| ObserverQuery::GetAllTopicDescriptions {
            since_millis,
            reply,
        })
        .await
    }

    pub async fn get_topic_config(&self, topic: &str) -> ObserverResult<Option<(i32, Vec<u8>)>> {
        let topic = topic.to_string();
        self.query(|reply| ObserverQuery::GetTopicConfig {
            topic,
            reply,
        })
        .await
    }

    pub async fn get_consumers(&self) -> ObserverResult<Vec<String>> {
        self.query(|reply| ObserverQuery::GetConsumers {
            reply,
        })
        .await
    }

    pub async fn get_consumer_description(
        &self,
        group: &str,
    ) -> ObserverResult<Option<ConsumerDescription>> {
        let group = group.to_string();
        self.query(|reply| ObserverQuery::GetConsumerDescription {
            group,
            reply,
        })
        .await
    }

    pub async fn get_consumer_descriptions(
        &self,
        groups: Vec<String>,
    ) -> ObserverResult<ConsumerDescriptions> {
        self.query(|reply| ObserverQuery::GetConsumerDescriptions {
            groups,
            reply,
        })
        .await
    }

    /// `Ok(None)` means: nothing changed since `since_millis`.
    pub async fn get_all_consumer_descriptions(
        &self,
        since_millis: i64,
    ) -> ObserverResult<Option<ConsumerDescriptions>> {
        self.query(|reply| ObserverQuery::GetAllConsumerDescriptions {
            since_millis,
            reply,
        })
        .await
    }

    pub async fn get_consumed_topic_state(
        &self,
        group: &str,
        topic: &str,
    ) -> ObserverResult<Option<ConsumedTopicState>> {
        let group = group.to_string();
        let topic = topic.to_string();
        self.query(|reply| ObserverQuery::GetConsumedTopicState {
            group,
            topic,
            reply,
        })
        .await
    }

    pub async fn get_brokers(&self) -> ObserverResult<Vec<Broker>> {
        self.query(|reply| ObserverQuery::GetBrokers {
            reply,
        })
        .await
    }

    pub async fn get_preferred_leader_election(
        &self,
    ) -> ObserverResult<Option<PreferredReplicaElection>> {
        self.query(|reply| ObserverQuery::GetPreferredLeaderElection {
            reply,
        })
        .await
    }

    pub async fn get_reassign_partition(&self) -> ObserverResult<Option<ReassignPartitions>> {
        self.query(|reply| ObserverQuery::GetReassignPartition {
            reply,
        })
        .await
    }

    pub async fn get_topics_last_update_millis(&self) -> ObserverResult<i64> {
        self.query(|reply| ObserverQuery::GetTopicsLastUpdateMillis {
            reply,
        })
        .await
    }
}
