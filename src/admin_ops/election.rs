use std::collections::BTreeSet;

use serde::Deserialize;

use crate::kafka_types::TopicPartition;

/// An in-flight (or completed) preferred replica leader election, as observed
/// through the `/admin` znode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferredReplicaElection {
    /// When the election znode was first observed, milliseconds since UTC Epoch.
    pub started_at_millis: i64,

    /// The partitions the election covers.
    pub topic_partitions: BTreeSet<TopicPartition>,

    /// When the election znode disappeared, if it has.
    pub ended_at_millis: Option<i64>,
}

/// Tracks the lifecycle of the (at most one) preferred replica leader
/// election a Kafka cluster can have in flight.
///
/// Events are applied sequentially by the owning observer, so transitions are
/// serialisable by construction.
#[derive(Debug, Default)]
pub struct ElectionTracker {
    current: Option<PreferredReplicaElection>,
}

impl ElectionTracker {
    /// Apply an election znode creation or data change.
    ///
    /// A fresh election starts when there is none yet, or when the previous
    /// one has already ended. Otherwise the controller is rewriting the znode
    /// mid-flight, and the new partitions are merged into the current set.
    ///
    /// A payload that does not parse is logged and dropped.
    ///
    /// # Arguments
    ///
    /// * `at_millis` - znode mtime of the observed change
    /// * `payload` - raw znode JSON payload
    pub fn apply_update(&mut self, at_millis: i64, payload: &[u8]) {
        let partitions = match parse_election_payload(payload) {
            Ok(partitions) => partitions,
            Err(e) => {
                error!("Failed to parse preferred replica election payload: {e}");
                return;
            },
        };

        match &mut self.current {
            Some(election) if election.ended_at_millis.is_none() => {
                debug!(
                    "Merging {} partitions into election started at {}",
                    partitions.len(),
                    election.started_at_millis
                );
                election.topic_partitions.extend(partitions);
            },
            _ => {
                info!("Preferred replica leader election started at {at_millis}");
                self.current = Some(PreferredReplicaElection {
                    started_at_millis: at_millis,
                    topic_partitions: partitions,
                    ended_at_millis: None,
                });
            },
        }
    }

    /// Apply an election znode removal: the election (if any) is over.
    ///
    /// # Arguments
    ///
    /// * `at_millis` - wall clock of the observed removal
    pub fn apply_end(&mut self, at_millis: i64) {
        match &mut self.current {
            Some(election) => {
                info!("Preferred replica leader election ended at {at_millis}");
                election.ended_at_millis = Some(at_millis);
            },
            None => {
                debug!("Election znode removed with no election tracked: ignoring");
            },
        }
    }

    /// The current tracker state, as a value the caller may keep.
    pub fn current(&self) -> Option<PreferredReplicaElection> {
        self.current.clone()
    }
}

#[derive(Debug, Deserialize)]
struct ElectionPayload {
    #[serde(default)]
    partitions: Vec<ElectionEntry>,
}

#[derive(Debug, Deserialize)]
struct ElectionEntry {
    topic: String,
    partition: u32,
}

fn parse_election_payload(payload: &[u8]) -> Result<BTreeSet<TopicPartition>, serde_json::Error> {
    let parsed: ElectionPayload = serde_json::from_slice(payload)?;
    Ok(parsed
        .partitions
        .into_iter()
        .map(|e| TopicPartition::new(e.topic, e.partition))
        .collect())
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::ElectionTracker;
    use crate::kafka_types::TopicPartition;

    fn tp(topic: &str, partition: u32) -> TopicPartition {
        TopicPartition::new(topic.to_string(), partition)
    }

    fn payload(entries: &[(&str, u32)]) -> Vec<u8> {
        let partitions = entries
            .iter()
            .map(|(t, p)| format!(r#"{{"topic":"{t}","partition":{p}}}"#))
            .collect::<Vec<_>>()
            .join(",");
        format!(r#"{{"version":1,"partitions":[{partitions}]}}"#).into_bytes()
    }

    #[test]
    fn full_lifecycle_with_mid_flight_merge() {
        let mut tracker = ElectionTracker::default();

        tracker.apply_update(1000, &payload(&[("t", 0), ("t", 1)]));
        tracker.apply_update(1500, &payload(&[("t", 2)]));

        let election = tracker.current().unwrap();
        assert_eq!(election.started_at_millis, 1000);
        assert_eq!(election.ended_at_millis, None);
        assert_eq!(
            election.topic_partitions,
            BTreeSet::from([tp("t", 0), tp("t", 1), tp("t", 2)])
        );

        tracker.apply_end(2000);
        let election = tracker.current().unwrap();
        assert_eq!(election.started_at_millis, 1000);
        assert_eq!(election.ended_at_millis, Some(2000));
        assert_eq!(election.topic_partitions.len(), 3);

        // A new znode after the previous election ended starts a fresh one
        tracker.apply_update(2500, &payload(&[("u", 0)]));
        let election = tracker.current().unwrap();
        assert_eq!(election.started_at_millis, 2500);
        assert_eq!(election.ended_at_millis, None);
        assert_eq!(election.topic_partitions, BTreeSet::from([tp("u", 0)]));
    }

    #[test]
    fn end_is_idempotent_under_replay() {
        let mut tracker = ElectionTracker::default();

        tracker.apply_update(1000, &payload(&[("t", 0)]));
        tracker.apply_end(2000);
        tracker.apply_end(2000);

        let election = tracker.current().unwrap();
        assert_eq!(election.started_at_millis, 1000);
        assert_eq!(election.ended_at_millis, Some(2000));
    }

    #[test]
    fn end_without_election_is_ignored() {
        let mut tracker = ElectionTracker::default();
        tracker.apply_end(2000);
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let mut tracker = ElectionTracker::default();

        tracker.apply_update(1000, b"not json at all");
        assert_eq!(tracker.current(), None);

        // An established election survives a later bad write
        tracker.apply_update(1100, &payload(&[("t", 0)]));
        tracker.apply_update(1200, b"{broken");
        let election = tracker.current().unwrap();
        assert_eq!(election.topic_partitions, BTreeSet::from([tp("t", 0)]));
    }
}
