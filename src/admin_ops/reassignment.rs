use std::collections::BTreeMap;

use serde::Deserialize;

use crate::kafka_types::TopicPartition;

/// An in-flight (or completed) partition reassignment, as observed through
/// the `/admin` znode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignPartitions {
    /// When the reassignment znode was first observed, milliseconds since UTC Epoch.
    pub started_at_millis: i64,

    /// Target replica list (ordered, first is the preferred leader) per partition.
    pub replica_assignment: BTreeMap<TopicPartition, Vec<u32>>,

    /// When the reassignment znode disappeared, if it has.
    pub ended_at_millis: Option<i64>,
}

/// Tracks the lifecycle of the (at most one) partition reassignment a Kafka
/// cluster can have in flight.
///
/// Symmetric to [`super::ElectionTracker`], with a map payload instead of a
/// set: merging takes the union of assignments, and the latest write wins on
/// a partition already present.
#[derive(Debug, Default)]
pub struct ReassignmentTracker {
    current: Option<ReassignPartitions>,
}

impl ReassignmentTracker {
    /// Apply a reassignment znode creation or data change.
    ///
    /// # Arguments
    ///
    /// * `at_millis` - znode mtime of the observed change
    /// * `payload` - raw znode JSON payload
    pub fn apply_update(&mut self, at_millis: i64, payload: &[u8]) {
        let assignment = match parse_reassignment_payload(payload) {
            Ok(assignment) => assignment,
            Err(e) => {
                error!("Failed to parse partition reassignment payload: {e}");
                return;
            },
        };

        match &mut self.current {
            Some(reassignment) if reassignment.ended_at_millis.is_none() => {
                debug!(
                    "Merging {} assignments into reassignment started at {}",
                    assignment.len(),
                    reassignment.started_at_millis
                );
                reassignment.replica_assignment.extend(assignment);
            },
            _ => {
                info!("Partition reassignment started at {at_millis}");
                self.current = Some(ReassignPartitions {
                    started_at_millis: at_millis,
                    replica_assignment: assignment,
                    ended_at_millis: None,
                });
            },
        }
    }

    /// Apply a reassignment znode removal: the reassignment (if any) is over.
    ///
    /// # Arguments
    ///
    /// * `at_millis` - wall clock of the observed removal
    pub fn apply_end(&mut self, at_millis: i64) {
        match &mut self.current {
            Some(reassignment) => {
                info!("Partition reassignment ended at {at_millis}");
                reassignment.ended_at_millis = Some(at_millis);
            },
            None => {
                debug!("Reassignment znode removed with no reassignment tracked: ignoring");
            },
        }
    }

    /// The current tracker state, as a value the caller may keep.
    pub fn current(&self) -> Option<ReassignPartitions> {
        self.current.clone()
    }
}

#[derive(Debug, Deserialize)]
struct ReassignmentPayload {
    #[serde(default)]
    partitions: Vec<ReassignmentEntry>,
}

#[derive(Debug, Deserialize)]
struct ReassignmentEntry {
    topic: String,
    partition: u32,
    replicas: Vec<u32>,
}

fn parse_reassignment_payload(
    payload: &[u8],
) -> Result<BTreeMap<TopicPartition, Vec<u32>>, serde_json::Error> {
    let parsed: ReassignmentPayload = serde_json::from_slice(payload)?;
    Ok(parsed
        .partitions
        .into_iter()
        .map(|e| (TopicPartition::new(e.topic, e.partition), e.replicas))
        .collect())
}

#[cfg(test)]
mod test {
    use super::ReassignmentTracker;
    use crate::kafka_types::TopicPartition;

    fn tp(topic: &str, partition: u32) -> TopicPartition {
        TopicPartition::new(topic.to_string(), partition)
    }

    #[test]
    fn merge_takes_union_with_latest_write_winning() {
        let mut tracker = ReassignmentTracker::default();

        tracker.apply_update(
            1000,
            br#"{"version":1,"partitions":[{"topic":"t","partition":0,"replicas":[1,2]}]}"#,
        );
        tracker.apply_update(
            1500,
            br#"{"version":1,"partitions":[{"topic":"t","partition":0,"replicas":[3]},{"topic":"t","partition":1,"replicas":[2,1]}]}"#,
        );

        let reassignment = tracker.current().unwrap();
        assert_eq!(reassignment.started_at_millis, 1000);
        assert_eq!(reassignment.replica_assignment.len(), 2);
        assert_eq!(reassignment.replica_assignment[&tp("t", 0)], vec![3]);
        assert_eq!(reassignment.replica_assignment[&tp("t", 1)], vec![2, 1]);
    }

    #[test]
    fn removal_ends_and_next_write_starts_fresh() {
        let mut tracker = ReassignmentTracker::default();

        tracker.apply_update(
            1000,
            br#"{"version":1,"partitions":[{"topic":"t","partition":0,"replicas":[1]}]}"#,
        );
        tracker.apply_end(2000);

        let ended = tracker.current().unwrap();
        assert_eq!(ended.ended_at_millis, Some(2000));

        tracker.apply_update(
            3000,
            br#"{"version":1,"partitions":[{"topic":"u","partition":0,"replicas":[2]}]}"#,
        );

        let fresh = tracker.current().unwrap();
        assert_eq!(fresh.started_at_millis, 3000);
        assert_eq!(fresh.ended_at_millis, None);
        assert_eq!(fresh.replica_assignment.len(), 1);
        assert_eq!(fresh.replica_assignment[&tp("u", 0)], vec![2]);
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let mut tracker = ReassignmentTracker::default();
        tracker.apply_update(1000, b"][");
        assert_eq!(tracker.current(), None);
    }
}
