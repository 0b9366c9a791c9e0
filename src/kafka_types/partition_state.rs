use serde::Deserialize;

/// The subset of the partition state znode payload this observer interprets.
///
/// The full payload (ISR, controller epoch, ...) is passed through verbatim
/// to callers; only the `leader` field is needed, to know which Broker to ask
/// for the partition latest offset.
#[derive(Debug, Deserialize)]
struct PartitionState {
    leader: i32,
}

/// Extract the leader Broker id from a partition state znode JSON payload.
///
/// Returns `None` when the payload does not parse, or when the partition
/// currently has no leader (`leader: -1`). Callers treat `None` as an
/// unresolvable leader, which yields an unknown latest offset for just that
/// partition.
///
/// # Arguments
///
/// * `state_json` - Raw JSON payload of a `.../partitions/<p>/state` znode
pub fn leader_of_partition_state(state_json: &str) -> Option<u32> {
    match serde_json::from_str::<PartitionState>(state_json) {
        Ok(state) => {
            if state.leader < 0 {
                debug!("Partition state reports no current leader: {state_json}");
                None
            } else {
                Some(state.leader as u32)
            }
        },
        Err(e) => {
            error!("Failed to parse partition state JSON '{state_json}': {e}");
            None
        },
    }
}

#[cfg(test)]
mod test {
    use super::leader_of_partition_state;

    #[test]
    fn parses_leader_from_state_json() {
        let json = r#"{"controller_epoch":3,"leader":1,"version":1,"leader_epoch":7,"isr":[1,2]}"#;
        assert_eq!(leader_of_partition_state(json), Some(1));
    }

    #[test]
    fn offline_partition_has_no_leader() {
        let json = r#"{"controller_epoch":3,"leader":-1,"version":1,"leader_epoch":7,"isr":[]}"#;
        assert_eq!(leader_of_partition_state(json), None);
    }

    #[test]
    fn malformed_state_yields_unresolved_leader() {
        assert_eq!(leader_of_partition_state("not json"), None);
        assert_eq!(leader_of_partition_state(r#"{"isr":[1]}"#), None);
    }
}
