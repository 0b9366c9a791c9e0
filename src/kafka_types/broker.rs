use serde::Deserialize;

/// A Broker that is part of a Kafka cluster.
///
/// It is identified by a unique identifier for the given Cluster,
/// and the host and port to connect to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Broker {
    pub id: u32,
    pub host: String,
    pub port: u16,
}

/// The subset of the broker registration znode payload this observer interprets.
///
/// Kafka 0.8.x registrations also carry `jmx_port`, `timestamp` and `version`,
/// none of which matter here.
#[derive(Debug, Deserialize)]
struct BrokerRegistration {
    host: String,
    port: u16,
}

impl Broker {
    /// Build a [`Broker`] out of the JSON payload of its registration znode.
    ///
    /// # Arguments
    ///
    /// * `id` - Broker id, i.e. the name of the registration znode
    /// * `data` - Raw payload of the registration znode
    pub fn from_registration(id: u32, data: &[u8]) -> Result<Self, serde_json::Error> {
        let reg: BrokerRegistration = serde_json::from_slice(data)?;
        Ok(Broker {
            id,
            host: reg.host,
            port: reg.port,
        })
    }

    /// Build the list of known [`Broker`]s out of a `/brokers/ids` mirror snapshot.
    ///
    /// Entries whose znode name is not a numeric broker id, or whose registration
    /// JSON does not parse, are logged and dropped. The result is sorted by
    /// ascending broker id.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Sequence of `(path, version, data)` of the broker ids mirror
    pub fn from_ids_snapshot(snapshot: &[(String, i32, Vec<u8>)]) -> Vec<Broker> {
        let mut brokers = Vec::with_capacity(snapshot.len());

        for (path, _, data) in snapshot {
            let name = path.rsplit('/').next().unwrap_or(path.as_str());
            let id = match name.parse::<u32>() {
                Ok(id) => id,
                Err(_) => {
                    error!("Ignoring broker registration at '{path}': not a broker id");
                    continue;
                },
            };
            match Broker::from_registration(id, data) {
                Ok(b) => brokers.push(b),
                Err(e) => {
                    error!("Failed to parse registration of broker {id}: {e}");
                },
            }
        }

        brokers.sort();
        brokers
    }
}

#[cfg(test)]
mod test {
    use super::Broker;

    #[test]
    fn parses_kafka_08_registration() {
        let data = br#"{"jmx_port":-1,"timestamp":"1417192737","host":"b1","version":1,"port":9092}"#;

        assert_eq!(
            Broker::from_registration(1, data).unwrap(),
            Broker {
                id: 1,
                host: "b1".to_string(),
                port: 9092,
            }
        );
    }

    #[test]
    fn snapshot_drops_unparsable_registrations_and_sorts_by_id() {
        let snapshot = vec![
            ("/brokers/ids/7".to_string(), 0, br#"{"host":"b7","port":9092}"#.to_vec()),
            ("/brokers/ids/1".to_string(), 0, br#"{"host":"b1","port":9093}"#.to_vec()),
            ("/brokers/ids/3".to_string(), 0, b"garbage".to_vec()),
            ("/brokers/ids/nope".to_string(), 0, br#"{"host":"x","port":1}"#.to_vec()),
        ];

        let brokers = Broker::from_ids_snapshot(&snapshot);

        assert_eq!(brokers.len(), 2);
        assert_eq!(brokers[0].id, 1);
        assert_eq!(brokers[0].host, "b1");
        assert_eq!(brokers[1].id, 7);
        assert_eq!(brokers[1].port, 9092);
    }
}
