use clap::{ArgGroup, Parser};
use rdkafka::ClientConfig;

use crate::constants::{
    DEFAULT_ACTIVE_GROUP_MIN_CHILDREN, DEFAULT_RESYNC_INTERVAL_SECS,
    DEFAULT_ZK_SESSION_TIMEOUT_MS,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("verbosity").args(["verbose", "quiet"])))]
pub struct Cli {
    // ------------------------------------------------------------------ ZooKeeper
    /// ZooKeeper connect string of the observed cluster (format: 'HOST:PORT[,...][/chroot]').
    #[arg(short, long = "zookeeper", value_name = "ZK_CONNECT")]
    pub zookeeper: String,

    /// ZooKeeper session timeout, in milliseconds.
    #[arg(
        long = "zk-session-timeout",
        value_name = "MILLIS",
        default_value = DEFAULT_ZK_SESSION_TIMEOUT_MS
    )]
    pub zk_session_timeout_ms: u64,

    /// Interval between full mirror resyncs, in seconds.
    ///
    /// Between resyncs, mirrors are driven by ZooKeeper watch notifications alone:
    /// the resync is the safety net for watches lost across session changes.
    #[arg(
        long = "resync-interval",
        value_name = "SECONDS",
        default_value = DEFAULT_RESYNC_INTERVAL_SECS
    )]
    pub resync_interval_secs: u64,

    // ------------------------------------------------------------------ Kafka Client configuration
    /// Client identifier base used by the internal Kafka Clients.
    #[arg(long = "client-id", value_name = "CLIENT_ID", default_value = env!("CARGO_PKG_NAME"))]
    pub client_id: String,

    /// Additional configuration used by the internal Kafka Clients (format: 'CONF_KEY:CONF_VAL').
    ///
    /// Repeat the argument to set more than one key.
    /// See: https://github.com/edenhill/librdkafka/blob/master/CONFIGURATION.md.
    #[arg(short,
        long,
        value_name = "CONF_KEY:CONF_VAL",
        value_parser = kv_clap_value_parser,
        verbatim_doc_comment
    )]
    pub config: Vec<KVPair>,

    // ------------------------------------------------------------------ Cluster features
    /// The observed cluster supports topic deletion: also mirror '/admin/delete_topics'.
    #[arg(long = "enable-topic-delete")]
    pub enable_topic_delete: bool,

    /// Exclude Consumer Groups that look inactive from consumer listings.
    #[arg(long = "filter-inactive-consumers")]
    pub filter_inactive_consumers: bool,

    /// Minimum group znode children for a Consumer Group to count as active.
    ///
    /// An active group znode carries all of 'ids/', 'offsets/' and 'owners/';
    /// adjust if the observed Kafka version lays groups out differently.
    #[arg(
        long = "active-group-min-children",
        value_name = "AMOUNT",
        default_value = DEFAULT_ACTIVE_GROUP_MIN_CHILDREN
    )]
    pub active_group_min_children: usize,

    // ------------------------------------------------------------------ Logging
    /// Make logging louder: '-v' = INFO, '-vv' = DEBUG, '-vvv' = TRACE (default is WARN).
    ///
    /// The 'KSTATE_LOG' environment variable (ERROR|WARN|INFO|DEBUG|TRACE|OFF), when set, wins over the flags.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Make logging quieter: '-q' = ERROR, '-qq' = nothing at all.
    ///
    /// The 'KSTATE_LOG' environment variable (ERROR|WARN|INFO|DEBUG|TRACE|OFF), when set, wins over the flags.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Base configuration for the internal Kafka Clients.
    ///
    /// No bootstrap is set here: the offset fetcher points each client
    /// directly at a partition leader.
    pub fn build_client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("client.id", self.client_id.clone());
        for (key, value) in &self.config {
            config.set(key.clone(), value.clone());
        }

        trace!("Base Kafka client configuration:\n{config:#?}");
        config
    }
}

/// One `CONF_KEY:CONF_VAL` command-line argument, split.
pub type KVPair = (String, String);

/// [`clap::value_parser`] for [`KVPair`] arguments.
///
/// Splits on the first ':' only, so values may themselves contain colons.
fn kv_clap_value_parser(kv: &str) -> Result<KVPair, String> {
    kv.split_once(':')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("'{kv}' is not in 'CONF_KEY:CONF_VAL' format"))
}
