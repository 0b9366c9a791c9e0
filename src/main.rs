use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, trace, warn};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use zookeeper_async::ZooKeeper;

use kstate::admin_ops;
use kstate::cli::Cli;
use kstate::constants::{
    ADMIN_PATH, BROKER_IDS_PATH, BROKER_TOPICS_PATH, CONSUMERS_PATH, DELETE_TOPICS_PATH,
    TOPIC_CONFIGS_PATH,
};
use kstate::internals::Emitter;
use kstate::logging;
use kstate::observer::{self, ClusterMirrors, ObserverConfig};
use kstate::partition_offsets::OffsetFetcher;
use kstate::zk_mirror::{self, MirrorEmitter, MirrorMode, SessionLogger};

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);
    trace!("Running with:\n{cli:#?}");

    // Ctrl-C flips one token; every task below holds a clone and winds down
    // when it does.
    let shutdown_token = CancellationToken::new();
    let ctrlc_token = shutdown_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutdown requested");
        ctrlc_token.cancel();
    }) {
        error!("Failed to register signal handler: {e}");
    }

    // One ZooKeeper session, shared by all the mirrors.
    // Failing to establish it is fatal: the supervisor restarts the process.
    let session_timeout = Duration::from_millis(cli.zk_session_timeout_ms);
    let zk = Arc::new(ZooKeeper::connect(&cli.zookeeper, session_timeout, SessionLogger).await?);
    info!("Connected to ZooKeeper at '{}'", cli.zookeeper);

    let resync_interval = Duration::from_secs(cli.resync_interval_secs);

    // One mirror per consumed ZooKeeper path
    let (topics_reg, topics_join) = zk_mirror::init(
        zk.clone(),
        BROKER_TOPICS_PATH,
        MirrorMode::Subtree,
        resync_interval,
        shutdown_token.clone(),
    );
    let (brokers_reg, brokers_join) = zk_mirror::init(
        zk.clone(),
        BROKER_IDS_PATH,
        MirrorMode::SingleLevel,
        resync_interval,
        shutdown_token.clone(),
    );
    let (configs_reg, configs_join) = zk_mirror::init(
        zk.clone(),
        TOPIC_CONFIGS_PATH,
        MirrorMode::SingleLevel,
        resync_interval,
        shutdown_token.clone(),
    );
    let (consumers_reg, consumers_join) = zk_mirror::init(
        zk.clone(),
        CONSUMERS_PATH,
        MirrorMode::Subtree,
        resync_interval,
        shutdown_token.clone(),
    );
    let (delete_reg, delete_join) = if cli.enable_topic_delete {
        let (reg, join) = zk_mirror::init(
            zk.clone(),
            DELETE_TOPICS_PATH,
            MirrorMode::SingleLevel,
            resync_interval,
            shutdown_token.clone(),
        );
        (Some(reg), Some(join))
    } else {
        (None, None)
    };

    // The raw `/admin` event stream feeds the admin operation trackers,
    // through the observer's own queue
    let (admin_rx, admin_join) =
        MirrorEmitter::new(zk.clone(), ADMIN_PATH, MirrorMode::SingleLevel, resync_interval)
            .spawn(shutdown_token.clone());

    let offset_fetcher =
        Arc::new(OffsetFetcher::new(cli.build_client_config(), brokers_reg.clone()));

    let (handle, observer_join) = observer::init(
        ClusterMirrors {
            topics: topics_reg,
            brokers: brokers_reg,
            topic_configs: configs_reg,
            consumers: consumers_reg,
            delete_topics: delete_reg,
        },
        offset_fetcher,
        ObserverConfig {
            filter_inactive_groups: cli.filter_inactive_consumers,
            active_group_min_children: cli.active_group_min_children,
        },
        shutdown_token.clone(),
    );

    let router_join = admin_ops::init(admin_rx, handle.message_queue(), shutdown_token.clone());

    // Periodic one-line cluster summary; doubles as a liveness check of the query path
    let status_handle = handle.clone();
    let status_shutdown_token = shutdown_token.clone();
    let status_join = tokio::spawn(async move {
        let mut status_interval = interval(STATUS_LOG_INTERVAL);
        loop {
            tokio::select! {
                _ = status_interval.tick() => {
                    match (
                        status_handle.get_brokers().await,
                        status_handle.get_topics().await,
                        status_handle.get_consumers().await,
                    ) {
                        (Ok(brokers), Ok(topic_list), Ok(groups)) => {
                            info!(
                                "Observing {} broker(s), {} topic(s) ({} pending deletion), {} consumer group(s)",
                                brokers.len(),
                                topic_list.topics.len(),
                                topic_list.pending_deletion.len(),
                                groups.len()
                            );
                        },
                        _ => {
                            warn!("Observer is not serving status queries");
                        },
                    }
                },
                _ = status_shutdown_token.cancelled() => {
                    break;
                },
            }
        }
    });

    // Nothing left to do on this task: wait for everything to wind down
    let _ = tokio::join!(
        topics_join,
        brokers_join,
        configs_join,
        consumers_join,
        admin_join,
        router_join,
        observer_join,
        status_join
    );
    if let Some(join) = delete_join {
        let _ = join.await;
    }

    info!("Shutdown!");
    Ok(())
}
