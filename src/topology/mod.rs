pub mod dds;
pub mod nml;
pub mod reconcile;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sqlx::AnyPool;

use crate::config::Config;
use crate::db::{sdp, stp};

const POLL_PERIOD: Duration = Duration::from_secs(60);

/// Spawn the topology poll as a single serialized background task, aligned
/// to the next whole-minute wall-clock boundary. A `try_lock`-style guard
/// on `running` drops a tick if the previous poll hasn't finished, which is
/// how the coalesce rule is enforced without a queue.
pub fn spawn(config: Arc<Config>, pool: AnyPool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_next_minute_boundary().await;

        let running = Arc::new(AtomicBool::new(false));
        let mut interval = tokio::time::interval(POLL_PERIOD);
        loop {
            interval.tick().await;

            if running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                log::warn!("topology poll still running, dropping this tick");
                continue;
            }

            let config = config.clone();
            let pool = pool.clone();
            let running = running.clone();
            tokio::spawn(async move {
                if let Err(err) = poll_once(&config, &pool).await {
                    log::error!("topology poll failed: {err:#}");
                }
                running.store(false, Ordering::SeqCst);
            });
        }
    })
}

async fn wait_for_next_minute_boundary() {
    let now = chrono::Utc::now();
    let seconds_into_minute = now.timestamp() % 60;
    let remaining = 60 - seconds_into_minute;
    tokio::time::sleep(Duration::from_secs(remaining as u64)).await;
}

/// Run exactly one fetch-decompress-parse-reconcile cycle. Any network,
/// decompression, or whole-document parse error aborts the poll and leaves
/// the database untouched; a single malformed topology document among
/// several does not block the others.
pub async fn poll_once(config: &Config, pool: &AnyPool) -> anyhow::Result<()> {
    let documents = dds::fetch_topology_documents(config).await?;

    let mut fresh_records = Vec::new();
    for document in documents {
        match nml::parse_stp_records(&document.xml) {
            Ok(mut records) => fresh_records.append(&mut records),
            Err(err) => log::warn!("skipping malformed topology document: {err}"),
        }
    }

    let existing_stps = stp::list_all(pool).await?;
    let stp_diff = reconcile::diff_stp(&existing_stps, &fresh_records);

    let mut keep_ids = stp_diff.keep_ids.clone();
    for record in &stp_diff.to_insert {
        let new_id = stp::insert(pool, &to_new_stp(record)).await?;
        keep_ids.push(new_id);
    }
    for (id, record) in &stp_diff.to_update {
        stp::update(pool, *id, &to_new_stp(record)).await?;
        keep_ids.push(*id);
    }
    let deactivated_stps = stp::deactivate_missing(pool, &keep_ids).await?;

    let resolved_stps = stp::list_active(pool).await?;
    let sdp_candidates = reconcile::compute_sdp_candidates(&resolved_stps);
    let existing_sdps = sdp::list_all(pool).await?;
    let sdp_diff = reconcile::diff_sdp(&existing_sdps, &sdp_candidates);

    let mut keep_sdp_ids = sdp_diff.keep_ids.clone();
    for candidate in &sdp_diff.to_insert {
        let new_id = sdp::insert(pool, &to_new_sdp(candidate)).await?;
        keep_sdp_ids.push(new_id);
    }
    for (id, candidate) in &sdp_diff.to_update {
        sdp::update(pool, *id, &to_new_sdp(candidate)).await?;
        keep_sdp_ids.push(*id);
    }
    let deactivated_sdps = sdp::deactivate_missing(pool, &keep_sdp_ids).await?;

    log::info!(
        "topology poll complete: {} stp inserted/updated, {} deactivated, {} sdp inserted/updated, {} deactivated",
        stp_diff.to_insert.len() + stp_diff.to_update.len(),
        deactivated_stps,
        sdp_diff.to_insert.len() + sdp_diff.to_update.len(),
        deactivated_sdps,
    );

    Ok(())
}

fn to_new_stp(record: &nml::StpRecord) -> stp::NewStp<'_> {
    stp::NewStp {
        stp_id: &record.stp_id,
        inbound_port: record.inbound_port.as_deref(),
        outbound_port: record.outbound_port.as_deref(),
        inbound_alias: record.inbound_alias.as_deref(),
        outbound_alias: record.outbound_alias.as_deref(),
        vlan_range: &record.vlan_range,
        description: record.description.as_deref(),
    }
}

fn to_new_sdp(candidate: &reconcile::SdpCandidate) -> sdp::NewSdp<'_> {
    sdp::NewSdp {
        stp_a_id: candidate.stp_a_id,
        stp_z_id: candidate.stp_z_id,
        vlan_range: &candidate.vlan_range,
        description: candidate.description.as_deref(),
    }
}
