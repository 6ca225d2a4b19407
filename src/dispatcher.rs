//! Bounded worker pool driving every outbound NSI message. One `Job` per
//! protocol action; the dispatcher guarantees at most one in-flight job per
//! `(kind, reservationId)`, mirroring the channel-fed endpoint table in
//! `turn-server`'s router, but specialised to a fixed set of job kinds
//! instead of a dynamic session table.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use sqlx::AnyPool;
use tokio::sync::mpsc;

use crate::db::reservation;
use crate::nsi::NsiClient;
use nsi_aura_core::state::{self, Event};

const DEFAULT_WORKER_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Reserve,
    ReserveCommit,
    Provision,
    Release,
    Terminate,
}

#[derive(Debug, Clone, Copy)]
pub struct Job {
    pub kind: JobKind,
    pub reservation_id: i64,
}

#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Job>,
}

impl Dispatcher {
    /// Submit a job. Every submission eventually runs exactly once: if a
    /// job of the same `(kind, reservationId)` is already in flight, this
    /// one queues behind it rather than running concurrently or being
    /// dropped — "at most one in flight per key" bounds concurrency, it
    /// doesn't coalesce distinct enqueues into one execution.
    pub fn submit(&self, job: Job) {
        if self.sender.send(job).is_err() {
            log::error!("dispatcher channel closed, dropping job {job:?}");
        }
    }
}

/// Spawn `worker_count` worker loops sharing one job queue and one
/// per-key pending table. Returns a handle cheap to clone and hand to
/// every HTTP handler and the topology poller alike.
pub fn spawn(pool: AnyPool, nsi: Arc<NsiClient>, worker_count: Option<usize>) -> Dispatcher {
    let (sender, receiver) = mpsc::unbounded_channel();
    let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
    // Presence of a key means a job for it is in flight; the queue holds
    // jobs for that same key that arrived while it was running.
    let pending: Arc<Mutex<HashMap<(JobKind, i64), VecDeque<Job>>>> = Arc::new(Mutex::new(HashMap::new()));

    for _ in 0..worker_count.unwrap_or(DEFAULT_WORKER_COUNT) {
        let pool = pool.clone();
        let nsi = nsi.clone();
        let receiver = receiver.clone();
        let pending = pending.clone();

        tokio::spawn(async move {
            loop {
                let mut job = {
                    let mut receiver = receiver.lock().await;
                    match receiver.recv().await {
                        Some(job) => job,
                        None => return,
                    }
                };

                // Run `job`, then keep draining whatever queued up behind
                // its key while this worker held the slot, so a burst of
                // same-key submissions is serialized on one worker instead
                // of bouncing back through the shared channel.
                loop {
                    let key = (job.kind, job.reservation_id);
                    match pending.lock().entry(key) {
                        Entry::Vacant(entry) => {
                            entry.insert(VecDeque::new());
                        }
                        Entry::Occupied(mut entry) => {
                            entry.get_mut().push_back(job);
                            break;
                        }
                    }

                    if let Err(err) = run_job(&pool, &nsi, job).await {
                        log::error!("job {job:?} failed: {err:#}");
                    }

                    let next = {
                        let mut pending = pending.lock();
                        match pending.get_mut(&key).and_then(VecDeque::pop_front) {
                            Some(next) => Some(next),
                            None => {
                                pending.remove(&key);
                                None
                            }
                        }
                    };
                    match next {
                        Some(next) => job = next,
                        None => break,
                    }
                }
            }
        });
    }

    Dispatcher { sender }
}

async fn run_job(pool: &AnyPool, nsi: &NsiClient, job: Job) -> anyhow::Result<()> {
    let Some(res) = reservation::get(pool, job.reservation_id).await? else {
        anyhow::bail!("reservation {} not found", job.reservation_id);
    };

    let correlation_id = reservation::rotate_correlation_id(pool, res.id).await?;

    let outcome = match job.kind {
        JobKind::Reserve => {
            let source_stp = crate::db::stp::get_by_id(pool, res.source_stp_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("source stp {} missing", res.source_stp_id))?;
            let dest_stp = crate::db::stp::get_by_id(pool, res.dest_stp_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("dest stp {} missing", res.dest_stp_id))?;
            let source_urn = nsi_aura_codec::templates::stp_urn(&source_stp.stp_id, res.source_vlan);
            let dest_urn = nsi_aura_codec::templates::stp_urn(&dest_stp.stp_id, res.dest_vlan);

            nsi.reserve(
                correlation_id,
                res.global_reservation_id,
                &res.description,
                res.start_time,
                res.end_time,
                &source_urn,
                &dest_urn,
            )
            .await
            .map(Some)
        }
        JobKind::ReserveCommit => {
            let connection_id = require_connection_id(&res)?;
            nsi.reserve_commit(correlation_id, connection_id).await.map(|_| None)
        }
        JobKind::Provision => {
            let connection_id = require_connection_id(&res)?;
            nsi.provision(correlation_id, connection_id).await.map(|_| None)
        }
        JobKind::Release => {
            let connection_id = require_connection_id(&res)?;
            nsi.release(correlation_id, connection_id).await.map(|_| None)
        }
        JobKind::Terminate => {
            let connection_id = require_connection_id(&res)?;
            nsi.terminate(correlation_id, connection_id).await.map(|_| None)
        }
    };

    match outcome {
        Ok(connection_id) => {
            if let Some(connection_id) = connection_id {
                reservation::set_connection_id(pool, res.id, connection_id).await?;
            }
            crate::db::log::append(
                pool,
                res.id,
                &format!("{:?} sent", job.kind),
                Some(module_path!()),
                None,
                None,
            )
            .await?;
        }
        Err(err) => {
            crate::db::log::append(
                pool,
                res.id,
                &format!("{:?} failed: {err}", job.kind),
                Some(module_path!()),
                None,
                None,
            )
            .await?;

            // Only the `reserve` job drives a state transition on failure —
            // every other job leaves the state untouched for the callback
            // or a GUI-driven retry to resolve.
            if matches!(job.kind, JobKind::Reserve) {
                if let Ok(next) = state::apply(res.state, Event::ConnectionError) {
                    reservation::set_state(pool, res.id, next).await?;
                }
            }
        }
    }

    Ok(())
}

fn require_connection_id(res: &nsi_aura_core::Reservation) -> anyhow::Result<uuid::Uuid> {
    res.connection_id
        .ok_or_else(|| anyhow::anyhow!("reservation {} has no connectionId yet", res.id))
}
