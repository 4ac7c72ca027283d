//! Background autosave worker.
//!
//! `Autosaver::submit` hands a snapshot of a main project to a single tokio
//! task and returns immediately. Each snapshot carries a revision taken from
//! a per-session counter. The worker drains whatever is queued, keeps only
//! the newest snapshot per document and never writes a revision older than
//! one it has already written, so a slow save cannot be overtaken by a stale
//! one. Failed writes are logged and dropped; the next change saves again.
//!
//! Deletes travel through the same queue. A delete discards any queued save
//! of the same document and marks its revision as written, so an older
//! snapshot can never bring a deleted project back.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::db::ProjectStore;
use crate::error::{Error, Result};
use crate::project::MainProject;

#[derive(Debug)]
struct SaveRequest {
    revision: u64,
    project: MainProject,
}

#[derive(Debug)]
struct DeleteRequest {
    revision: u64,
    id: String,
    reply: oneshot::Sender<Result<()>>,
}

#[derive(Debug)]
enum Job {
    Save(SaveRequest),
    Delete(DeleteRequest),
}

impl Job {
    fn id(&self) -> &str {
        match self {
            Job::Save(r) => &r.project.id,
            Job::Delete(r) => &r.id,
        }
    }

    fn revision(&self) -> u64 {
        match self {
            Job::Save(r) => r.revision,
            Job::Delete(r) => r.revision,
        }
    }
}

/// Counters reported when the worker stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveStats {
    pub written: usize,
    /// Snapshots superseded by a newer one before they were written.
    pub skipped: usize,
    pub failed: usize,
    pub deleted: usize,
}

pub struct Autosaver {
    tx: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<SaveStats>,
    revision: u64,
}

impl Autosaver {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(store: Arc<dyn ProjectStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(store, rx));
        Autosaver {
            tx,
            worker,
            revision: 0,
        }
    }

    /// Queue a snapshot for saving and return its revision.
    pub fn submit(&mut self, project: MainProject) -> u64 {
        self.revision += 1;
        let revision = self.revision;
        let id = project.id.clone();
        if self.tx.send(Job::Save(SaveRequest { revision, project })).is_err() {
            tracing::warn!(project = %id, revision, "autosave worker has stopped, change not saved");
        }
        revision
    }

    /// Queue a delete behind every earlier save and wait for its outcome.
    ///
    /// A document that was never written counts as deleted.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        self.revision += 1;
        let (reply, outcome) = oneshot::channel();
        let request = DeleteRequest {
            revision: self.revision,
            id: id.to_string(),
            reply,
        };
        if self.tx.send(Job::Delete(request)).is_err() {
            return Err(worker_stopped());
        }
        outcome.await.map_err(|_| worker_stopped())?
    }

    /// Stop accepting snapshots and wait until everything queued is written.
    pub async fn shutdown(self) -> SaveStats {
        drop(self.tx);
        match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "autosave worker ended abnormally");
                SaveStats::default()
            }
        }
    }
}

fn worker_stopped() -> Error {
    Error::Io(std::io::Error::other("autosave worker has stopped"))
}

async fn run_worker(
    store: Arc<dyn ProjectStore>,
    mut rx: mpsc::UnboundedReceiver<Job>,
) -> SaveStats {
    let mut stats = SaveStats::default();
    let mut last_written: HashMap<String, u64> = HashMap::new();

    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(more) = rx.try_recv() {
            batch.push(more);
        }

        for job in coalesce(batch, &mut stats) {
            let id = job.id().to_string();
            let revision = job.revision();
            if last_written.get(&id).is_some_and(|&r| r >= revision) {
                stats.skipped += 1;
                if let Job::Delete(request) = job {
                    let _ = request.reply.send(Ok(()));
                }
                continue;
            }
            last_written.insert(id.clone(), revision);
            match job {
                Job::Save(request) => match store.save(&request.project).await {
                    Ok(()) => {
                        stats.written += 1;
                        tracing::debug!(project = %id, revision, "autosaved");
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(project = %id, revision, error = %e, "autosave failed");
                    }
                },
                Job::Delete(request) => {
                    let outcome = match store.delete(&id).await {
                        Ok(()) | Err(Error::ProjectNotFound(_)) => {
                            stats.deleted += 1;
                            tracing::debug!(project = %id, revision, "deleted");
                            Ok(())
                        }
                        Err(e) => {
                            tracing::warn!(project = %id, revision, error = %e, "delete failed");
                            Err(e)
                        }
                    };
                    let _ = request.reply.send(outcome);
                }
            }
        }
    }
    stats
}

/// Keep the newest save per document, in order of first appearance.
///
/// A delete drops the queued save of its document and keeps its place in
/// the sequence; a save queued after it starts a new entry behind it.
fn coalesce(batch: Vec<Job>, stats: &mut SaveStats) -> Vec<Job> {
    let mut out: Vec<Option<Job>> = Vec::new();
    let mut pending_save: HashMap<String, usize> = HashMap::new();
    for job in batch {
        let id = job.id().to_string();
        match job {
            Job::Save(request) => match pending_save.get(&id) {
                Some(&i) => {
                    stats.skipped += 1;
                    let newer = out[i].as_ref().map_or(true, |q| q.revision() < request.revision);
                    if newer {
                        out[i] = Some(Job::Save(request));
                    }
                }
                None => {
                    pending_save.insert(id, out.len());
                    out.push(Some(Job::Save(request)));
                }
            },
            Job::Delete(request) => {
                if let Some(i) = pending_save.remove(&id) {
                    stats.skipped += 1;
                    out[i] = None;
                }
                out.push(Some(Job::Delete(request)));
            }
        }
    }
    out.into_iter().flatten().collect()
}
