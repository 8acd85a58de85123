//! Fax job coordinator.
//!
//! A single task owns the table of faxes awaiting approval. HTTP handlers talk
//! to it only through [`CoordinatorHandle`], so every mutation happens on one
//! logical thread, one event at a time, in arrival order.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::job::FaxJob;
use crate::services::fax::FaxCarrier;
use crate::services::media::MediaStore;
use crate::services::sms::Notifier;
use crate::services::trust::TrustList;

/// How long an unapproved job and its document are kept.
pub const RETENTION_MINUTES: i64 = 30;

/// Period of the expiry sweep.
pub const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

pub const NO_PENDING_FAX: &str = "No pending fax.";
pub const FAX_APPROVED: &str = "Fax approved.";
pub const FAX_ALREADY_SENT: &str = "Fax already sent.";
pub const SENDING_FAILED: &str = "Sending failed.";

/// Everything the coordinator reacts to.
#[derive(Debug)]
pub enum FaxEvent {
    /// Track a freshly composed fax, replacing any pending one from the same number.
    Enqueue(FaxJob),
    /// The submitter replied to approve their pending fax.
    RequestApproval(String),
    /// Carrier status callback, `<fax sid>|<text for the submitter>`.
    Status(String),
    /// The submitter asked where their pending document can be viewed.
    QueryMedia(String),
    /// Expire stale jobs and orphaned documents as of the given instant.
    Tick(DateTime<Utc>),
}

/// Pending faxes keyed by source phone, with a fax sid index for status callbacks.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<String, FaxJob>,
    by_sid: HashMap<String, String>,
}

impl JobTable {
    /// Insert `job`, returning the job it replaced.
    pub fn insert(&mut self, job: FaxJob) -> Option<FaxJob> {
        if let Some(sid) = &job.fax_sid {
            self.by_sid.insert(sid.clone(), job.from_phone.clone());
        }
        let replaced = self.jobs.insert(job.from_phone.clone(), job);
        if let Some(sid) = replaced.as_ref().and_then(|j| j.fax_sid.as_ref()) {
            self.by_sid.remove(sid);
        }
        replaced
    }

    pub fn get(&self, phone: &str) -> Option<&FaxJob> {
        self.jobs.get(phone)
    }

    /// Record the carrier's fax sid. A sid is only ever assigned once per job.
    pub fn assign_sid(&mut self, phone: &str, sid: String) -> bool {
        match self.jobs.get_mut(phone) {
            Some(job) if job.fax_sid.is_none() => {
                self.by_sid.insert(sid.clone(), phone.to_string());
                job.fax_sid = Some(sid);
                true
            }
            _ => false,
        }
    }

    pub fn find_by_sid(&self, sid: &str) -> Option<&FaxJob> {
        self.by_sid.get(sid).and_then(|phone| self.jobs.get(phone))
    }

    pub fn remove(&mut self, phone: &str) -> Option<FaxJob> {
        let job = self.jobs.remove(phone)?;
        if let Some(sid) = &job.fax_sid {
            self.by_sid.remove(sid);
        }
        Some(job)
    }

    /// Source phones of jobs older than `retention`.
    pub fn expired(&self, now: DateTime<Utc>, retention: Duration) -> Vec<String> {
        self.jobs
            .values()
            .filter(|job| job.age(now) > retention)
            .map(|job| job.from_phone.clone())
            .collect()
    }

    /// Document file names still referenced by a pending job.
    pub fn artifacts(&self) -> HashSet<&str> {
        self.jobs.values().map(|job| job.pdf_file.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

pub struct FaxCoordinator {
    table: JobTable,
    notifier: Arc<dyn Notifier>,
    carrier: Arc<dyn FaxCarrier>,
    trust: Arc<TrustList>,
    media: Arc<MediaStore>,
    retention: Duration,
}

impl FaxCoordinator {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        carrier: Arc<dyn FaxCarrier>,
        trust: Arc<TrustList>,
        media: Arc<MediaStore>,
    ) -> Self {
        Self {
            table: JobTable::default(),
            notifier,
            carrier,
            trust,
            media,
            retention: Duration::minutes(RETENTION_MINUTES),
        }
    }

    pub fn table(&self) -> &JobTable {
        &self.table
    }

    /// Process a single event to completion.
    pub async fn handle(&mut self, event: FaxEvent) {
        match event {
            FaxEvent::Enqueue(job) => self.enqueue(job),
            FaxEvent::RequestApproval(phone) => self.request_approval(&phone).await,
            FaxEvent::Status(line) => self.forward_status(&line).await,
            FaxEvent::QueryMedia(phone) => self.query_media(&phone).await,
            FaxEvent::Tick(now) => self.sweep(now).await,
        }
        metrics::gauge!("fax_pending_jobs").set(self.table.len() as f64);
    }

    fn enqueue(&mut self, job: FaxJob) {
        tracing::info!(
            phone = %job.from_phone,
            to = %job.to_phone,
            pdf_file = %job.pdf_file,
            "Fax awaiting approval"
        );
        metrics::counter!("fax_jobs_enqueued_total").increment(1);
        if let Some(old) = self.table.insert(job) {
            tracing::info!(phone = %old.from_phone, pdf_file = %old.pdf_file, "Replaced pending fax");
        }
    }

    async fn request_approval(&mut self, phone: &str) {
        let msg = match self.table.get(phone) {
            None => NO_PENDING_FAX,
            Some(job) if job.is_submitted() => FAX_ALREADY_SENT,
            // Untrusted submitters get the approval reply but nothing is sent.
            Some(job) if !self.trust.contains(&job.from_phone) => {
                tracing::warn!(phone = %phone, "Approval from untrusted number, fax not sent");
                FAX_APPROVED
            }
            Some(job) => {
                let media_url = self.media.media_url(&job.pdf_file);
                match self.carrier.submit(&job.to_phone, &media_url, &job.quality).await {
                    Ok(sid) => {
                        metrics::counter!("fax_approvals_total").increment(1);
                        self.table.assign_sid(phone, sid);
                        FAX_APPROVED
                    }
                    Err(e) => {
                        metrics::counter!("fax_submissions_failed_total").increment(1);
                        tracing::error!(phone = %phone, error = %e, "Fax submission failed");
                        SENDING_FAILED
                    }
                }
            }
        };
        self.notify(phone, msg).await;
    }

    async fn forward_status(&self, line: &str) {
        let Some((sid, rest)) = line.split_once('|') else {
            tracing::debug!(line = %line, "Ignoring malformed fax status");
            return;
        };
        match self.table.find_by_sid(sid) {
            Some(job) => self.notify(&job.from_phone, rest).await,
            None => tracing::debug!(sid = %sid, "No pending fax for status"),
        }
    }

    async fn query_media(&self, phone: &str) {
        let msg = match self.table.get(phone) {
            Some(job) => self.media.media_url(&job.pdf_file),
            None => NO_PENDING_FAX.to_string(),
        };
        self.notify(phone, &msg).await;
    }

    async fn sweep(&mut self, now: DateTime<Utc>) {
        for phone in self.table.expired(now, self.retention) {
            let Some(job) = self.table.remove(&phone) else {
                continue;
            };
            tracing::info!(phone = %phone, pdf_file = %job.pdf_file, "Removing expired fax");
            metrics::counter!("fax_jobs_expired_total").increment(1);
            if let Err(e) = self.media.remove(&job.pdf_file).await {
                tracing::warn!(pdf_file = %job.pdf_file, error = %e, "Unable to remove fax document");
            }
        }

        let orphans = match self.media.orphans(&self.table.artifacts(), now, self.retention) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(dir = %self.media.dir().display(), error = %e, "Unable to list media directory");
                return;
            }
        };
        for path in orphans {
            tracing::info!(path = %path.display(), "Removing orphaned document");
            match std::fs::remove_file(&path) {
                Ok(()) => metrics::counter!("fax_orphans_removed_total").increment(1),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Unable to remove orphaned document"),
            }
        }
    }

    async fn notify(&self, to: &str, body: &str) {
        if let Err(e) = self.notifier.send(to, body).await {
            tracing::warn!(to = %to, error = %e, "Notification failed");
        }
    }

    /// Start the coordinator on its own task.
    ///
    /// The task ends when `shutdown` fires or every handle has been dropped;
    /// jobs still pending at that point are abandoned.
    pub fn spawn(self, shutdown: CancellationToken) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx, shutdown));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<FaxEvent>, shutdown: CancellationToken) {
        tracing::info!("Fax coordinator started");
        let mut ticker = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                _ = ticker.tick() => self.handle(FaxEvent::Tick(Utc::now())).await,
            }
        }

        tracing::info!(abandoned = self.table.len(), "Fax coordinator stopped");
    }
}

/// Cheap, cloneable producer side of the coordinator's queue.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<FaxEvent>,
}

impl CoordinatorHandle {
    pub fn send(&self, event: FaxEvent) -> Result<(), CoordinatorError> {
        self.tx.send(event).map_err(|_| CoordinatorError::Stopped)
    }

    pub fn enqueue(&self, job: FaxJob) -> Result<(), CoordinatorError> {
        self.send(FaxEvent::Enqueue(job))
    }

    pub fn request_approval(&self, phone: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(FaxEvent::RequestApproval(phone.into()))
    }

    pub fn status(&self, line: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(FaxEvent::Status(line.into()))
    }

    pub fn query_media(&self, phone: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(FaxEvent::QueryMedia(phone.into()))
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("fax coordinator is not running")]
    Stopped,
}
