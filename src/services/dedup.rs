use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::services::sms::Notifier;
use crate::services::trust::TrustList;

/// How long repeated rejections from one number stay coalesced.
pub const SUPPRESSION_MINUTES: i64 = 10;

/// Period of the eviction sweep.
pub const EVICTION_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug)]
enum DedupEvent {
    Suppress { from: String, message: String },
    Tick(DateTime<Utc>),
}

/// Time each source number was first reported within the current window.
#[derive(Debug)]
pub struct SuppressionCache {
    seen: HashMap<String, DateTime<Utc>>,
    window: Duration,
}

impl SuppressionCache {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            window,
        }
    }

    /// True when `from` has not been reported in the current window; stamps it.
    pub fn admit(&mut self, from: &str, now: DateTime<Utc>) -> bool {
        if self.seen.contains_key(from) {
            return false;
        }
        self.seen.insert(from.to_string(), now);
        true
    }

    /// Drop entries older than the window, returning the re-armed numbers.
    pub fn evict(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .seen
            .iter()
            .filter(|(_, first)| now - **first > self.window)
            .map(|(from, _)| from.clone())
            .collect();
        for from in &expired {
            self.seen.remove(from);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

struct DedupActor {
    cache: SuppressionCache,
    notifier: Arc<dyn Notifier>,
    trust: Arc<TrustList>,
}

impl DedupActor {
    async fn handle(&mut self, event: DedupEvent) {
        match event {
            DedupEvent::Suppress { from, message } => {
                if !self.cache.admit(&from, Utc::now()) {
                    metrics::counter!("fax_notifications_suppressed_total").increment(1);
                    return;
                }
                let Some(owner) = self.trust.owner() else {
                    return;
                };
                if let Err(e) = self.notifier.send(owner, &message).await {
                    tracing::warn!(to = %owner, error = %e, "Notification failed");
                }
            }
            DedupEvent::Tick(now) => {
                for from in self.cache.evict(now) {
                    tracing::info!(from = %from, "Re-armed rejection notices");
                }
            }
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<DedupEvent>) {
        tracing::info!("Starting rejected fax notification loop");
        let mut ticker = time::interval_at(Instant::now() + EVICTION_INTERVAL, EVICTION_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                _ = ticker.tick() => self.handle(DedupEvent::Tick(Utc::now())).await,
            }
        }
    }
}

/// Coalesces repeated "fax rejected" notices so the operator gets one per
/// source number per suppression window.
///
/// The background loop is only spawned on the first [`suppress`](Self::suppress).
pub struct RejectionNotifier {
    notifier: Arc<dyn Notifier>,
    trust: Arc<TrustList>,
    window: Duration,
    tx: OnceCell<mpsc::UnboundedSender<DedupEvent>>,
}

impl RejectionNotifier {
    pub fn new(notifier: Arc<dyn Notifier>, trust: Arc<TrustList>) -> Self {
        Self {
            notifier,
            trust,
            window: Duration::minutes(SUPPRESSION_MINUTES),
            tx: OnceCell::new(),
        }
    }

    fn sender(&self) -> &mpsc::UnboundedSender<DedupEvent> {
        self.tx.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            let actor = DedupActor {
                cache: SuppressionCache::new(self.window),
                notifier: self.notifier.clone(),
                trust: self.trust.clone(),
            };
            tokio::spawn(actor.run(rx));
            tx
        })
    }

    pub fn is_started(&self) -> bool {
        self.tx.get().is_some()
    }

    /// Forward `message` to the operator unless `from` was reported recently.
    pub fn suppress(&self, from: &str, message: impl Into<String>) {
        let event = DedupEvent::Suppress {
            from: from.to_string(),
            message: message.into(),
        };
        if self.sender().send(event).is_err() {
            tracing::warn!(from = %from, "Rejected fax notification loop is gone");
        }
    }

    #[cfg(test)]
    fn tick(&self, now: DateTime<Utc>) {
        let _ = self.sender().send(DedupEvent::Tick(now));
    }
}
