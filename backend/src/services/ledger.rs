//! Shared collaborators of the ledger services
//!
//! Every service is built from a `LedgerContext`. Commits go through
//! `retry_on_conflict`, which re-runs the whole read-validate-commit closure
//! when the repository reports a concurrent update.

use std::future::Future;
use std::sync::Arc;

use sqlx::PgPool;

use super::notification::{Notification, NotificationSink, PgNotificationSink, RecordingNotificationSink};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::repository::{InMemoryLedgerRepository, LedgerRepository, PgLedgerRepository};

#[derive(Clone)]
pub struct LedgerContext {
    pub repo: Arc<dyn LedgerRepository>,
    pub notifier: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl LedgerContext {
    pub fn new(
        repo: Arc<dyn LedgerRepository>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            repo,
            notifier,
            clock,
            config,
        }
    }

    /// Production wiring over a PostgreSQL pool
    pub fn postgres(db: PgPool, config: Arc<Config>) -> Self {
        Self::new(
            Arc::new(PgLedgerRepository::new(db.clone())),
            Arc::new(PgNotificationSink::new(db)),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Wiring over the in-memory repository; the concrete handles are
    /// returned for inspection
    pub fn in_memory(
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> (Self, Arc<InMemoryLedgerRepository>, Arc<RecordingNotificationSink>) {
        let repo = Arc::new(InMemoryLedgerRepository::new());
        let notifier = Arc::new(RecordingNotificationSink::new());
        let ctx = Self::new(repo.clone(), notifier.clone(), clock, Arc::new(config));
        (ctx, repo, notifier)
    }

    /// Run `attempt` until it succeeds, fails with a non-conflict error, or
    /// `ledger.max_commit_attempts` is reached
    pub async fn retry_on_conflict<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.config.ledger.max_commit_attempts.max(1);
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Err(AppError::ConcurrencyConflict(resource)) if tries < max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt = tries,
                        resource = %resource,
                        "Concurrent update, retrying from fresh state"
                    );
                }
                other => return other,
            }
        }
    }

    /// Send a notification; failures are logged and swallowed
    pub async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.deliver(&notification).await {
            tracing::warn!(
                audience = notification.recipient.audience(),
                error = %e,
                "Failed to deliver notification"
            );
        }
    }
}
