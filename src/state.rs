use std::sync::Arc;

use sqlx::SqlitePool;

use crate::audit::{AuditEntry, AuditSink};
use crate::identity::Identity;
use crate::models::User;
use crate::notify::{Notifier, NotifyEvent};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub identity: Arc<dyn Identity>,
    pub notifier: Arc<dyn Notifier>,
    pub audit: Arc<dyn AuditSink>,
}

impl AppState {
    /// Dispatches an audit entry off the request path.
    pub fn record(&self, entry: AuditEntry) {
        let sink = self.audit.clone();
        tokio::spawn(async move {
            sink.record(entry).await;
        });
    }

    /// Dispatches a notification off the request path.
    pub fn notify(&self, event: NotifyEvent, user: User, payload: serde_json::Value) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.notify(event, &user, payload).await;
        });
    }
}
