use async_trait::async_trait;
use tracing::info;

pub mod actions {
    pub const CLASS_CREATE: &str = "CLASS_CREATE";
    pub const CLASS_JOIN_APPLY: &str = "CLASS_JOIN_APPLY";
    pub const CLASS_ARCHIVE: &str = "CLASS_ARCHIVE";
    pub const MEMBERSHIP_APPROVE: &str = "MEMBERSHIP_APPROVE";
    pub const MEMBERSHIP_REJECT: &str = "MEMBERSHIP_REJECT";
    pub const ROLE_CHANGE: &str = "ROLE_CHANGE";
    pub const TASK_CREATE_PERSONAL: &str = "TASK_CREATE_PERSONAL";
    pub const TASK_CREATE_CLASS: &str = "TASK_CREATE_CLASS";
    pub const TASK_UPDATE: &str = "TASK_UPDATE";
    pub const TASK_DELETE: &str = "TASK_DELETE";
    pub const TASK_STATUS_UPDATE: &str = "TASK_STATUS_UPDATE";
    pub const SYNC_RUN: &str = "SYNC_RUN";
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor_id: String,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub details: serde_json::Value,
}

impl AuditEntry {
    pub fn new(
        actor_id: &str,
        action: &'static str,
        entity_type: &'static str,
        entity_id: &str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            details,
        }
    }
}

/// Fire-and-forget, never on the decision path of the triggering call.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

/// Writes audit entries to the tracing pipeline under the `audit` target,
/// so operators can route them with an EnvFilter directive.
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, entry: AuditEntry) {
        info!(
            target: "audit",
            "{} {} {}:{} {}",
            entry.actor_id, entry.action, entry.entity_type, entry.entity_id, entry.details
        );
    }
}

pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _entry: AuditEntry) {}
}
