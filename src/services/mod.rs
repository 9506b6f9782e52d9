pub mod approvals;
pub mod authz;
pub mod classes;
pub mod invites;
pub mod membership;
pub mod overlays;
pub mod sync;
pub mod tasks;

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Re-normalizes a client-supplied RFC3339 instant to UTC so the stored
/// text compares in time order.
pub(crate) fn normalize_instant(value: &str) -> Result<String, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
        .map_err(|_| AppError::BadRequest(format!("invalid RFC3339 timestamp: {}", value)))
}
