use tracing::{info, warn};

use goodtable_core::audit::{AuditEvent, AuditOutcome, AuditSink};

/// Forwards audit events to `tracing`. Degraded and failed outcomes log at
/// warn so they surface with the default filter.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let session_id = event.session_id.as_deref().unwrap_or("-");
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();

        match event.outcome {
            AuditOutcome::Success | AuditOutcome::Rejected => info!(
                event_name = %event.event_type,
                session_id,
                correlation_id = %event.correlation_id,
                category = ?event.category,
                outcome = ?event.outcome,
                actor = %event.actor,
                metadata = %metadata,
                "audit event"
            ),
            AuditOutcome::Degraded | AuditOutcome::Failed => warn!(
                event_name = %event.event_type,
                session_id,
                correlation_id = %event.correlation_id,
                category = ?event.category,
                outcome = ?event.outcome,
                actor = %event.actor,
                metadata = %metadata,
                "audit event"
            ),
        }
    }
}
