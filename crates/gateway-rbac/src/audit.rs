//! Decision audit logging.

use crate::config::RbacConfig;
use crate::error::{PermissionDeniedError, RbacError};
use crate::secured::OperationKey;
use gateway_core::{EntityType, OperationType, UserKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event ID.
    pub id: String,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// User the decision was made for.
    pub user: String,
    /// Secured operation, as `service::method`.
    pub method: String,
    /// Attempted operation.
    pub operation: Option<OperationType>,
    /// Entity type involved.
    pub entity_type: Option<EntityType>,
    /// Entity involved, if the decision concerned one entity.
    pub entity: Option<String>,
    /// Decision made.
    pub decision: AuditDecision,
    /// Decision reason.
    pub reason: Option<String>,
}

/// Audit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditDecision {
    /// Access allowed.
    Allowed,
    /// Access denied.
    Denied,
    /// The decision could not be made.
    Error,
}

impl AuditEvent {
    /// Creates a new audit event.
    pub fn new(user: impl Into<String>, method: impl Into<String>, decision: AuditDecision) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            user: user.into(),
            method: method.into(),
            operation: None,
            entity_type: None,
            entity: None,
            decision,
            reason: None,
        }
    }

    /// Creates a denial event.
    pub fn denied(user: &UserKey, method: &OperationKey, denial: &PermissionDeniedError) -> Self {
        let mut event = Self::new(user.to_string(), method.to_string(), AuditDecision::Denied);
        event.operation = Some(denial.operation);
        event.entity_type = denial.entity_type;
        event.entity = denial.entity.as_ref().map(ToString::to_string);
        event.reason = Some(denial.to_string());
        event
    }

    /// Creates an allowed event.
    pub fn allowed(user: &UserKey, method: &OperationKey, operation: OperationType) -> Self {
        let mut event = Self::new(user.to_string(), method.to_string(), AuditDecision::Allowed);
        event.operation = Some(operation);
        event
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Audit log sink trait.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);

    /// Flushes any buffered events.
    fn flush(&self) {}
}

/// In-memory audit sink holding the most recent events.
pub struct InMemoryAuditSink {
    events: RwLock<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Creates a new in-memory sink.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
        }
    }

    /// Creates a sink sized by `audit_capacity`.
    pub fn from_config(config: &RbacConfig) -> Self {
        Self::new(config.audit_capacity)
    }

    /// Returns all events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().iter().cloned().collect()
    }

    /// Clears all events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events filtered by user.
    pub fn events_for_user(&self, user: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.user == user)
            .cloned()
            .collect()
    }

    /// Returns denied events.
    pub fn denied_events(&self) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.decision == AuditDecision::Denied)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        let mut events = self.events.write();
        events.push_back(event.clone());
        while events.len() > self.max_events {
            events.pop_front();
        }
    }
}

/// Audit sink that writes events to `tracing`.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match event.decision {
            AuditDecision::Allowed => {
                tracing::trace!(
                    user = %event.user,
                    method = %event.method,
                    operation = ?event.operation,
                    decision = "allowed",
                    "Access audit"
                );
            }
            AuditDecision::Denied => {
                tracing::info!(
                    user = %event.user,
                    method = %event.method,
                    operation = ?event.operation,
                    entity_type = ?event.entity_type,
                    entity = ?event.entity,
                    decision = "denied",
                    reason = ?event.reason,
                    "Access audit"
                );
            }
            AuditDecision::Error => {
                tracing::error!(
                    user = %event.user,
                    method = %event.method,
                    decision = "error",
                    reason = ?event.reason,
                    "Access audit"
                );
            }
        }
    }
}

/// Fans decision events out to every registered sink.
#[derive(Default)]
pub struct AccessAudit {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AccessAudit {
    /// Creates an audit service without sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Adds a sink.
    pub fn add_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    /// Records an event to all sinks.
    pub fn record(&self, event: &AuditEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }

    /// Records an invocation that passed its checks.
    pub fn record_allowed(&self, user: &UserKey, method: &OperationKey, operation: OperationType) {
        if self.sinks.is_empty() {
            return;
        }
        self.record(&AuditEvent::allowed(user, method, operation));
    }

    /// Records a permission denial.
    pub fn record_denial(&self, user: &UserKey, method: &OperationKey, denial: &PermissionDeniedError) {
        if self.sinks.is_empty() {
            return;
        }
        self.record(&AuditEvent::denied(user, method, denial));
    }

    /// Records a failed decision.
    pub fn record_error(&self, user: Option<&UserKey>, method: &OperationKey, error: &RbacError) {
        if self.sinks.is_empty() {
            return;
        }
        let user = user.map_or_else(|| "<none>".to_string(), ToString::to_string);
        let event = AuditEvent::new(user, method.to_string(), AuditDecision::Error).with_reason(error.to_string());
        self.record(&event);
    }

    /// Flushes all sinks.
    pub fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}
