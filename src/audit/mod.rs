use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;

/// Audit event as emitted by handlers, before persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub tenant_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    /// Dotted action name, e.g. "user.create"
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        tenant_id: Option<Uuid>,
        actor_id: Option<Uuid>,
        action: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: Option<Uuid>,
        detail: Value,
    ) -> Self {
        Self {
            tenant_id,
            actor_id,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id,
            detail,
            created_at: Utc::now(),
        }
    }
}

/// Destination for drained audit events. Sink failures are logged by the
/// writer task and never surfaced to the request that emitted the event.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

/// Production sink: inserts into the audit_events table.
///
/// The pool is looked up per write, so the pipeline keeps working when
/// the database was unreachable at startup and only came up later. Until
/// then each write fails and the writer task logs the loss.
#[derive(Default)]
pub struct PgAuditSink;

impl PgAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn write(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let pool = DatabaseManager::pool().await?;
        sqlx::query(
            r#"
            INSERT INTO audit_events (tenant_id, actor_id, action, resource_type, resource_id, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.tenant_id)
        .bind(event.actor_id)
        .bind(&event.action)
        .bind(&event.resource_type)
        .bind(event.resource_id)
        .bind(&event.detail)
        .bind(event.created_at)
        .execute(&pool)
        .await?;
        Ok(())
    }
}

/// Test sink: collects events in memory
#[derive(Default)]
pub struct MemoryAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit sink lock").clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, event: &AuditEvent) -> anyhow::Result<()> {
        self.events.lock().expect("audit sink lock").push(event.clone());
        Ok(())
    }
}

/// Non-blocking audit pipeline: `record` pushes onto an unbounded channel,
/// a background task drains it into the configured sink.
pub struct AuditLogger {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

static LOGGER: OnceLock<AuditLogger> = OnceLock::new();

impl AuditLogger {
    /// Start the writer task and install the global logger. Subsequent
    /// calls are no-ops; the first sink wins.
    pub fn init(sink: std::sync::Arc<dyn AuditSink>) {
        LOGGER.get_or_init(|| Self::spawn(sink));
    }

    fn spawn(sink: std::sync::Arc<dyn AuditSink>) -> AuditLogger {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.write(&event).await {
                    tracing::error!(
                        action = %event.action,
                        "Failed to persist audit event: {}",
                        e
                    );
                }
            }
        });

        AuditLogger { tx }
    }

    /// Emit an event. Drops it only when audit logging is disabled by
    /// config, and logs if the logger was never initialized.
    pub fn record(event: AuditEvent) {
        Self::record_if(
            config::config().security.enable_audit_logging,
            LOGGER.get(),
            event,
        );
    }

    fn record_if(enabled: bool, logger: Option<&AuditLogger>, event: AuditEvent) {
        if !enabled {
            return;
        }
        match logger {
            Some(logger) => {
                // Send only fails when the writer task is gone; at that
                // point the process is shutting down anyway.
                if logger.tx.send(event).is_err() {
                    tracing::warn!("Audit writer task is not running, event dropped");
                }
            }
            None => {
                tracing::warn!(action = %event.action, "Audit logger not initialized, event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_sink_collects_events() {
        let sink = MemoryAuditSink::new();
        let event = AuditEvent::new(
            Some(Uuid::new_v4()),
            Some(Uuid::new_v4()),
            "user.create",
            "user",
            Some(Uuid::new_v4()),
            json!({ "email": "new@acme.test" }),
        );

        sink.write(&event).await.unwrap();
        sink.write(&event).await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "user.create");
        assert_eq!(events[0].detail["email"], "new@acme.test");
    }

    #[tokio::test]
    async fn writer_task_drains_channel() {
        let sink = std::sync::Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::spawn(sink.clone());

        let event = AuditEvent::new(None, None, "tenant.create", "tenant", None, json!({}));
        logger.tx.send(event).unwrap();

        // Give the writer task a moment to drain
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn disabled_gate_drops_events_before_the_channel() {
        let sink = std::sync::Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::spawn(sink.clone());

        let event = AuditEvent::new(None, None, "user.create", "user", None, json!({}));
        AuditLogger::record_if(false, Some(&logger), event.clone());
        AuditLogger::record_if(true, Some(&logger), event);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "user.create");
    }

    /// Sink that fails once, then behaves. Stands in for a database that
    /// was down when the first events arrived.
    struct FlakySink {
        fail_next: std::sync::atomic::AtomicBool,
        inner: MemoryAuditSink,
    }

    #[async_trait]
    impl AuditSink for FlakySink {
        async fn write(&self, event: &AuditEvent) -> anyhow::Result<()> {
            if self.fail_next.swap(false, std::sync::atomic::Ordering::SeqCst) {
                anyhow::bail!("sink offline");
            }
            self.inner.write(event).await
        }
    }

    #[tokio::test]
    async fn writer_keeps_draining_after_sink_errors() {
        let sink = std::sync::Arc::new(FlakySink {
            fail_next: std::sync::atomic::AtomicBool::new(true),
            inner: MemoryAuditSink::new(),
        });
        let logger = AuditLogger::spawn(sink.clone());

        let first = AuditEvent::new(None, None, "user.create", "user", None, json!({}));
        let second = AuditEvent::new(None, None, "user.update", "user", None, json!({}));
        AuditLogger::record_if(true, Some(&logger), first);
        AuditLogger::record_if(true, Some(&logger), second);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let events = sink.inner.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "user.update");
    }
}
