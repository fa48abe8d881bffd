//! Queue membership mutations.
//!
//! Each operation is a single remote call with no retry. Weight updates
//! are followed by a best-effort audit row; a failing audit sink is logged
//! and never turns a successful mutation into a failure.

use crate::api::{ApiError, RoutingApi};
use crate::audit::{ActionKind, AuditEntry, AuditSink};
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Allowed routing weights.
pub const WEIGHT_RANGE: RangeInclusive<u32> = 1..=100;

/// Why a mutation did not happen.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("weight must be between 1 and 100, got {0}")]
    InvalidWeight(u32),

    #[error(transparent)]
    Remote(#[from] ApiError),
}

/// A uniform weight change for members of one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightChange {
    pub queue_id: String,
    pub member_ids: Vec<String>,
    pub weight: u32,
    /// Queue name recorded in the audit row.
    pub queue_name: String,
    /// Rep name recorded in the audit row.
    pub rep_name: String,
}

fn check_weight(weight: u32) -> Result<(), MutationError> {
    if WEIGHT_RANGE.contains(&weight) {
        Ok(())
    } else {
        Err(MutationError::InvalidWeight(weight))
    }
}

/// Issues membership changes against the routing service.
pub struct MutationGateway<A, S> {
    api: A,
    audit: S,
    actor: String,
}

impl<A: RoutingApi, S: AuditSink> MutationGateway<A, S> {
    /// `actor` is recorded as the acting user on audit rows.
    pub fn new(api: A, audit: S, actor: impl Into<String>) -> Self {
        Self {
            api,
            audit,
            actor: actor.into(),
        }
    }

    /// Set the same weight for `change.member_ids` in `change.queue_id`.
    pub async fn set_weight(&self, change: &WeightChange) -> Result<(), MutationError> {
        check_weight(change.weight)?;

        info!(
            "Updating weight to {} for {:?} in queue_id={}",
            change.weight, change.member_ids, change.queue_id
        );
        self.api
            .update_weight(&change.queue_id, &change.member_ids, change.weight)
            .await
            .map_err(|e| {
                error!("Error updating weights: queue_id={}, error={}", change.queue_id, e);
                e
            })?;

        let entry = AuditEntry::now(
            &self.actor,
            ActionKind::WeightUpdate,
            &change.queue_name,
            &change.rep_name,
            format!("Updated weight to {}", change.weight),
        );
        match self.audit.append(&entry).await {
            Ok(()) => info!("Logged action: {} by {}", entry.action, self.actor),
            Err(e) => warn!("Failed to log action: {}", e),
        }

        Ok(())
    }

    /// Remove members from a queue. Not audited.
    pub async fn unassign(&self, queue_id: &str, member_ids: &[String]) -> Result<(), MutationError> {
        info!(
            "Removing users from queue_id={}, user_ids={:?}",
            queue_id, member_ids
        );
        self.api.unassign(queue_id, member_ids).await.map_err(|e| {
            error!("Error removing users: queue_id={}, error={}", queue_id, e);
            e
        })?;
        info!("Removed users from queue_id={}", queue_id);
        Ok(())
    }

    /// Add members to a queue, weighted when `weight` is given. Not audited.
    pub async fn assign(
        &self,
        queue_id: &str,
        member_ids: &[String],
        weight: Option<u32>,
    ) -> Result<(), MutationError> {
        let result = match weight {
            Some(weight) => {
                check_weight(weight)?;
                info!(
                    "Adding users with weight {} to queue_id={}, user_ids={:?}",
                    weight, queue_id, member_ids
                );
                self.api.assign_weighted(queue_id, member_ids, weight).await
            }
            None => {
                info!("Adding users to queue_id={}, user_ids={:?}", queue_id, member_ids);
                self.api.assign(queue_id, member_ids).await
            }
        };

        result.map_err(|e| {
            error!("Error adding users: queue_id={}, error={}", queue_id, e);
            e
        })?;
        info!("Added users to queue_id={}", queue_id);
        Ok(())
    }

    /// Change a member's position. The routing service has no endpoint for
    /// this yet, so nothing is sent and the call always succeeds.
    pub async fn set_order(
        &self,
        queue_id: &str,
        member_id: &str,
        order: i64,
    ) -> Result<(), MutationError> {
        debug!(
            "Order update for member {} in queue_id={} to {} is not supported remotely; skipping",
            member_id, queue_id, order
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditError;
    use crate::models::QueuePage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call; fails all of them when `fail_with` is set.
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        fail_with: Option<u16>,
    }

    impl FakeApi {
        fn failing(status: u16) -> Self {
            Self {
                fail_with: Some(status),
                ..Self::default()
            }
        }

        fn record(&self, call: String) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            match self.fail_with {
                Some(status) => Err(ApiError::Status {
                    status,
                    body: "nope".to_string(),
                }),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RoutingApi for FakeApi {
        async fn fetch_queues(&self) -> Result<QueuePage, ApiError> {
            self.record("fetch".to_string())?;
            Ok(QueuePage::default())
        }

        async fn update_weight(&self, q: &str, ids: &[String], w: u32) -> Result<(), ApiError> {
            self.record(format!("update_weight {} {:?} {}", q, ids, w))
        }

        async fn unassign(&self, q: &str, ids: &[String]) -> Result<(), ApiError> {
            self.record(format!("unassign {} {:?}", q, ids))
        }

        async fn assign(&self, q: &str, ids: &[String]) -> Result<(), ApiError> {
            self.record(format!("assign {} {:?}", q, ids))
        }

        async fn assign_weighted(&self, q: &str, ids: &[String], w: u32) -> Result<(), ApiError> {
            self.record(format!("assign_weighted {} {:?} {}", q, ids, w))
        }
    }

    #[derive(Default)]
    struct MemoryAudit {
        rows: Mutex<Vec<AuditEntry>>,
        broken: bool,
    }

    #[async_trait]
    impl AuditSink for MemoryAudit {
        async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
            if self.broken {
                return Err(AuditError::NotConfigured);
            }
            self.rows.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn change(weight: u32) -> WeightChange {
        WeightChange {
            queue_id: "q1".to_string(),
            member_ids: vec!["u1".to_string()],
            weight,
            queue_name: "Inbound".to_string(),
            rep_name: "Ada".to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_weight_success_writes_audit_row() {
        let gateway = MutationGateway::new(FakeApi::default(), MemoryAudit::default(), "ops@example.com");

        gateway.set_weight(&change(40)).await.unwrap();

        assert_eq!(gateway.api.calls(), vec![r#"update_weight q1 ["u1"] 40"#]);
        let rows = gateway.audit.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, ActionKind::WeightUpdate);
        assert_eq!(rows[0].user, "ops@example.com");
        assert_eq!(rows[0].queue, "Inbound");
        assert_eq!(rows[0].rep, "Ada");
        assert!(rows[0].details.contains("40"));
    }

    #[tokio::test]
    async fn test_set_weight_failure_writes_no_audit_row() {
        let gateway = MutationGateway::new(FakeApi::failing(500), MemoryAudit::default(), "ops");

        let err = gateway.set_weight(&change(40)).await.unwrap_err();

        assert!(matches!(err, MutationError::Remote(ApiError::Status { status: 500, .. })));
        assert!(err.to_string().contains("500"));
        assert!(gateway.audit.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_set_weight() {
        let audit = MemoryAudit {
            broken: true,
            ..MemoryAudit::default()
        };
        let gateway = MutationGateway::new(FakeApi::default(), audit, "ops");

        assert!(gateway.set_weight(&change(10)).await.is_ok());
        assert_eq!(gateway.api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_weight_makes_no_call() {
        let gateway = MutationGateway::new(FakeApi::default(), MemoryAudit::default(), "ops");

        assert!(matches!(
            gateway.set_weight(&change(0)).await,
            Err(MutationError::InvalidWeight(0))
        ));
        assert!(matches!(
            gateway.assign("q1", &["u1".to_string()], Some(101)).await,
            Err(MutationError::InvalidWeight(101))
        ));
        assert!(gateway.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unassign_is_not_audited() {
        let gateway = MutationGateway::new(FakeApi::default(), MemoryAudit::default(), "ops");

        gateway.unassign("q1", &["u1".to_string(), "u2".to_string()]).await.unwrap();

        assert_eq!(gateway.api.calls(), vec![r#"unassign q1 ["u1", "u2"]"#]);
        assert!(gateway.audit.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unassign_failure_is_reported() {
        let gateway = MutationGateway::new(FakeApi::failing(404), MemoryAudit::default(), "ops");
        let err = gateway.unassign("q1", &["u1".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_assign_picks_endpoint_by_weight() {
        let gateway = MutationGateway::new(FakeApi::default(), MemoryAudit::default(), "ops");
        let ids = vec!["u1".to_string()];

        gateway.assign("q1", &ids, None).await.unwrap();
        gateway.assign("q2", &ids, Some(50)).await.unwrap();

        assert_eq!(
            gateway.api.calls(),
            vec![r#"assign q1 ["u1"]"#, r#"assign_weighted q2 ["u1"] 50"#]
        );
        assert!(gateway.audit.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_order_is_a_no_op() {
        let gateway = MutationGateway::new(FakeApi::failing(500), MemoryAudit::default(), "ops");

        assert!(gateway.set_order("q1", "u1", 3).await.is_ok());
        assert!(gateway.api.calls().is_empty());
    }
}
