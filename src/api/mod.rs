//! Lead-routing API access.
//!
//! [`RoutingApi`] is the seam the mutation gateway and the CLI talk to;
//! [`RoutingClient`] is the reqwest-backed implementation.

pub mod client;
pub mod error;

pub use client::{ApiConfig, RoutingClient};
pub use error::ApiError;

use crate::models::QueuePage;
use async_trait::async_trait;

/// The five endpoints of the routing service this tool uses.
#[async_trait]
pub trait RoutingApi: Send + Sync {
    /// `GET /queue?pageSize=N`
    async fn fetch_queues(&self) -> Result<QueuePage, ApiError>;

    /// `POST /queue/{id}/user/update/weighted`
    async fn update_weight(
        &self,
        queue_id: &str,
        member_ids: &[String],
        weight: u32,
    ) -> Result<(), ApiError>;

    /// `POST /queue/{id}/user/unassign`
    async fn unassign(&self, queue_id: &str, member_ids: &[String]) -> Result<(), ApiError>;

    /// `POST /queue/{id}/user/assign`
    async fn assign(&self, queue_id: &str, member_ids: &[String]) -> Result<(), ApiError>;

    /// `POST /queue/{id}/user/assign/weighted`
    async fn assign_weighted(
        &self,
        queue_id: &str,
        member_ids: &[String],
        weight: u32,
    ) -> Result<(), ApiError>;
}
