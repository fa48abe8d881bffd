//! HTTP client for the lead-routing REST API.

use crate::api::error::ApiError;
use crate::api::RoutingApi;
use crate::models::QueuePage;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection settings for the routing API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// `pageSize` for `GET /queue`.
    pub page_size: usize,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://edge.na.chilipiper.com".to_string(),
            api_key: String::new(),
            page_size: 100,
            timeout_seconds: 30,
        }
    }
}

/// Body of the weighted endpoints.
#[derive(Debug, Serialize)]
struct WeightedUsers<'a> {
    users: &'a [String],
    weight: u32,
}

/// Bearer-authenticated client for the routing service.
///
/// Cheap to clone; the inner [`reqwest::Client`] is reference counted.
#[derive(Clone)]
pub struct RoutingClient {
    http_client: Client,
    config: ApiConfig,
}

impl RoutingClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorized(req).send().await.map_err(|e| {
            ApiError::from_transport(e, &self.config.base_url, self.config.timeout_seconds)
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(response)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ApiError> {
        debug!("POST {}", path);
        self.send(self.http_client.post(self.url(path)).json(body))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl RoutingApi for RoutingClient {
    async fn fetch_queues(&self) -> Result<QueuePage, ApiError> {
        info!("Fetching queue data from routing API");

        let response = self
            .send(
                self.http_client
                    .get(self.url("/queue"))
                    .query(&[("pageSize", self.config.page_size.to_string())]),
            )
            .await?;

        let page: QueuePage = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        info!("Fetched {} queues", page.elements.len());
        if let Some(total) = page.total {
            if total > page.elements.len() {
                warn!(
                    "Routing API reports {} queues but only {} were returned; later pages are not fetched",
                    total,
                    page.elements.len()
                );
            }
        }

        Ok(page)
    }

    async fn update_weight(
        &self,
        queue_id: &str,
        member_ids: &[String],
        weight: u32,
    ) -> Result<(), ApiError> {
        self.post_json(
            &format!("/queue/{}/user/update/weighted", queue_id),
            &WeightedUsers {
                users: member_ids,
                weight,
            },
        )
        .await
    }

    async fn unassign(&self, queue_id: &str, member_ids: &[String]) -> Result<(), ApiError> {
        self.post_json(&format!("/queue/{}/user/unassign", queue_id), member_ids)
            .await
    }

    async fn assign(&self, queue_id: &str, member_ids: &[String]) -> Result<(), ApiError> {
        self.post_json(&format!("/queue/{}/user/assign", queue_id), member_ids)
            .await
    }

    async fn assign_weighted(
        &self,
        queue_id: &str,
        member_ids: &[String],
        weight: u32,
    ) -> Result<(), ApiError> {
        self.post_json(
            &format!("/queue/{}/user/assign/weighted", queue_id),
            &WeightedUsers {
                users: member_ids,
                weight,
            },
        )
        .await
    }
}
