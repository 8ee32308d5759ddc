//! HTTP client for peer activity
//!
//! Peer base URLs are looked up in the registry on every call. Each fetch is
//! a plain `GET {base}/{collection}/?user={id}` returning a one-field JSON
//! envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::{ActivityProvider, KeyValueRegistry};
use crate::domain::{Comment, DomainError, DomainResult, Rating, Reservation};

/// Registry keys naming the peer base URLs.
#[derive(Debug, Clone)]
pub struct PeerKeys {
    pub ratings_comments: String,
    pub reservations: String,
}

impl Default for PeerKeys {
    fn default() -> Self {
        Self {
            ratings_comments: "commratService".to_string(),
            reservations: "reservationsService".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RatingsEnvelope {
    #[serde(default)]
    ratings: Vec<Rating>,
}

#[derive(Deserialize)]
struct CommentsEnvelope {
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Deserialize)]
struct ReservationsEnvelope {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

pub struct HttpActivityAggregator {
    client: Client,
    registry: Arc<dyn KeyValueRegistry>,
    keys: PeerKeys,
}

impl HttpActivityAggregator {
    /// Build the shared client. Idle connections are not pooled so each
    /// peer call releases its socket when done.
    pub fn new(
        registry: Arc<dyn KeyValueRegistry>,
        keys: PeerKeys,
        request_timeout: Duration,
    ) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| DomainError::Upstream(format!("peer client: {}", e)))?;
        Ok(Self {
            client,
            registry,
            keys,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        peer: &'static str,
        base_key: &str,
        user_id: &str,
    ) -> DomainResult<T> {
        let result = self.fetch_inner(peer, base_key, user_id).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!("peer_requests_total", "peer" => peer, "outcome" => outcome)
            .increment(1);
        result
    }

    async fn fetch_inner<T: DeserializeOwned>(
        &self,
        peer: &'static str,
        base_key: &str,
        user_id: &str,
    ) -> DomainResult<T> {
        let base = self.registry.resolve(base_key).await?;
        let url = format!("{}/{}/", base.trim_end_matches('/'), peer);
        debug!(peer, url = %url, user_id, "fetching peer activity");

        let response = self
            .client
            .get(&url)
            .query(&[("user", user_id)])
            .send()
            .await
            .map_err(|e| DomainError::Upstream(format!("{} request failed: {}", peer, e)))?;

        if !response.status().is_success() {
            return Err(DomainError::Upstream(format!(
                "{} service returned {}",
                peer,
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DomainError::Upstream(format!("{} response malformed: {}", peer, e)))
    }
}

#[async_trait]
impl ActivityProvider for HttpActivityAggregator {
    async fn fetch_ratings(&self, user_id: &str) -> DomainResult<Vec<Rating>> {
        let env: RatingsEnvelope = self
            .fetch("ratings", &self.keys.ratings_comments, user_id)
            .await?;
        Ok(env.ratings)
    }

    async fn fetch_comments(&self, user_id: &str) -> DomainResult<Vec<Comment>> {
        let env: CommentsEnvelope = self
            .fetch("comments", &self.keys.ratings_comments, user_id)
            .await?;
        Ok(env.comments)
    }

    async fn fetch_reservations(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        let env: ReservationsEnvelope = self
            .fetch("reservations", &self.keys.reservations, user_id)
            .await?;
        Ok(env.reservations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::{
        extract::Query,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    use crate::infrastructure::registry::StaticRegistry;

    #[derive(Deserialize)]
    struct UserQuery {
        user: String,
    }

    async fn ratings(Query(q): Query<UserQuery>) -> Json<serde_json::Value> {
        Json(json!({
            "ratings": [
                {"id": "r1", "chargerID": "c9", "userID": q.user, "rating": 4,
                 "created": "2024-01-01", "modified": "2024-01-02"}
            ]
        }))
    }

    async fn comments() -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
    }

    async fn reservations() -> Json<serde_json::Value> {
        Json(json!({}))
    }

    /// Local stand-in for both peers; returns its base URL.
    async fn serve_peers() -> String {
        let app = Router::new()
            .route("/ratings/", get(ratings))
            .route("/comments/", get(comments))
            .route("/reservations/", get(reservations));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn aggregator() -> HttpActivityAggregator {
        let base = serve_peers().await;
        let registry = StaticRegistry::new(HashMap::from([
            ("commratService".to_string(), base.clone()),
            ("reservationsService".to_string(), base),
        ]));
        HttpActivityAggregator::new(
            Arc::new(registry),
            PeerKeys::default(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn ratings_decode_with_peer_field_names() {
        let agg = aggregator().await;
        let ratings = agg.fetch_ratings("u-1").await.unwrap();

        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].charger_id, "c9");
        assert_eq!(ratings[0].user_id, "u-1");
        assert_eq!(ratings[0].rating, 4);
    }

    #[tokio::test]
    async fn non_success_status_is_upstream() {
        let agg = aggregator().await;
        let err = agg.fetch_comments("u-1").await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }

    #[tokio::test]
    async fn missing_envelope_field_is_empty() {
        let agg = aggregator().await;
        assert!(agg.fetch_reservations("u-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_peer_is_upstream() {
        let agg = HttpActivityAggregator::new(
            Arc::new(StaticRegistry::default()),
            PeerKeys::default(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(
            agg.fetch_ratings("u-1").await,
            Err(DomainError::Upstream(_))
        ));
    }

    /// Peers that answer 200 with bodies the envelopes cannot decode.
    async fn serve_malformed_peers() -> String {
        let app = Router::new()
            .route("/ratings/", get(|| async { Json(json!({"ratings": "nope"})) }))
            .route("/comments/", get(|| async { "not json" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn aggregator_at(base: &str) -> HttpActivityAggregator {
        let registry = StaticRegistry::new(HashMap::from([
            ("commratService".to_string(), base.to_string()),
            ("reservationsService".to_string(), base.to_string()),
        ]));
        HttpActivityAggregator::new(
            Arc::new(registry),
            PeerKeys::default(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn malformed_success_body_is_upstream() {
        let agg = aggregator_at(&serve_malformed_peers().await);

        assert!(matches!(
            agg.fetch_ratings("u-1").await,
            Err(DomainError::Upstream(_))
        ));
        assert!(matches!(
            agg.fetch_comments("u-1").await,
            Err(DomainError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_peer_is_upstream() {
        let agg = aggregator_at("http://127.0.0.1:1");
        let err = agg.fetch_comments("u-1").await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }
}
