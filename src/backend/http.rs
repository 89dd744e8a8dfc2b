use reqwest::Client as HttpClient;
use serde_json::json;

use crate::{
    backend::VoiceBackend,
    error::{AppError, AppResult},
    models::{CfScoreRow, FavoriteRow, Identity, SwipeEventRow, VoicePostRow},
};

const POST_SELECT: &str = "id,catch_copy,voice_path,is_boosted,created_at,\
vliver_profiles(id,name,handle,image_path,color,tags,description)";

/// Backend client speaking the hosted service's REST and RPC dialect
pub struct HttpBackend {
    http_client: HttpClient,
    base_url: String,
    anon_key: String,
}

impl HttpBackend {
    pub fn new(base_url: String, anon_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        }
    }

    fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Checks the response status, logging and mapping failures
    async fn expect_success(
        context: &'static str,
        response: reqwest::Response,
    ) -> AppResult<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                context = context,
                status = %status,
                body = %body,
                "Backend request failed"
            );
            return Err(AppError::RemoteApi(format!(
                "{} returned status {}: {}",
                context, status, body
            )));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl VoiceBackend for HttpBackend {
    async fn fetch_published_posts(&self) -> AppResult<Vec<VoicePostRow>> {
        let response = self
            .authed(self.http_client.get(self.rest_url("voice_posts")))
            .query(&[
                ("select", POST_SELECT),
                ("is_published", "eq.true"),
                ("order", "is_boosted.desc,created_at.desc"),
            ])
            .send()
            .await?;

        let rows: Vec<VoicePostRow> = Self::expect_success("voice_posts", response)
            .await?
            .json()
            .await?;

        tracing::info!(row_count = rows.len(), "Fetched published voice posts");

        Ok(rows)
    }

    async fn fetch_cf_scores(&self, identity: Identity) -> AppResult<Vec<CfScoreRow>> {
        let url = format!("{}/rest/v1/rpc/get_cf_scores", self.base_url);

        let response = self
            .authed(self.http_client.post(&url))
            .json(&json!({ "p_user_id": identity.0 }))
            .send()
            .await?;

        let rows: Vec<CfScoreRow> = Self::expect_success("get_cf_scores", response)
            .await?
            .json()
            .await?;

        tracing::info!(
            user_id = %identity,
            score_count = rows.len(),
            "Fetched collaborative-filtering scores"
        );

        Ok(rows)
    }

    async fn upsert_swipe_event(&self, event: SwipeEventRow) -> AppResult<()> {
        let response = self
            .authed(self.http_client.post(self.rest_url("swipe_events")))
            .query(&[("on_conflict", "user_id,voice_post_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&event)
            .send()
            .await?;

        Self::expect_success("swipe_events", response).await?;
        Ok(())
    }

    async fn upsert_favorite(&self, row: FavoriteRow) -> AppResult<()> {
        let response = self
            .authed(self.http_client.post(self.rest_url("favorites")))
            .query(&[("on_conflict", "user_id,post_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await?;

        Self::expect_success("favorites upsert", response).await?;
        Ok(())
    }

    async fn delete_favorite(&self, row: FavoriteRow) -> AppResult<()> {
        let response = self
            .authed(self.http_client.delete(self.rest_url("favorites")))
            .query(&[
                ("user_id", format!("eq.{}", row.user_id)),
                ("post_id", format!("eq.{}", row.post_id)),
            ])
            .send()
            .await?;

        Self::expect_success("favorites delete", response).await?;
        Ok(())
    }

    async fn count_unread_notifications(&self, identity: Identity) -> AppResult<u64> {
        let user_filter = format!("eq.{}", identity);
        let response = self
            .authed(self.http_client.get(self.rest_url("notifications")))
            .query(&[
                ("select", "id"),
                ("user_id", user_filter.as_str()),
                ("is_read", "eq.false"),
            ])
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?;

        let response = Self::expect_success("notifications count", response).await?;

        // Total count rides in the Content-Range header, e.g. "0-0/42"
        let count = response
            .headers()
            .get("content-range")
            .and_then(|h| h.to_str().ok())
            .and_then(|range| range.rsplit('/').next())
            .and_then(|total| total.parse::<u64>().ok())
            .ok_or_else(|| {
                AppError::RemoteApi("notifications count missing Content-Range".to_string())
            })?;

        Ok(count)
    }

    fn resolve_storage_url(&self, bucket: &str, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        if path.starts_with("http") {
            return path.to_string();
        }
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
