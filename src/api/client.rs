use log::debug;
use reqwest::{Client, Response};
use uuid::Uuid;

use crate::api::types::{
    EndSessionResponse, StartSessionRequest, StartSessionResponse, UserIdentity,
    UserSessionsResponse,
};
use crate::error_handling::ApiError;

/// REST boundary to the proctoring backend. Sessions are authenticated
/// by cookie, so the underlying client carries a cookie store.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn start_session(
        &self,
        duration_mins: u64,
    ) -> Result<StartSessionResponse, ApiError> {
        let url = format!("{}/session/start", self.base_url);
        debug!("starting session via {}", url);

        let response = self
            .client
            .post(&url)
            .json(&StartSessionRequest {
                session_duration: duration_mins,
            })
            .send()
            .await?;

        Self::check(response)
            .await?
            .json::<StartSessionResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn end_session(&self, session_id: Uuid) -> Result<EndSessionResponse, ApiError> {
        let url = format!("{}/session/end", self.base_url);
        debug!("ending session {} via {}", session_id, url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await?;

        Self::check(response)
            .await?
            .json::<EndSessionResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn me(&self) -> Result<UserIdentity, ApiError> {
        let url = format!("{}/me", self.base_url);
        let response = self.client.get(&url).send().await?;

        Self::check(response)
            .await?
            .json::<UserIdentity>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn user_sessions(&self, user_id: Uuid) -> Result<UserSessionsResponse, ApiError> {
        let url = format!("{}/sessions/user/{}", self.base_url, user_id);
        let response = self.client.get(&url).send().await?;

        Self::check(response)
            .await?
            .json::<UserSessionsResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status(status.as_u16(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_request_error() {
        // Nothing listens on this port.
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
    }
}
