//! HTTP transport for `POST /api/v1/sync/`

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};

use super::{SyncRequest, SyncResponse, SyncTransport};
use crate::auth::AccessTokenProvider;
use crate::config::ClientConfig;
use crate::util::parse_api_error;
use crate::{Error, Result};

const TENANT_HEADER: &str = "X-Tenant-ID";

/// Tenant-scoped sync transport over HTTPS.
///
/// A 401 triggers exactly one token refresh and one retry with the same body.
pub struct HttpSyncTransport<P: AccessTokenProvider> {
    client: Client,
    endpoint: String,
    tenant_id: String,
    tokens: P,
}

impl<P: AccessTokenProvider> HttpSyncTransport<P> {
    pub fn new(config: &ClientConfig, tokens: P) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.sync_endpoint(),
            tenant_id: config.tenant_id.clone(),
            tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub const fn tokens(&self) -> &P {
        &self.tokens
    }

    async fn send(&self, token: &str, body: &[u8]) -> Result<Response> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header(TENANT_HEADER, &self.tenant_id)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;
        Ok(response)
    }
}

impl<P: AccessTokenProvider> SyncTransport for HttpSyncTransport<P> {
    async fn push_pull(&self, request: &SyncRequest) -> Result<SyncResponse> {
        let body = request.to_body()?;
        let token = self.tokens.access_token()?;
        let mut response = self.send(&token, &body).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Sync request unauthorized; refreshing access token and retrying once");
            let token = self.tokens.refresh_access_token().await?;
            response = self.send(&token, &body).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(Error::Unauthorized);
            }
        }

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &text),
            });
        }

        SyncResponse::from_json(&text)
    }
}
