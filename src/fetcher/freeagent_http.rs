//! FreeAgent HTTP transport
//!
//! Implements [`PageFetcher`] against the FreeAgent API with bearer
//! authentication, automatic access-token refresh on 401, and status-coded
//! error mapping so the controller can branch on failure kind.

use crate::config::Config;
use crate::fetcher::pagination::PaginationHints;
use crate::fetcher::{FetcherError, FetcherResult, PageFetcher, PageResult, RemoteItem};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// User agent reported to the API
const USER_AGENT: &str = concat!("freeagent-cache/", env!("CARGO_PKG_VERSION"));

/// Request timeout; the API is expected to answer well within this
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the FreeAgent invoice collection
///
/// Holds the configuration behind a mutex because a token refresh rotates
/// both tokens mid-run and persists them back to the config file.
pub struct FreeAgentClient {
    client: Client,
    config: Mutex<Config>,
    config_path: PathBuf,
}

impl FreeAgentClient {
    /// Create a client from loaded configuration
    ///
    /// `config_path` is where rotated tokens are written back after a
    /// refresh.
    pub fn new(config: Config, config_path: PathBuf) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetcherError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: Mutex::new(config),
            config_path,
        })
    }

    /// Build the collection URL for one page
    fn page_url(config: &Config, page: u32, per_page: u32) -> String {
        format!(
            "{}/invoices?nested_invoice_items={}&per_page={}&page={}",
            config.api_base_url, config.nested_invoice_items, per_page, page
        )
    }

    async fn execute(&self, url: &str, token: &str) -> FetcherResult<reqwest::Response> {
        self.client
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetcherError::Network(format!("request timed out: {e}"))
                } else {
                    FetcherError::Network(e.to_string())
                }
            })
    }

    /// Refresh the expired access token using the refresh token
    ///
    /// On success both tokens are rotated in memory and persisted back to the
    /// config file; a failed persist is logged but not fatal, since the run
    /// can continue with the in-memory tokens.
    async fn refresh_access_token(&self) -> FetcherResult<()> {
        let (token_url, refresh_token, client_id, client_secret) = {
            let config = self.config.lock().await;
            (
                format!("{}/token_endpoint", config.api_base_url),
                config.refresh_token.clone(),
                config.client_id.clone(),
                config.client_secret.clone(),
            )
        };

        info!("refreshing expired access token");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];
        let response = self
            .client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| FetcherError::Network(format!("token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FetcherError::Authentication(format!(
                "token refresh rejected with status {}; check refresh_token and client credentials",
                response.status()
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            refresh_token: String,
        }
        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| FetcherError::Parse(format!("invalid token response: {e}")))?;

        let mut config = self.config.lock().await;
        config.access_token = tokens.access_token;
        config.refresh_token = tokens.refresh_token;
        if let Err(e) = config.save(&self.config_path) {
            // Not fatal: the in-memory tokens cover this run, but the next
            // invocation will have to refresh again.
            warn!(error = %e, "failed to persist refreshed tokens");
        }
        info!("access token refreshed");
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for FreeAgentClient {
    async fn fetch_page(&self, page: u32, per_page: u32) -> FetcherResult<PageResult> {
        let (url, token) = {
            let config = self.config.lock().await;
            (
                Self::page_url(&config, page, per_page),
                config.access_token.clone(),
            )
        };

        debug!(%url, "fetching page");
        let mut response = self.execute(&url, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("access token rejected (401), attempting refresh");
            self.refresh_access_token().await?;
            let token = self.config.lock().await.access_token.clone();
            response = self.execute(&url, &token).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(FetcherError::Authentication(
                    "credentials rejected even after token refresh".to_string(),
                ));
            }
        }

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetcherError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetcherError::Http(format!(
                "unexpected status {status}: {body}"
            )));
        }

        let pagination = PaginationHints::from_headers(response.headers());
        let body: Value = response
            .json()
            .await
            .map_err(|e| FetcherError::Parse(format!("failed to deserialize page body: {e}")))?;

        let (items, malformed) = items_from_body(&body);
        Ok(PageResult {
            page_number: page,
            items,
            malformed,
            pagination,
        })
    }
}

/// Extract items from a page body of the shape `{"invoices": [ … ]}`
///
/// Elements missing a `url` field are skipped with a warning and counted,
/// so they still show up in the run report: one malformed item must not
/// abort the page. An absent or non-array `invoices` key is an empty page.
pub fn items_from_body(body: &Value) -> (Vec<RemoteItem>, usize) {
    let Some(raw) = body.get("invoices").and_then(Value::as_array) else {
        debug!("response body carries no invoices array");
        return (Vec::new(), 0);
    };

    let mut malformed = 0;
    let items = raw
        .iter()
        .filter_map(|item| match item.get("url").and_then(Value::as_str) {
            Some(url) => Some(RemoteItem {
                self_url: url.to_string(),
                payload: item.clone(),
            }),
            None => {
                warn!("item missing url field, skipping");
                malformed += 1;
                None
            }
        })
        .collect();
    (items, malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> Config {
        Config {
            api_base_url: "https://api.freeagent.com/v2".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            per_page: 50,
            nested_invoice_items: true,
        }
    }

    #[test]
    fn test_page_url_carries_pagination_parameters() {
        let url = FreeAgentClient::page_url(&sample_config(), 3, 50);
        assert_eq!(
            url,
            "https://api.freeagent.com/v2/invoices?nested_invoice_items=true&per_page=50&page=3"
        );
    }

    #[test]
    fn test_items_from_body_extracts_url_and_payload() {
        let body = json!({
            "invoices": [
                {"url": "https://api.freeagent.com/v2/invoices/1", "reference": "INV-1"},
                {"url": "https://api.freeagent.com/v2/credit_notes/2", "reference": "CN-2"},
            ]
        });

        let (items, malformed) = items_from_body(&body);
        assert_eq!(items.len(), 2);
        assert_eq!(malformed, 0);
        assert_eq!(items[0].self_url, "https://api.freeagent.com/v2/invoices/1");
        assert_eq!(items[0].payload["reference"], "INV-1");
    }

    #[test]
    fn test_items_missing_url_are_skipped_and_counted() {
        let body = json!({
            "invoices": [
                {"reference": "no-url"},
                {"url": "https://api.freeagent.com/v2/invoices/1"},
            ]
        });

        let (items, malformed) = items_from_body(&body);
        assert_eq!(items.len(), 1);
        assert_eq!(malformed, 1);
    }

    #[test]
    fn test_body_without_invoices_key_is_empty_page() {
        let (items, malformed) = items_from_body(&json!({}));
        assert!(items.is_empty());
        assert_eq!(malformed, 0);

        let (items, _) = items_from_body(&json!({"invoices": null}));
        assert!(items.is_empty());
    }
}
