// PagerDuty REST API client.

use crate::config::PagerDutyConfig;
use crate::domain::model::ServiceRecord;
use crate::domain::ports::ServiceSource;
use crate::utils::error::{PluginError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;

const PAGERDUTY_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

#[derive(Debug, Deserialize)]
struct RawService {
    id: String,
    name: String,
    html_url: String,
}

impl From<RawService> for ServiceRecord {
    fn from(raw: RawService) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            homepage_url: raw.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServicesPage {
    #[serde(default)]
    services: Vec<RawService>,
    #[serde(default)]
    more: bool,
}

pub struct PagerDutyClient {
    client: Client,
    api_url: String,
    token: Option<String>,
    max_pages: u32,
}

impl PagerDutyClient {
    pub fn new(config: &PagerDutyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token().map(str::to_string),
            max_pages: config.max_pages.max(1),
        })
    }

    /// Fetches up to `max_pages` pages of services.
    ///
    /// `offset` is sent as the page index, and paging stops at the cap even when upstream
    /// still reports `more`.
    pub async fn fetch_services(&self) -> Result<Vec<ServiceRecord>> {
        let token = self.token.as_deref().ok_or(PluginError::MissingToken)?;

        let mut services = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let page = self.request_page(token, offset).await?;
            services.extend(page.services.into_iter().map(ServiceRecord::from));

            if !page.more {
                break;
            }
            if offset + 1 >= self.max_pages {
                tracing::debug!(
                    "Stopping after {} pages, upstream reports more services",
                    self.max_pages
                );
                break;
            }
            offset += 1;
        }

        tracing::debug!("Fetched {} services from PagerDuty", services.len());
        Ok(services)
    }

    async fn request_page(&self, token: &str, offset: u32) -> Result<ServicesPage> {
        let url = format!("{}/services", self.api_url);
        tracing::debug!("📡 GET {}?offset={}", url, offset);

        let response = self
            .client
            .get(&url)
            .query(&[("offset", offset)])
            .header(AUTHORIZATION, format!("Token token={}", token))
            .header(ACCEPT, PAGERDUTY_ACCEPT)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PluginError::Upstream {
                status: status.as_u16(),
                message: error_messages(&body),
            });
        }

        Ok(response.json::<ServicesPage>().await?)
    }
}

#[async_trait]
impl ServiceSource for PagerDutyClient {
    async fn fetch_services(&self) -> Result<Vec<ServiceRecord>> {
        PagerDutyClient::fetch_services(self).await
    }
}

/// Joins the `errors` list of an error payload with single spaces.
///
/// Looks at a top-level `errors` array first, then PagerDuty's `error.errors` and
/// `error.message`; falls back to the raw body.
fn error_messages(body: &str) -> String {
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let join = |value: &serde_json::Value| -> Option<String> {
        let items = value.as_array()?;
        Some(
            items
                .iter()
                .map(|item| match item.as_str() {
                    Some(s) => s.to_string(),
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" "),
        )
    };

    join(&payload["errors"])
        .or_else(|| join(&payload["error"]["errors"]).filter(|s| !s.is_empty()))
        .or_else(|| payload["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config_for(server: &MockServer, token: Option<&str>) -> PagerDutyConfig {
        PagerDutyConfig {
            api_token: token.map(str::to_string),
            api_url: server.base_url(),
            ..PagerDutyConfig::default()
        }
    }

    fn page(ids: &[&str], more: bool) -> serde_json::Value {
        let services: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "name": format!("Service {}", id),
                    "html_url": format!("https://acme.pagerduty.com/services/{}", id),
                    "summary": "ignored"
                })
            })
            .collect();
        json!({ "services": services, "more": more, "limit": 25 })
    }

    #[tokio::test]
    async fn test_fetch_single_page_normalizes_records() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/services")
                .query_param("offset", "0")
                .header("Authorization", "Token token=secret")
                .header("Accept", "application/vnd.pagerduty+json;version=2")
                .header("Content-Type", "application/json");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(page(&["P1", "P2"], false));
        });

        let client = PagerDutyClient::new(&config_for(&server, Some("secret"))).unwrap();
        let services = client.fetch_services().await.unwrap();

        api_mock.assert();
        assert_eq!(
            services,
            vec![
                ServiceRecord {
                    id: "P1".to_string(),
                    name: "Service P1".to_string(),
                    homepage_url: "https://acme.pagerduty.com/services/P1".to_string(),
                },
                ServiceRecord {
                    id: "P2".to_string(),
                    name: "Service P2".to_string(),
                    homepage_url: "https://acme.pagerduty.com/services/P2".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_pagination_is_capped_at_three_pages() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).path("/services").query_param("offset", "0");
            then.status(200).json_body(page(&["A"], true));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/services").query_param("offset", "1");
            then.status(200).json_body(page(&["B"], true));
        });
        let third = server.mock(|when, then| {
            when.method(GET).path("/services").query_param("offset", "2");
            then.status(200).json_body(page(&["C"], true));
        });
        let fourth = server.mock(|when, then| {
            when.method(GET).path("/services").query_param("offset", "3");
            then.status(200).json_body(page(&["D"], false));
        });

        let client = PagerDutyClient::new(&config_for(&server, Some("secret"))).unwrap();
        let services = client.fetch_services().await.unwrap();

        first.assert_hits(1);
        second.assert_hits(1);
        third.assert_hits(1);
        fourth.assert_hits(0);
        let ids: Vec<_> = services.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_max_pages_is_configurable() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/services");
            then.status(200).json_body(page(&["X"], true));
        });

        let config = PagerDutyConfig {
            max_pages: 1,
            ..config_for(&server, Some("secret"))
        };
        let client = PagerDutyClient::new(&config).unwrap();
        let services = client.fetch_services().await.unwrap();

        api_mock.assert_hits(1);
        assert_eq!(services.len(), 1);
    }

    #[tokio::test]
    async fn test_stops_when_upstream_has_no_more_pages() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).path("/services").query_param("offset", "0");
            then.status(200).json_body(page(&["A"], true));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/services").query_param("offset", "1");
            then.status(200).json_body(page(&["B"], false));
        });

        let client = PagerDutyClient::new(&config_for(&server, Some("secret"))).unwrap();
        let services = client.fetch_services().await.unwrap();

        first.assert();
        second.assert();
        assert_eq!(services.len(), 2);
    }

    #[tokio::test]
    async fn test_error_payload_messages_are_joined() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/services");
            then.status(401).json_body(json!({ "errors": ["a", "b"] }));
        });

        let client = PagerDutyClient::new(&config_for(&server, Some("bad"))).unwrap();
        let error = client.fetch_services().await.unwrap_err();

        api_mock.assert();
        assert!(matches!(error, PluginError::Upstream { status: 401, .. }));
        assert!(error.to_string().contains("a b"));
        assert_eq!(error.to_string(), "Request failed with 401, a b");
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/services");
            then.status(200).json_body(page(&[], false));
        });

        let client = PagerDutyClient::new(&config_for(&server, None)).unwrap();
        let error = client.fetch_services().await.unwrap_err();

        assert!(matches!(error, PluginError::MissingToken));
        api_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_wrapped() {
        let config = PagerDutyConfig {
            api_token: Some("secret".to_string()),
            api_url: "http://127.0.0.1:1".to_string(),
            ..PagerDutyConfig::default()
        };
        let client = PagerDutyClient::new(&config).unwrap();

        let error = client.fetch_services().await.unwrap_err();
        assert!(matches!(error, PluginError::Transport(_)));
    }

    #[test]
    fn test_error_messages_fallbacks() {
        assert_eq!(
            error_messages(r#"{"error":{"message":"Invalid Input","errors":["Offset too large"]}}"#),
            "Offset too large"
        );
        assert_eq!(
            error_messages(r#"{"error":{"message":"Unauthorized","code":2006}}"#),
            "Unauthorized"
        );
        assert_eq!(error_messages("Bad Gateway\n"), "Bad Gateway");
    }
}
