//! HTTP fetching with an ordered user-agent fallback chain.
//!
//! Some hosts answer bot user-agents with 403. Each fetch walks the
//! configured profiles in order and stops at the first response that is
//! OK or a non-403 failure; the last profile's response is final.

use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use azui_kb_shared::{BOT_USER_AGENT, CrawlConfig, KbError, Result};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Whether a response should trigger the next user-agent profile.
pub fn should_fall_back(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN
}

/// HTTP client plus the ordered request profiles.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    user_agents: Vec<String>,
}

impl Fetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(BOT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }

        let client = builder
            .build()
            .map_err(|e| KbError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
        })
    }

    /// GET `url`, retrying with the next user-agent only on 403.
    ///
    /// A transport error ends the chain immediately.
    pub async fn fetch(&self, url: &str) -> std::result::Result<Response, reqwest::Error> {
        let (last, fallbacks) = match self.user_agents.split_last() {
            Some((last, rest)) => (last.as_str(), rest),
            None => (BOT_USER_AGENT, &[][..]),
        };

        for user_agent in fallbacks {
            let response = self.send(url, user_agent).await?;
            if !should_fall_back(response.status()) {
                return Ok(response);
            }
            debug!(url, user_agent = %user_agent, "403 response, trying next user-agent");
        }

        self.send(url, last).await
    }

    async fn send(&self, url: &str, user_agent: &str) -> std::result::Result<Response, reqwest::Error> {
        self.client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_agents(agents: &[&str]) -> CrawlConfig {
        CrawlConfig {
            user_agents: agents.iter().map(|s| s.to_string()).collect(),
            ..CrawlConfig::default()
        }
    }

    #[test]
    fn only_403_falls_back() {
        assert!(should_fall_back(StatusCode::FORBIDDEN));
        assert!(!should_fall_back(StatusCode::OK));
        assert!(!should_fall_back(StatusCode::NOT_FOUND));
        assert!(!should_fall_back(StatusCode::TOO_MANY_REQUESTS));
        assert!(!should_fall_back(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn falls_back_until_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "bot/1"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "browser/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "browser/2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&config_with_agents(&["bot/1", "browser/1", "browser/2"])).unwrap();
        let response = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_403_failure_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&config_with_agents(&["bot/1", "browser/1"])).unwrap();
        let response = fetcher.fetch(&format!("{}/gone", server.uri())).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn exhausted_chain_returns_last_403() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&config_with_agents(&["bot/1", "browser/1"])).unwrap();
        let response = fetcher.fetch(&format!("{}/blocked", server.uri())).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
