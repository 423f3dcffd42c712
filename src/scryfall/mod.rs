//! Scryfall API client
//!
//! - [`bulk`] - bulk-data index and the streaming card feed
//! - [`search`] - card-list parsing and `/cards/search` queries

pub mod bulk;
pub mod search;

use crate::config::{ApiConfig, Config, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::{is_transient_status, with_retry};
use crate::types::CardRecord;
use crate::utils::http_status_error;
use bulk::{ALL_CARDS, BulkEntry, BulkIndex, CardStream, RecordFilter};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use search::{CardQuery, SearchPage};
use std::time::Duration;
use url::Url;

/// Build the HTTP client shared by API calls and image fetches
///
/// No overall timeout is set on the client itself: the bulk feed is a
/// multi-gigabyte stream. Bounded requests set [`ApiConfig::timeout`] per call.
pub fn build_http_client(api: &ApiConfig) -> Result<reqwest::Client> {
    if !api.verify_tls {
        tracing::warn!("TLS certificate verification is disabled");
    }
    reqwest::Client::builder()
        .user_agent(api.user_agent.as_str())
        .connect_timeout(api.connect_timeout)
        .danger_accept_invalid_certs(!api.verify_tls)
        .build()
        .map_err(Error::Network)
}

/// Client for the handful of Scryfall endpoints the pipeline needs (cloneable)
#[derive(Clone)]
pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryConfig,
    feed_buffer: usize,
}

impl ScryfallClient {
    /// Create a client from the run configuration, reusing `http`
    pub fn new(http: reqwest::Client, config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", config.api.base_url, e),
            key: Some("api.base_url".to_string()),
        })?;
        Ok(Self {
            http,
            base_url,
            timeout: config.api.timeout,
            retry: config.retry.clone(),
            feed_buffer: config.download.feed_buffer,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config {
                message: format!("base URL '{}' cannot carry a path", self.base_url),
                key: Some("api.base_url".to_string()),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn api_get(&self, url: Url) -> reqwest::RequestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        self.http.get(url).headers(headers).timeout(self.timeout)
    }

    /// GET with retries on transport errors and transient statuses
    ///
    /// Any other status is handed back to the caller untouched.
    async fn send_api(&self, url: &Url) -> Result<reqwest::Response> {
        with_retry(&self.retry, || async move {
            let response = self.api_get(url.clone()).send().await?;
            if is_transient_status(response.status().as_u16()) {
                return Err(http_status_error(response).await);
            }
            Ok(response)
        })
        .await
    }

    /// Whether `code` denotes a published set
    ///
    /// 200 means yes and 404 means no. Any other answer is an error rather
    /// than a silent "no", so an outage is not reported as an unknown set.
    pub async fn set_exists(&self, code: &str) -> Result<bool> {
        let url = self.endpoint(&["sets", code])?;
        let response = self.send_api(&url).await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(http_status_error(response).await),
        }
    }

    /// Look up a feed in the bulk-data index by its `type`
    pub async fn bulk_feed(&self, kind: &str) -> Result<BulkEntry> {
        let url = self.endpoint(&["bulk-data"])?;
        let response = self.send_api(&url).await?;
        if !response.status().is_success() {
            return Err(http_status_error(response).await);
        }
        let index: BulkIndex = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("unreadable bulk-data index: {e}")))?;
        index.find(kind)
    }

    /// Open the all-cards feed, keeping only records that pass `filter`
    ///
    /// The set is checked first; an unknown set fails with
    /// [`Error::SetNotFound`] before the feed is requested.
    pub async fn open_set_feed(&self, filter: RecordFilter) -> Result<CardStream> {
        let code = filter.set_code().to_string();
        if !self.set_exists(&code).await? {
            return Err(Error::SetNotFound(code));
        }

        let entry = self.bulk_feed(ALL_CARDS).await?;
        tracing::info!(
            uri = %entry.download_uri,
            size = entry.size,
            updated_at = entry.updated_at.as_deref(),
            "Opening bulk feed"
        );

        let feed_uri = entry.download_uri.as_str();
        let response = with_retry(&self.retry, || async move {
            let response = self.http.get(feed_uri).send().await?;
            if !response.status().is_success() {
                return Err(http_status_error(response).await);
            }
            Ok(response)
        })
        .await?;

        Ok(CardStream::spawn(response, filter, self.feed_buffer))
    }

    /// First card matching `query`, if any
    ///
    /// Zero results and non-success statuses both yield `Ok(None)`; the status
    /// and body are logged. Transport failures are returned as errors.
    pub async fn search_one(&self, query: &CardQuery) -> Result<Option<CardRecord>> {
        let q = query.to_query_string();
        let mut url = self.endpoint(&["cards", "search"])?;
        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("format", "json");

        let response = match self.send_api(&url).await {
            Ok(response) => response,
            Err(Error::HttpStatus { status, body, .. }) => {
                tracing::warn!(query = %q, status, body = %body, "Search failed");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !response.status().is_success() {
            if let Error::HttpStatus { status, body, .. } = http_status_error(response).await {
                // Scryfall answers 404 when nothing matches
                tracing::warn!(query = %q, status, body = %body, "Search returned no match");
            }
            return Ok(None);
        }

        let page: SearchPage = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("unreadable search response: {e}")))?;
        match page.data.into_iter().next() {
            Some(first) => Ok(Some(serde_json::from_value(first)?)),
            None => {
                tracing::warn!(query = %q, "Search returned an empty result page");
                Ok(None)
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ScryfallClient {
        let mut config = Config::default();
        config.api.base_url = server.uri();
        config.retry = RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        let http = build_http_client(&config.api).unwrap();
        ScryfallClient::new(http, &config).unwrap()
    }

    fn frodo() -> serde_json::Value {
        serde_json::json!({
            "name": "Frodo",
            "set": "ltr",
            "set_name": "Lord of the Rings Tales of Middle-earth",
            "collector_number": "1",
            "lang": "en",
            "image_uris": { "large": "http://x/a.jpg" }
        })
    }

    #[tokio::test]
    async fn set_exists_maps_200_and_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sets/ltr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": "ltr"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sets/zzz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let client = client(&server);

        assert!(client.set_exists("ltr").await.unwrap());
        assert!(!client.set_exists("zzz").await.unwrap());
    }

    #[tokio::test]
    async fn set_lookup_outage_is_an_error_not_a_missing_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sets/ltr"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let result = client(&server).set_exists("ltr").await;

        assert!(
            matches!(result, Err(Error::HttpStatus { status: 503, .. })),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn bulk_feed_selected_by_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bulk-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "type": "all_cards", "download_uri": "http://x/all.json" },
                    { "type": "default_cards", "download_uri": "http://x/default.json" }
                ]
            })))
            .mount(&server)
            .await;

        let entry = client(&server).bulk_feed(ALL_CARDS).await.unwrap();
        assert_eq!(entry.download_uri, "http://x/all.json");
    }

    #[tokio::test]
    async fn unknown_set_never_touches_the_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sets/zzz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bulk-data"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client(&server)
            .open_set_feed(RecordFilter::new("zzz", "en"))
            .await;

        assert!(matches!(result, Err(Error::SetNotFound(code)) if code == "zzz"));
    }

    #[tokio::test]
    async fn open_set_feed_streams_matching_records() {
        let server = MockServer::start().await;
        let feed_uri = format!("{}/files/all-cards.json", server.uri());
        Mock::given(method("GET"))
            .and(path("/sets/ltr"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bulk-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "type": "all_cards", "download_uri": feed_uri }]
            })))
            .mount(&server)
            .await;
        let mut german = frodo();
        german["lang"] = "de".into();
        Mock::given(method("GET"))
            .and(path("/files/all-cards.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([frodo(), german])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut stream = client(&server)
            .open_set_feed(RecordFilter::new("ltr", "en"))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.name, "Frodo");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn search_sends_name_query_and_takes_first_result() {
        let server = MockServer::start().await;
        let mut second = frodo();
        second["name"] = "Other".into();
        Mock::given(method("GET"))
            .and(path("/cards/search"))
            .and(query_param("q", "name:\"Frodo\""))
            .and(query_param("format", "json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": [frodo(), second] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let card = client(&server)
            .search_one(&CardQuery::by_name("Frodo"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(card.name, "Frodo");
    }

    #[tokio::test]
    async fn search_with_printing_constrains_set_and_number() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/search"))
            .and(query_param("q", "name:\"Frodo\" set:ltr number:1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [frodo()] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let card = client(&server)
            .search_one(&CardQuery::printing("Frodo", "ltr", "1"))
            .await
            .unwrap();
        assert!(card.is_some());
    }

    #[tokio::test]
    async fn search_not_found_and_empty_page_are_misses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/search"))
            .and(query_param("q", "name:\"Black Lotus\""))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "object": "error", "code": "not_found", "status": 404
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cards/search"))
            .and(query_param("q", "name:\"Nothing\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
            .mount(&server)
            .await;
        let client = client(&server);

        assert!(client.search_one(&CardQuery::by_name("Black Lotus")).await.unwrap().is_none());
        assert!(client.search_one(&CardQuery::by_name("Nothing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_server_error_is_a_miss_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&server)
            .await;

        let result = client(&server)
            .search_one(&CardQuery::by_name("Frodo"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn endpoint_appends_segments_to_base_path() {
        let mut config = Config::default();
        config.api.base_url = "http://localhost:9000/api/".to_string();
        let client = ScryfallClient::new(reqwest::Client::new(), &config).unwrap();

        let url = client.endpoint(&["sets", "ltr"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/sets/ltr");
    }
}
