//! Shared test helpers for driving CardDownloader against a mock Scryfall.

use crate::config::{Config, RetryConfig};
use crate::downloader::CardDownloader;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing at `server`, writing under `output`, with fast retries
pub(crate) fn test_config(server: &MockServer, output: &Path) -> Config {
    let mut config = Config::default();
    config.output_dir = output.to_path_buf();
    config.api.base_url = server.uri();
    config.api.search_interval = Duration::ZERO;
    config.retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config.download.max_concurrent_downloads = 2;
    config
}

pub(crate) fn create_test_downloader(server: &MockServer, output: &Path) -> CardDownloader {
    CardDownloader::new(test_config(server, output)).unwrap()
}

/// A single-image card whose art is served at `<server>/img/<set>-<number>.jpg`
pub(crate) fn single_card(
    server: &MockServer,
    name: &str,
    set: &str,
    set_name: &str,
    number: &str,
) -> serde_json::Value {
    serde_json::json!({
        "object": "card",
        "name": name,
        "set": set,
        "set_name": set_name,
        "collector_number": number,
        "lang": "en",
        "layout": "normal",
        "type_line": "Creature",
        "image_uris": { "large": format!("{}/img/{set}-{number}.jpg", server.uri()) }
    })
}

/// Mount `/sets/<code>` (200), `/bulk-data` and a feed body for `cards`
pub(crate) async fn mount_set(server: &MockServer, code: &str, cards: &[serde_json::Value]) {
    mount_set_with_feed(server, code, ResponseTemplate::new(200).set_body_json(cards)).await;
}

pub(crate) async fn mount_set_with_feed(server: &MockServer, code: &str, feed: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/sets/{code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "code": code })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bulk-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [
                { "type": "default_cards", "download_uri": format!("{}/files/default.json", server.uri()) },
                { "type": "all_cards", "download_uri": format!("{}/files/all.json", server.uri()) }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/all.json"))
        .respond_with(feed)
        .mount(server)
        .await;
}

/// Serve a small JPEG-looking body at `remote`
pub(crate) async fn mount_image(server: &MockServer, remote: &str) {
    Mock::given(method("GET"))
        .and(path(remote))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xff\xd8jpeg\xff\xd9".to_vec()))
        .mount(server)
        .await;
}

/// Like [`mount_image`], but each response takes `delay` and exactly `times` are expected
pub(crate) async fn mount_slow_image(
    server: &MockServer,
    remote: &str,
    delay: Duration,
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path(remote))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"\xff\xd8jpeg\xff\xd9".to_vec())
                .set_delay(delay),
        )
        .expect(times)
        .mount(server)
        .await;
}
