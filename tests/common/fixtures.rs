//! Card records and mock endpoints shaped like the Scryfall API

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stand-in JPEG payload
pub const JPEG: &[u8] = b"\xff\xd8\xff\xe0scryfall-test-image\xff\xd9";

/// Image URL served by [`mount_image`] for `name`
pub fn image_url(server: &MockServer, name: &str) -> String {
    format!("{}/images/{name}.jpg", server.uri())
}

/// A normal single-faced card
pub fn single_faced(server: &MockServer, name: &str, set: &str, set_name: &str, number: &str) -> Value {
    json!({
        "object": "card",
        "name": name,
        "lang": "en",
        "set": set,
        "set_name": set_name,
        "collector_number": number,
        "layout": "normal",
        "type_line": "Legendary Creature - Halfling",
        "image_uris": {
            "small": "https://example.invalid/small.jpg",
            "large": image_url(server, &format!("{set}-{number}"))
        }
    })
}

/// A transform card whose faces carry their own art
pub fn double_faced(
    server: &MockServer,
    front: &str,
    back: &str,
    set: &str,
    set_name: &str,
    number: &str,
) -> Value {
    json!({
        "object": "card",
        "name": format!("{front} // {back}"),
        "lang": "en",
        "set": set,
        "set_name": set_name,
        "collector_number": number,
        "layout": "transform",
        "type_line": "Creature - Human // Creature - Horror",
        "card_faces": [
            { "object": "card_face", "name": front, "image_uris": { "large": image_url(server, &format!("{set}-{number}-front")) } },
            { "object": "card_face", "name": back, "image_uris": { "large": image_url(server, &format!("{set}-{number}-back")) } }
        ]
    })
}

/// Mount the set lookup, the bulk-data index and the all-cards feed
pub async fn mount_bulk_feed(server: &MockServer, set_code: &str, cards: &[Value]) {
    Mock::given(method("GET"))
        .and(path(format!("/sets/{set_code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "object": "set", "code": set_code })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bulk-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "type": "oracle_cards", "download_uri": format!("{}/bulk/oracle-cards.json", server.uri()) },
                { "type": "all_cards", "download_uri": format!("{}/bulk/all-cards.json", server.uri()), "size": 2_400_000_000u64 }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bulk/all-cards.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards))
        .mount(server)
        .await;
}

/// Serve [`JPEG`] at the URL [`image_url`] gives for `name`
pub async fn mount_image(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/images/{name}.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
        .mount(server)
        .await;
}

/// Answer the search query `q` with `cards`, or with Scryfall's 404 when empty
pub async fn mount_search(server: &MockServer, q: &str, cards: Vec<Value>) {
    let response = if cards.is_empty() {
        ResponseTemplate::new(404).set_body_json(json!({
            "object": "error",
            "code": "not_found",
            "status": 404,
            "details": "Your query didn't match any cards."
        }))
    } else {
        ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "total_cards": cards.len(),
            "data": cards
        }))
    };
    Mock::given(method("GET"))
        .and(path("/cards/search"))
        .and(query_param("q", q))
        .respond_with(response)
        .mount(server)
        .await;
}
