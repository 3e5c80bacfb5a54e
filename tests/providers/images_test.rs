//! Image backend request building and response decoding.

use base64::Engine;
use postcraft::providers::images::{build_request, parse_response};
use postcraft::providers::{ImageData, ImageRequest, ImageSize};

#[test]
fn request_asks_for_one_base64_image() {
    let request = ImageRequest {
        prompt: "tea by a window".to_owned(),
        size: ImageSize::Portrait,
    };
    let built = build_request("dall-e-3", "hd", &request);
    let json = serde_json::to_value(&built).expect("request serializes");

    assert_eq!(json["model"], "dall-e-3");
    assert_eq!(json["n"], 1);
    assert_eq!(json["size"], "1024x1792");
    assert_eq!(json["quality"], "hd");
    assert_eq!(json["response_format"], "b64_json");
}

#[test]
fn base64_payload_is_decoded() {
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG");
    let body = format!(r#"{{"data": [{{"b64_json": "{encoded}"}}]}}"#);
    let image = parse_response(&body).expect("valid body parses");
    assert_eq!(image, ImageData::Bytes(b"\x89PNG".to_vec()));
}

#[test]
fn url_payload_is_accepted() {
    let body = r#"{"data": [{"url": "https://images.example.com/a.png"}]}"#;
    let image = parse_response(body).expect("valid body parses");
    let ImageData::Url(url) = image else {
        panic!("expected a url");
    };
    assert_eq!(url.host_str(), Some("images.example.com"));
}

#[test]
fn empty_or_invalid_payloads_fail() {
    assert!(parse_response(r#"{"data": []}"#).is_err());
    assert!(parse_response(r#"{"data": [{}]}"#).is_err());
    assert!(parse_response(r#"{"data": [{"b64_json": "***"}]}"#).is_err());
    assert!(parse_response(r#"{"data": [{"url": "not a url"}]}"#).is_err());
}
