//! OpenAI chat completions request building and response parsing.

use postcraft::providers::openai::{build_request, parse_response};
use postcraft::providers::{CompletionRequest, StopReason};

#[test]
fn system_prompt_becomes_first_message() {
    let request = CompletionRequest {
        system: Some("layers".to_owned()),
        prompt: "Write a post for Rednote about: tea".to_owned(),
        max_tokens: Some(8000),
    };
    let built = build_request("gpt-4o", &request);
    let json = serde_json::to_value(&built).expect("request serializes");

    assert_eq!(json["model"], "gpt-4o");
    assert_eq!(json["max_tokens"], 8000);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][0]["content"], "layers");
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(json["messages"][1]["content"], "Write a post for Rednote about: tea");
}

#[test]
fn no_system_prompt_means_no_system_message() {
    let request = CompletionRequest {
        system: None,
        prompt: "hi".to_owned(),
        max_tokens: None,
    };
    let built = build_request("gpt-4o", &request);
    assert_eq!(built.messages.len(), 1);
    assert_eq!(built.messages[0].role, "user");
    assert_eq!(built.max_tokens, 4096);
}

#[test]
fn first_choice_is_used() {
    let body = r#"{
        "choices": [
            {"message": {"content": "first"}, "finish_reason": "length"},
            {"message": {"content": "second"}, "finish_reason": "stop"}
        ],
        "model": "gpt-4o-2024",
        "usage": {"prompt_tokens": 5, "completion_tokens": 7}
    }"#;
    let response = parse_response(body).expect("valid body parses");

    assert_eq!(response.text, "first");
    assert_eq!(response.stop_reason, StopReason::MaxTokens);
    assert_eq!(response.usage.output_tokens, 7);
}

#[test]
fn empty_choices_is_a_parse_error() {
    let body = r#"{"choices": [], "model": "gpt-4o"}"#;
    let err = parse_response(body).expect_err("no choices should fail");
    assert!(err.to_string().contains("missing choices[0]"));
}

#[test]
fn missing_usage_counts_as_zero() {
    let body = r#"{"choices": [{"message": {"content": null}, "finish_reason": null}], "model": "m"}"#;
    let response = parse_response(body).expect("valid body parses");
    assert_eq!(response.text, "");
    assert_eq!(response.usage.input_tokens, 0);
    assert_eq!(response.stop_reason, StopReason::EndTurn);
}
