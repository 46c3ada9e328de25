use httpmock::prelude::*;
use providers::gemini::{GeminiConfig, GeminiProvider};
use providers::huggingface::{HuggingFaceConfig, HuggingFaceProvider};
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::{ProviderError, ProviderKind, TagProvider};
use serde_json::json;

fn vocab(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn hf(server: &MockServer, key: Option<&str>, model: &str) -> HuggingFaceProvider {
    HuggingFaceProvider::new(HuggingFaceConfig {
        api_key: key.map(str::to_string),
        base_url: server.base_url(),
        classification_model: model.to_string(),
        ..HuggingFaceConfig::default()
    })
}

fn openai(server: &MockServer, key: Option<&str>) -> OpenAiProvider {
    OpenAiProvider::new(OpenAiConfig {
        api_key: key.map(str::to_string),
        base_url: server.base_url(),
        chat_model: "gpt-4o-mini".to_string(),
    })
}

fn gemini(server: &MockServer, key: Option<&str>) -> GeminiProvider {
    GeminiProvider::new(GeminiConfig {
        api_key: key.map(str::to_string),
        base_url: server.base_url(),
        model: "gemini-1.5-flash".to_string(),
    })
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({ "candidates": [ { "content": { "parts": [ { "text": text } ], "role": "model" } } ] })
}

#[tokio::test]
async fn missing_key_reports_without_network() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.path_contains("/");
            then.status(200).json_body(json!({}));
        })
        .await;

    let providers: Vec<Box<dyn TagProvider>> = vec![
        Box::new(hf(&server, None, "facebook/bart-large-mnli")),
        Box::new(openai(&server, None)),
        Box::new(gemini(&server, None)),
    ];
    for provider in &providers {
        let status = provider.test_connection().await;
        assert!(!status.connected);
        assert!(!status.api_key_configured);
        assert_eq!(status.provider, provider.kind());
        assert!(status.error.is_some());

        let err = provider
            .suggest_tags("call the dentist", &vocab(&["health"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(provider.generate_text("hello", 10).await.is_err());
    }

    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn openai_connection_ok() {
    let server = MockServer::start_async().await;
    let models = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/models")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(json!({ "object": "list", "data": [] }));
        })
        .await;

    let status = openai(&server, Some("sk-test")).test_connection().await;
    assert!(status.connected);
    assert!(status.api_key_configured);
    assert_eq!(status.provider, ProviderKind::OpenAi);
    assert_eq!(status.error, None);
    models.assert_async().await;
}

#[tokio::test]
async fn gemini_connection_failure_is_captured() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1beta/models/gemini-1.5-flash")
                .header("x-goog-api-key", "bad-key");
            then.status(400).json_body(json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            }));
        })
        .await;

    let status = gemini(&server, Some("bad-key")).test_connection().await;
    assert!(!status.connected);
    assert!(status.api_key_configured);
    let error = status.error.unwrap();
    assert!(error.contains("API key not valid"), "{error}");
}

#[tokio::test]
async fn openai_suggests_vocabulary_tags() {
    let server = MockServer::start_async().await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("groceries");
            then.status(200).json_body(chat_reply(
                "[{\"tag\": \"Italian\", \"score\": 0.9}, {\"tag\": \"cooking\", \"score\": 0.7}, {\"tag\": \"pizza\", \"score\": 0.9}, {\"tag\": \"travel\", \"score\": 0.02}]",
            ));
        })
        .await;

    let v = vocab(&["groceries", "cooking", "italian", "travel"]);
    let tags = openai(&server, Some("sk-test"))
        .suggest_tags("I need to buy tomatoes and cheese for making Italian pasta tonight", &v)
        .await
        .unwrap();
    assert_eq!(tags, vec!["italian", "cooking"]);
    chat.assert_async().await;
}

#[tokio::test]
async fn openai_unparseable_tags_degrade_to_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(chat_reply("I think cooking fits best."));
        })
        .await;

    let tags = openai(&server, Some("sk-test"))
        .suggest_tags("pasta night", &vocab(&["cooking"]))
        .await
        .unwrap();
    assert!(tags.is_empty());
}

#[tokio::test]
async fn openai_generation_error_propagates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("upstream exploded");
        })
        .await;

    let err = openai(&server, Some("sk-test"))
        .generate_text("write a haiku", 50)
        .await
        .unwrap_err();
    match err {
        ProviderError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn gemini_parses_note_items() {
    let server = MockServer::start_async().await;
    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .header("x-goog-api-key", "g-key");
            then.status(200).json_body(gemini_reply(
                "```json\n[\"Buy milk\", \"Call dentist tomorrow\", \"Finish report by Friday\"]\n```",
            ));
        })
        .await;

    let items = gemini(&server, Some("g-key"))
        .parse_note("Buy milk. Call dentist tomorrow. Finish report by Friday.")
        .await
        .unwrap();
    assert_eq!(
        items,
        vec!["Buy milk", "Call dentist tomorrow", "Finish report by Friday"]
    );
    generate.assert_async().await;
}

#[tokio::test]
async fn gemini_unparseable_items_keep_note_whole() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent");
            then.status(200).json_body(gemini_reply("Here are your items: milk, dentist"));
        })
        .await;

    let items = gemini(&server, Some("g-key"))
        .parse_note("  Buy milk and call the dentist  ")
        .await
        .unwrap();
    assert_eq!(items, vec!["Buy milk and call the dentist"]);
}

#[tokio::test]
async fn gemini_generates_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash:generateContent")
                .body_contains("\"maxOutputTokens\":64");
            then.status(200).json_body(gemini_reply("  A short summary.  "));
        })
        .await;

    let text = gemini(&server, Some("g-key"))
        .generate_text("summarize", 64)
        .await
        .unwrap();
    assert_eq!(text, "A short summary.");
}

#[tokio::test]
async fn huggingface_zero_shot_scores() {
    let server = MockServer::start_async().await;
    let classify = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/facebook/bart-large-mnli")
                .header("authorization", "Bearer hf-test")
                .body_contains("candidate_labels");
            then.status(200).json_body(json!({
                "sequence": "I need to buy tomatoes",
                "labels": ["groceries", "cooking", "italian", "travel"],
                "scores": [0.62, 0.21, 0.12, 0.05]
            }));
        })
        .await;

    let v = vocab(&["groceries", "cooking", "italian", "travel"]);
    let tags = hf(&server, Some("hf-test"), "facebook/bart-large-mnli")
        .suggest_tags("I need to buy tomatoes", &v)
        .await
        .unwrap();
    assert_eq!(tags, vec!["groceries", "cooking", "italian"]);
    classify.assert_async().await;
}

#[tokio::test]
async fn huggingface_keyword_scoring_stays_local() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.path_contains("/");
            then.status(200).json_body(json!([]));
        })
        .await;

    let v = vocab(&["groceries", "cooking", "italian", "travel"]);
    let tags = hf(
        &server,
        Some("hf-test"),
        "sentence-transformers/all-MiniLM-L6-v2",
    )
    .suggest_tags(
        "I need to buy tomatoes and cheese for making Italian pasta tonight",
        &v,
    )
    .await
    .unwrap();
    assert!(!tags.is_empty() && tags.len() <= 3);
    assert!(!tags.contains(&"travel".to_string()));
    any.assert_hits_async(0).await;
}

#[tokio::test]
async fn huggingface_extracts_entities() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/dslim/bert-base-NER");
            then.status(200).json_body(json!([
                { "entity_group": "PER", "word": "Alice", "score": 0.99, "start": 5, "end": 10 },
                { "entity_group": "LOC", "word": "Paris", "score": 0.97, "start": 14, "end": 19 },
                { "entity_group": "PER", "word": "alice", "score": 0.91, "start": 30, "end": 35 },
                { "entity_group": "MISC", "word": "Fri", "score": 0.21, "start": 40, "end": 43 }
            ]));
        })
        .await;

    let entities = hf(&server, Some("hf-test"), "sentence-transformers/all-MiniLM-L6-v2")
        .extract_entities("Meet Alice in Paris, then call alice on Fri")
        .await
        .unwrap();
    let words: Vec<&str> = entities.iter().map(|e| e.word.as_str()).collect();
    assert_eq!(words, vec!["Alice", "Paris"]);
    assert_eq!(entities[0].group, "PER");
}

#[tokio::test]
async fn huggingface_generation_failure_propagates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/gpt2");
            then.status(503)
                .json_body(json!({ "error": "Model gpt2 is currently loading" }));
        })
        .await;

    let err = hf(&server, Some("hf-test"), "sentence-transformers/all-MiniLM-L6-v2")
        .generate_text("Once upon a time", 20)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("currently loading"), "{err}");
}

#[tokio::test]
async fn huggingface_zero_shot_accepts_label_rows() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/facebook/bart-large-mnli");
            then.status(200).json_body(json!([
                { "label": "travel", "score": 0.08 },
                { "label": "cooking", "score": 0.55 },
                { "label": "groceries", "score": 0.31 }
            ]));
        })
        .await;

    let v = vocab(&["groceries", "cooking", "travel"]);
    let tags = hf(&server, Some("hf-test"), "facebook/bart-large-mnli")
        .suggest_tags("Pasta dinner, need tomatoes", &v)
        .await
        .unwrap();
    assert_eq!(tags, vec!["cooking", "groceries"]);
}

#[tokio::test]
async fn huggingface_zero_shot_accepts_batched_columns() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/facebook/bart-large-mnli");
            then.status(200).json_body(json!([
                { "labels": ["work", "health"], "scores": [0.9, 0.04] }
            ]));
        })
        .await;

    let tags = hf(&server, Some("hf-test"), "facebook/bart-large-mnli")
        .suggest_tags("Quarterly report due", &vocab(&["work", "health"]))
        .await
        .unwrap();
    assert_eq!(tags, vec!["work"]);
}

#[tokio::test]
async fn huggingface_malformed_zero_shot_output_degrades_to_empty() {
    let server = MockServer::start_async().await;
    let classify = server
        .mock_async(|when, then| {
            when.method(POST).path("/models/facebook/bart-large-mnli");
            then.status(200).json_body(json!({ "unexpected": true }));
        })
        .await;

    let tags = hf(&server, Some("hf-test"), "facebook/bart-large-mnli")
        .suggest_tags("Quarterly report due", &vocab(&["work", "health"]))
        .await
        .unwrap();
    assert!(tags.is_empty());
    classify.assert_async().await;
}

#[tokio::test]
async fn huggingface_connection_uses_sentence_similarity_body() {
    let server = MockServer::start_async().await;
    let ping = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/sentence-transformers/all-MiniLM-L6-v2")
                .header("authorization", "Bearer hf-test")
                .json_body(json!({
                    "inputs": {
                        "source_sentence": "connection test",
                        "sentences": ["connection test"]
                    }
                }));
            then.status(200).json_body(json!([1.0]));
        })
        .await;

    let status = hf(&server, Some("hf-test"), "sentence-transformers/all-MiniLM-L6-v2")
        .test_connection()
        .await;
    assert!(status.connected, "{:?}", status.error);
    assert!(status.api_key_configured);
    assert_eq!(status.provider, ProviderKind::HuggingFace);
    ping.assert_async().await;
}

#[tokio::test]
async fn huggingface_connection_sends_candidate_labels_to_nli_models() {
    let server = MockServer::start_async().await;
    let ping = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/facebook/bart-large-mnli")
                .json_body(json!({
                    "inputs": "connection test",
                    "parameters": { "candidate_labels": ["connection test"] }
                }));
            then.status(200).json_body(json!({
                "sequence": "connection test",
                "labels": ["connection test"],
                "scores": [0.99]
            }));
        })
        .await;

    let status = hf(&server, Some("hf-test"), "facebook/bart-large-mnli")
        .test_connection()
        .await;
    assert!(status.connected, "{:?}", status.error);
    ping.assert_async().await;
}

#[tokio::test]
async fn huggingface_rejected_token_reports_disconnected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(401).json_body(json!({ "error": "Invalid credentials in Authorization header" }));
        })
        .await;

    let status = hf(&server, Some("hf-bad"), "sentence-transformers/all-MiniLM-L6-v2")
        .test_connection()
        .await;
    assert!(!status.connected);
    assert!(status.api_key_configured);
    assert!(status.error.unwrap().contains("Invalid credentials"));
}
