//! End-to-end tests of the answering loop against a mocked chat-completions
//! API and an in-memory history retriever.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::Mutex;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webmemory::agent::{HistoryAgent, LoopConfig, OpenAiClient};
use webmemory::config::ProviderConfig;
use webmemory::history::{HistoryRecord, HistoryRetriever};
use webmemory::tools::testing::StaticRetriever;
use webmemory::tools::history_registry;
use webmemory::{Error, Result};

const SYSTEM_PROMPT: &str = "You answer questions about browsing history.";

fn provider_config(base_url: String) -> ProviderConfig {
    ProviderConfig {
        api_key: SecretString::from("test-key"),
        model: "gpt-4o".to_string(),
        base_url,
        timeout_secs: 5,
        max_retries: 3,
    }
}

fn agent_over(server: &MockServer, retriever: Arc<dyn HistoryRetriever>, config: LoopConfig) -> HistoryAgent {
    let client = OpenAiClient::new(provider_config(server.uri())).unwrap();
    HistoryAgent::new(client, history_registry(retriever), SYSTEM_PROMPT, config)
}

fn final_answer_body(answer: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-final",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": json!({ "answer": answer }).to_string()
            },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

fn tool_call_body(call_id: &str, tool: &str, arguments: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-tool",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": call_id,
                    "type": "function",
                    "function": { "name": tool, "arguments": arguments }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

fn sample_records() -> Vec<HistoryRecord> {
    vec![
        HistoryRecord::new("Comparing niacinamide serums")
            .with_title("Serum")
            .with_source("https://a.com/p")
            .with_date("2024-05-15"),
        HistoryRecord::new("Air purifier filter replacement schedule")
            .with_title("Filter")
            .with_source("https://b.com/p")
            .with_date("2024-11-20"),
    ]
}

/// A retriever that records the queries it receives
struct RecordingRetriever {
    records: Vec<HistoryRecord>,
    queries: Mutex<Vec<String>>,
}

impl RecordingRetriever {
    fn new(records: Vec<HistoryRecord>) -> Self {
        Self {
            records,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HistoryRetriever for RecordingRetriever {
    async fn query(&self, text: &str) -> Result<Vec<HistoryRecord>> {
        self.queries.lock().await.push(text.to_string());
        Ok(self.records.clone())
    }
}

#[tokio::test]
async fn no_tool_call_terminates_after_one_model_invocation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_answer_body(
            "You mostly searched for skincare products.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent_over(&server, Arc::new(StaticRetriever::empty()), LoopConfig::standard());

    let answer = agent.ask("What did I search for?", "t1").await.unwrap();
    assert_eq!(answer.answer, "You mostly searched for skincare products.");
}

#[tokio::test]
async fn tool_call_passes_exact_argument_and_feeds_result_back() {
    let server = MockServer::start().await;

    // First turn: the model asks for a history search.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body(
            "call_1",
            "search_history",
            r#"{"query": "job search"}"#,
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Second turn only matches if the tool result (formatted context tagged
    // with the call id) made it into the request body.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("call_1"))
        .and(body_string_contains("RETRIEVED DOCUMENTS"))
        .and(body_string_contains("DOCUMENT 1 (DATE: 2024-05-15)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_answer_body(
            "Your job searches were in spring.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = Arc::new(RecordingRetriever::new(sample_records()));
    let agent = agent_over(&server, retriever.clone(), LoopConfig::standard());

    let answer = agent.ask("Tell me about my job search", "t1").await.unwrap();
    assert_eq!(answer.answer, "Your job searches were in spring.");

    let queries = retriever.queries.lock().await;
    assert_eq!(queries.as_slice(), ["job search"]);
}

#[tokio::test]
async fn unknown_tool_is_surfaced_and_loop_continues() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body(
            "call_7",
            "fetch_weather",
            r#"{"city": "Berlin"}"#,
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Unknown tool: fetch_weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_answer_body(
            "I could not look that up.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent_over(&server, Arc::new(StaticRetriever::empty()), LoopConfig::standard());

    let answer = agent.ask("What's the weather?", "t1").await.unwrap();
    assert_eq!(answer.answer, "I could not look that up.");
}

#[tokio::test]
async fn step_ceiling_produces_fallback_answer() {
    let server = MockServer::start().await;

    // The model never stops asking for tools.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body(
            "call_loop",
            "search_history",
            r#"{"query": "again"}"#,
        )))
        .mount(&server)
        .await;

    let mut config = LoopConfig::standard();
    config.max_steps = 3;
    config.max_tool_calls = 10;
    config.fallback_answer = "Giving up.".to_string();

    let agent = agent_over(&server, Arc::new(StaticRetriever::empty()), config);

    let answer = agent.ask("Loop forever", "t1").await.unwrap();
    assert_eq!(answer.answer, "Giving up.");
}

#[tokio::test]
async fn invalid_final_payload_is_schema_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-bad",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "{\"summary\": \"wrong shape\"}" },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let agent = agent_over(&server, Arc::new(StaticRetriever::empty()), LoopConfig::standard());

    let err = agent.ask("Anything", "t1").await.unwrap_err();
    assert!(matches!(err, Error::SchemaViolation(_)));
}

#[tokio::test]
async fn transient_provider_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_answer_body("Recovered.")))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent_over(&server, Arc::new(StaticRetriever::empty()), LoopConfig::standard());

    let answer = agent.ask("Anything", "t1").await.unwrap();
    assert_eq!(answer.answer, "Recovered.");
}

#[tokio::test]
async fn threads_accumulate_across_turns() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_answer_body("First answer.")))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // The second turn must carry the first question and answer.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("first question"))
        .and(body_string_contains("First answer."))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_answer_body("Second answer.")))
        .expect(1)
        .mount(&server)
        .await;

    let agent = agent_over(&server, Arc::new(StaticRetriever::empty()), LoopConfig::standard());

    agent.ask("first question", "session").await.unwrap();
    let answer = agent.ask("second question", "session").await.unwrap();
    assert_eq!(answer.answer, "Second answer.");

    let handle = agent.threads().get("session").await.unwrap();
    let thread = handle.lock().await;
    // user + assistant, twice
    assert_eq!(thread.len(), 4);
}

#[tokio::test]
async fn only_first_of_simultaneous_tool_calls_is_serviced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-multi",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {
                            "id": "call_a",
                            "type": "function",
                            "function": { "name": "search_history", "arguments": "{\"query\": \"one\"}" }
                        },
                        {
                            "id": "call_b",
                            "type": "function",
                            "function": { "name": "search_history", "arguments": "{\"query\": \"two\"}" }
                        }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("call_a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_answer_body("Done.")))
        .expect(1)
        .mount(&server)
        .await;

    let retriever = Arc::new(RecordingRetriever::new(sample_records()));
    let agent = agent_over(&server, retriever.clone(), LoopConfig::standard());

    agent.ask("Multi", "t1").await.unwrap();

    let queries = retriever.queries.lock().await;
    assert_eq!(queries.as_slice(), ["one"]);

    // The dropped second call must not linger in the transcript.
    let handle = agent.threads().get("t1").await.unwrap();
    let thread = handle.lock().await;
    let serialized = serde_json::to_string(thread.messages()).unwrap();
    assert!(!serialized.contains("call_b"));
}
