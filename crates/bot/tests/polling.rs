//! Polling loop tests against a mocked Bot API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use skycast_bot::{Runner, TelegramClient, handle_update};
use skycast_bot::commands::{HELP_TEXT, START_TEXT};
use skycast_common::Result;
use skycast_coordinator::{
    BotState, McpToolSession, ResponseFormatter, TelegramConfig, ToolServerConfig, WeatherBot,
};
use skycast_llm::{LlmClient, LlmRequest, LlmResponse};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "42:test";

struct EchoAgent;

#[async_trait]
impl LlmClient for EchoAgent {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        Ok(LlmResponse {
            content: format!("agent: {}", request.messages[0].content),
            model: "echo".into(),
            usage: None,
            finish_reason: None,
        })
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

/// A bot whose tool session was never started, so every text goes to the agent.
fn offline_bot() -> Arc<WeatherBot> {
    let session = Arc::new(McpToolSession::new(ToolServerConfig {
        command: "/nonexistent/skycast-weather-mcp".into(),
        ..Default::default()
    }));
    Arc::new(WeatherBot::new(
        session,
        ResponseFormatter::new(Arc::new(EchoAgent)),
    ))
}

fn telegram_for(server: &MockServer) -> Arc<TelegramClient> {
    Arc::new(
        TelegramClient::new(&TelegramConfig {
            bot_token: Some(TOKEN.into()),
            api_url: server.uri(),
            poll_timeout_secs: 0,
            request_timeout_ms: 2_000,
        })
        .unwrap(),
    )
}

fn update(update_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id * 10,
            "chat": {"id": 7, "type": "private"},
            "from": {"id": 1, "first_name": "Ana", "is_bot": false},
            "text": text
        }
    })
}

async fn mount_outbound(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"message_id": 1, "chat": {"id": 7, "type": "private"}}
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendChatAction")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
        .mount(server)
        .await;
}

async fn sent_texts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/sendMessage"))
        .map(|r| {
            let body: Value = r.body_json().unwrap();
            body["text"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

fn parse_update(value: Value) -> skycast_bot::Update {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn commands_get_fixed_replies() {
    let server = MockServer::start().await;
    mount_outbound(&server).await;
    let telegram = telegram_for(&server);
    let bot = offline_bot();

    handle_update(&bot, &telegram, parse_update(update(1, "/start"))).await;
    handle_update(&bot, &telegram, parse_update(update(2, "/help@skycast_bot"))).await;
    handle_update(&bot, &telegram, parse_update(update(3, "/unknown"))).await;

    assert_eq!(sent_texts(&server).await, vec![START_TEXT, HELP_TEXT]);
}

#[tokio::test]
async fn text_goes_through_the_bot_with_typing_indicator() {
    let server = MockServer::start().await;
    mount_outbound(&server).await;
    let telegram = telegram_for(&server);
    let bot = offline_bot();

    handle_update(&bot, &telegram, parse_update(update(1, "Hello there"))).await;

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(
        paths,
        vec![
            format!("/bot{TOKEN}/sendChatAction"),
            format!("/bot{TOKEN}/sendMessage")
        ]
    );
    assert_eq!(sent_texts(&server).await, vec!["agent: Hello there"]);
}

#[tokio::test]
async fn non_text_updates_are_ignored() {
    let server = MockServer::start().await;
    mount_outbound(&server).await;
    let telegram = telegram_for(&server);

    handle_update(
        &offline_bot(),
        &telegram,
        parse_update(json!({"update_id": 5, "edited_message": {}})),
    )
    .await;

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn runner_answers_polled_messages_and_shuts_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [update(100, "/start"), update(101, "tell me a joke")]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "result": []}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;
    mount_outbound(&server).await;

    let bot = offline_bot();
    let runner = Runner::new(telegram_for(&server), bot.clone(), Duration::from_secs(2));
    runner
        .run(tokio::time::sleep(Duration::from_millis(400)))
        .await;

    let mut texts = sent_texts(&server).await;
    texts.sort();
    assert_eq!(texts, vec![START_TEXT.to_string(), "agent: tell me a joke".to_string()]);
    assert_eq!(bot.state().await, BotState::Closed);

    // The second poll acknowledges both updates.
    let requests = server.received_requests().await.unwrap();
    let second_poll: Value = requests
        .iter()
        .filter(|r| r.url.path().ends_with("/getUpdates"))
        .nth(1)
        .unwrap()
        .body_json()
        .unwrap();
    assert_eq!(second_poll["offset"], json!(102));
}

#[tokio::test]
async fn finished_handlers_do_not_restart_the_long_poll() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [update(1, "hello"), update(2, "/help"), update(3, "/start")]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Held open well past the test so the second poll is still pending at shutdown.
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "result": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    mount_outbound(&server).await;

    let runner = Runner::new(telegram_for(&server), offline_bot(), Duration::from_secs(2));
    runner
        .run(tokio::time::sleep(Duration::from_millis(600)))
        .await;

    assert_eq!(sent_texts(&server).await.len(), 3);
    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/getUpdates"))
        .count();
    assert_eq!(polls, 2);
}
