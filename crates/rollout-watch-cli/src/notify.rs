//! Telegram notifications.
//!
//! Sending is best-effort. Missing credentials and delivery failures are
//! logged and reported back as an outcome, never as an error, so saved state
//! keeps up with the page even when the bot is down.

use serde::Serialize;

use crate::config::Credentials;

/// Telegram parse mode for message text.
const PARSE_MODE: &str = "Markdown";

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// Delivered (the endpoint answered 2xx).
    Sent,
    /// Not attempted: no message for this run, or dry run.
    NotNeeded,
    /// Not attempted because the bot token or chat id is missing.
    Skipped,
    /// Attempted and failed.
    Failed(String),
}

/// Posts messages to the Telegram Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    credentials: Option<Credentials>,
}

impl TelegramNotifier {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            credentials,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send `text` to the configured chat.
    pub async fn send(&self, text: &str) -> NotifyOutcome {
        let Some(creds) = &self.credentials else {
            tracing::error!("missing Telegram bot token or chat id, notification not sent");
            return NotifyOutcome::Skipped;
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, creds.bot_token);
        let form = [
            ("chat_id", creds.chat_id.as_str()),
            ("text", text),
            ("parse_mode", PARSE_MODE),
        ];

        match self.client.post(&url).form(&form[..]).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(chat_id = %creds.chat_id, "notification sent");
                NotifyOutcome::Sent
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(status, body = %body, "Telegram rejected notification");
                NotifyOutcome::Failed(format!("HTTP {status}"))
            }
            Err(e) => {
                // reqwest errors carry the URL, which embeds the token.
                let e = e.without_url();
                tracing::warn!(error = %e, "failed to send notification");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> reqwest::Client {
        crate::fetch::build_client(Duration::from_secs(5)).unwrap()
    }

    fn creds() -> Option<Credentials> {
        Some(Credentials {
            bot_token: "123:abc".to_string(),
            chat_id: "-1001".to_string(),
        })
    }

    #[tokio::test]
    async fn test_send_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_string_contains("chat_id=-1001"))
            .and(body_string_contains("parse_mode=Markdown"))
            .and(body_string_contains("2025.44.2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(client(), server.uri(), creds());
        let outcome = notifier.send("New build `2025.44.2`").await;
        assert_eq!(outcome, NotifyOutcome::Sent);
    }

    #[tokio::test]
    async fn test_send_without_credentials_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(client(), server.uri(), None);
        assert!(!notifier.is_configured());
        assert_eq!(notifier.send("hello").await, NotifyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_send_rejected_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"ok":false}"#))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(client(), server.uri(), creds());
        assert_eq!(
            notifier.send("hello").await,
            NotifyOutcome::Failed("HTTP 400".to_string())
        );
    }

    #[tokio::test]
    async fn test_send_unreachable_is_failed() {
        // Nothing listens on port 9 on loopback in test environments.
        let notifier = TelegramNotifier::new(client(), "http://127.0.0.1:9", creds());
        let outcome = notifier.send("hello").await;
        match outcome {
            NotifyOutcome::Failed(msg) => assert!(!msg.contains("123:abc")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
