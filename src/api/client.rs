use crate::api::models::Message;
use crate::app::AppConfig;
use crate::error::{InboxError, Result};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Read-only client for the webhook log endpoint.
pub struct ApiClient {
    pub http: HttpClient,
    pub endpoint: Url,
    pub messages_field: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint_url)?;
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            endpoint,
            messages_field: config.messages_field.clone(),
        })
    }

    /// Reach the endpoint once and report the HTTP status. Used by the setup
    /// window to tell the operator whether the URL answers at all.
    pub async fn ping(&self) -> Result<u16> {
        let resp = self.http.get(self.endpoint.clone()).send().await?;
        Ok(resp.status().as_u16())
    }

    /// Fetch the current message list from the webhook.
    pub async fn fetch_messages(&self) -> Result<Vec<Message>> {
        let resp = self.http.get(self.endpoint.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(InboxError::Status(resp.status().as_u16()));
        }
        let json: Value = resp
            .json()
            .await
            .map_err(|e| InboxError::Malformed(e.to_string()))?;
        parse_messages(json, &self.messages_field)
    }
}

/// Pull Message records out of a response body. The list is either the body
/// itself or sits under `field`. Records that don't look like a message are
/// dropped.
pub fn parse_messages(json: Value, field: &str) -> Result<Vec<Message>> {
    let items = match json {
        Value::Array(arr) => arr,
        Value::Object(mut obj) => match obj.remove(field) {
            Some(Value::Array(arr)) => arr,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(InboxError::Malformed(format!(
                    "`{field}` is not a list (got {})",
                    kind(&other)
                )));
            }
            None => {
                return Err(InboxError::Malformed(format!("no `{field}` field in response")));
            }
        },
        other => {
            return Err(InboxError::Malformed(format!(
                "expected an object or list, got {}",
                kind(&other)
            )));
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<Message>(item) {
            Ok(msg) if !msg.id.is_empty() => out.push(msg),
            Ok(_) => log::warn!("skipping message without id"),
            Err(e) => log::warn!("skipping malformed message record: {e}"),
        }
    }
    Ok(out)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Direction;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(url: String) -> AppConfig {
        AppConfig {
            endpoint_url: url,
            ..AppConfig::default()
        }
    }

    #[test]
    fn parses_messages_field() {
        let body = json!({
            "messages": [
                {"id": "1", "from": "6281", "text": "Halo", "timestamp": "2024-05-01T10:00:00Z", "direction": "incoming"},
                {"id": "2", "from": "6282", "text": "Hi", "timestamp": "2024-05-01T10:01:00Z"}
            ]
        });
        let msgs = parse_messages(body, "messages").unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].direction, Direction::Incoming);
    }

    #[test]
    fn parses_custom_field_and_bare_list() {
        let body = json!({"data": [{"id": "1", "from": "6281"}]});
        assert_eq!(parse_messages(body, "data").unwrap().len(), 1);

        let bare = json!([{"id": "1", "from": "6281"}]);
        assert_eq!(parse_messages(bare, "messages").unwrap().len(), 1);
    }

    #[test]
    fn skips_records_that_are_not_messages() {
        let body = json!({"messages": [
            {"id": "1", "from": "6281"},
            {"from": "6282"},
            {"id": "", "from": "6283"},
            42
        ]});
        let msgs = parse_messages(body, "messages").unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, "1");
    }

    #[test]
    fn rejects_unexpected_shapes() {
        assert!(matches!(
            parse_messages(json!({"messages": "nope"}), "messages"),
            Err(InboxError::Malformed(_))
        ));
        assert!(matches!(
            parse_messages(json!({"other": []}), "messages"),
            Err(InboxError::Malformed(_))
        ));
        assert!(matches!(parse_messages(json!("x"), "messages"), Err(InboxError::Malformed(_))));
    }

    #[tokio::test]
    async fn fetches_from_query_variant_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/webhook"))
            .and(query_param("logs", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"id": "wamid.1", "from": "6281234567890", "text": "Halo", "timestamp": "2024-05-01T10:00:00Z"}]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(format!("{}/api/webhook?logs=true", server.uri()))).unwrap();
        let msgs = client.fetch_messages().await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "Halo");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(format!("{}/messages", server.uri()))).unwrap();
        assert!(matches!(client.fetch_messages().await, Err(InboxError::Status(502))));
        assert_eq!(client.ping().await.unwrap(), 502);
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&config_for(format!("{}/messages", server.uri()))).unwrap();
        assert!(matches!(client.fetch_messages().await, Err(InboxError::Malformed(_))));
    }

    #[test]
    fn rejects_bad_endpoint_url() {
        assert!(matches!(ApiClient::new(&config_for("not a url".into())), Err(InboxError::Url(_))));
    }
}
