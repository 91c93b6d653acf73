//! Text generation interface

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::json::extract_json;
use crate::service::ProviderId;
use crate::types::text::{ChatMessage, ChatRole, ResponseFormat, TextRequest, TextResponse};

/// Text generation interface
///
/// Implementations wrap one concrete backend each; the service manager
/// hands out shared handles and the fallback orchestrator moves across
/// them on transient failure.
#[async_trait]
pub trait TextGeneration: Send + Sync + 'static {
    /// Generate text for a request
    async fn generate(&self, request: TextRequest) -> Result<TextResponse>;

    /// Generate structured output matching a JSON schema.
    ///
    /// The default wraps `generate` with a JSON response-format hint,
    /// extracts the outermost object and validates it against the
    /// schema. A parse or validation failure surfaces `SchemaMismatch`.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = TextRequest::new(prompt).with_response_format(ResponseFormat::Json);
        let response = self.generate(request).await?;

        let value = extract_json(&response.text)
            .ok_or_else(|| Error::SchemaMismatch("no JSON object in response".to_string()))?;

        let compiled = jsonschema::JSONSchema::compile(schema)
            .map_err(|e| Error::SchemaMismatch(format!("invalid schema: {e}")))?;
        if !compiled.is_valid(&value) {
            return Err(Error::SchemaMismatch(
                "response does not satisfy schema".to_string(),
            ));
        }
        Ok(value)
    }

    /// Chat-style generation over a message history.
    ///
    /// The default flattens the history into a single prompt with role
    /// prefixes; when several system messages are present the last one
    /// wins.
    async fn chat(&self, messages: &[ChatMessage], opts: TextRequest) -> Result<TextResponse> {
        let system = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .last()
            .map(|m| m.content.clone());

        let prompt = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| format!("{}: {}", m.role.prefix(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let mut request = opts;
        request.prompt = prompt;
        if request.system_prompt.is_none() {
            request.system_prompt = system;
        }
        self.generate(request).await
    }

    /// Advisory cost estimate in USD; never gates orchestration
    fn estimate_cost(&self, request: &TextRequest) -> f64;

    /// Provider identity propagated into every response
    fn provider_id(&self) -> ProviderId;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoText;

    #[async_trait]
    impl TextGeneration for EchoText {
        async fn generate(&self, request: TextRequest) -> Result<TextResponse> {
            // Echo the flattened prompt so chat() behavior is observable
            Ok(TextResponse {
                text: format!(
                    "[{}] {}",
                    request.system_prompt.unwrap_or_default(),
                    request.prompt
                ),
                ..TextResponse::text("", "echo")
            })
        }

        fn estimate_cost(&self, _request: &TextRequest) -> f64 {
            0.0
        }

        fn provider_id(&self) -> ProviderId {
            "echo".into()
        }

        fn model_name(&self) -> &str {
            "echo-1"
        }
    }

    struct JsonText(String);

    #[async_trait]
    impl TextGeneration for JsonText {
        async fn generate(&self, _request: TextRequest) -> Result<TextResponse> {
            Ok(TextResponse::text(self.0.clone(), "json"))
        }

        fn estimate_cost(&self, _request: &TextRequest) -> f64 {
            0.0
        }

        fn provider_id(&self) -> ProviderId {
            "json".into()
        }

        fn model_name(&self) -> &str {
            "json-1"
        }
    }

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "score": { "type": "number" } },
            "required": ["score"]
        })
    }

    #[tokio::test]
    async fn structured_accepts_valid_response() {
        let svc = JsonText(r#"```json
{"score": 0.9}
```"#.to_string());
        let value = svc.generate_structured("rate this", &schema()).await.unwrap();
        assert_eq!(value["score"], 0.9);
    }

    #[tokio::test]
    async fn structured_rejects_schema_violation() {
        let svc = JsonText(r#"{"score": "high"}"#.to_string());
        let err = svc.generate_structured("rate this", &schema()).await.unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn structured_rejects_non_json() {
        let svc = JsonText("I cannot answer that.".to_string());
        let err = svc.generate_structured("rate this", &schema()).await.unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn chat_flattens_with_last_system_winning() {
        let svc = EchoText;
        let messages = vec![
            ChatMessage::system("first"),
            ChatMessage::user("hello"),
            ChatMessage::system("second"),
            ChatMessage::assistant("hi"),
        ];
        let response = svc.chat(&messages, TextRequest::default()).await.unwrap();
        assert!(response.text.starts_with("[second]"));
        assert!(response.text.contains("User: hello"));
        assert!(response.text.contains("Assistant: hi"));
        assert!(!response.text.contains("System: first"));
    }
}
