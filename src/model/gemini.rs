//! Gemini `generateContent` strategy.
//!
//! Gemini keeps no server-side conversation history, so every call resends
//! the full transcript. There is also no dedicated system role in this
//! usage: the instruction text is folded into the first user content. The
//! client reads the first candidate only, but surfaces every functionCall
//! part of it in order; this multi-call policy is a deliberate provider
//! behavior difference from the OpenAI strategy.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::conversation::{ConversationState, Turn};
use crate::tools::{self, ToolInvocationRequest};

use super::{ModelClient, ModelTurnResult, ProviderError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn send(&self, state: &mut ConversationState) -> Result<ModelTurnResult, ProviderError> {
        let body = build_request(state);

        let response = self
            .http
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the structured error message when the body carries one.
            let body = serde_json::from_str::<ErrorPayload>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        parse_payload(&payload)
    }
}

/// Serialize the full transcript into a `generateContent` request body.
/// The model itself is addressed in the URL, not the body.
fn build_request(state: &ConversationState) -> Value {
    let mut contents: Vec<Value> = Vec::new();
    let mut pending_system: Vec<&str> = Vec::new();

    for turn in state.turns() {
        match turn {
            // No system role: stash instruction text and fold it into the
            // next user content.
            Turn::System(text) => pending_system.push(text),
            Turn::User(text) => {
                let full = if pending_system.is_empty() {
                    text.clone()
                } else {
                    let folded = format!(
                        "{}\n\nUser prompt: {}",
                        pending_system.join("\n"),
                        text
                    );
                    pending_system.clear();
                    folded
                };
                contents.push(json!({"role": "user", "parts": [{"text": full}]}));
            }
            Turn::ModelMessage(text) => {
                contents.push(json!({"role": "model", "parts": [{"text": text}]}));
            }
            Turn::ToolCall(request) => {
                contents.push(json!({
                    "role": "model",
                    "parts": [{
                        "functionCall": {"name": request.name, "args": request.args}
                    }]
                }));
            }
            Turn::ToolResult { call, output } => {
                contents.push(json!({
                    "role": "tool",
                    "parts": [{
                        "functionResponse": {
                            "name": call,
                            "response": {"output": {"result": output}}
                        }
                    }]
                }));
            }
        }
    }

    json!({
        "contents": contents,
        "tools": [{"functionDeclarations": function_declarations()}],
        "toolConfig": {"functionCallingConfig": {"mode": "AUTO"}},
    })
}

/// The catalog in Gemini function declaration shape.
fn function_declarations() -> Vec<Value> {
    tools::all_declarations()
        .iter()
        .map(|decl| {
            let mut declaration = json!({
                "name": decl.name.as_str(),
                "description": decl.description,
            });
            if !decl.params.is_empty() {
                let mut properties = Map::new();
                for param in decl.params {
                    properties.insert(
                        param.name.to_string(),
                        json!({"type": param.kind.as_str(), "description": param.description}),
                    );
                }
                declaration["parameters"] = json!({
                    "type": "object",
                    "properties": properties,
                    "required": decl.required,
                });
            }
            declaration
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct GenerateContentPayload {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCallPart>,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPart {
    name: String,
    args: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Decode a response payload from the first candidate.
///
/// Function calls take precedence over text parts: a message is terminal
/// only when the candidate carries no calls at all.
fn parse_payload(payload: &GenerateContentPayload) -> Result<ModelTurnResult, ProviderError> {
    let parts = payload
        .candidates
        .as_ref()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .ok_or(ProviderError::EmptyResponse)?;

    let calls: Vec<ToolInvocationRequest> = parts
        .iter()
        .filter_map(|part| part.function_call.as_ref())
        .map(|call| {
            ToolInvocationRequest::new(None, call.name.clone(), call.args.clone().unwrap_or_default())
        })
        .collect();

    if !calls.is_empty() {
        return Ok(ModelTurnResult::ToolCalls(calls));
    }

    parts
        .iter()
        .find_map(|part| part.text.clone())
        .map(ModelTurnResult::FinalMessage)
        .ok_or(ProviderError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_prompt() -> ConversationState {
        let mut state = ConversationState::new();
        state.push(Turn::System("You are an assistant.".to_string()));
        state.push(Turn::User("open settings".to_string()));
        state
    }

    #[test]
    fn test_build_request_folds_system_into_first_user_content() {
        let body = build_request(&state_with_prompt());

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        let text = contents[0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("You are an assistant."));
        assert!(text.ends_with("User prompt: open settings"));

        let declarations = body["tools"][0]["functionDeclarations"].as_array().unwrap();
        assert_eq!(declarations.len(), 6);
        assert!(declarations[1].get("parameters").is_none());
        assert_eq!(
            body["toolConfig"]["functionCallingConfig"]["mode"],
            "AUTO"
        );
    }

    #[test]
    fn test_build_request_resends_full_transcript() {
        let mut state = state_with_prompt();
        let mut args = Map::new();
        args.insert("bundle_identifier".to_string(), json!("com.apple.Preferences"));
        state.push(Turn::ToolCall(ToolInvocationRequest::new(
            None, "openApp", args,
        )));
        state.push(Turn::ToolResult {
            call: "openApp".to_string(),
            output: "Settings,label:Settings".to_string(),
        });

        let body = build_request(&state);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "openApp");
        assert_eq!(contents[2]["role"], "tool");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["output"]["result"],
            "Settings,label:Settings"
        );
    }

    #[test]
    fn test_parse_payload_surfaces_every_call_in_order() {
        let raw = r#"{
          "candidates": [{
            "content": {
              "role": "model",
              "parts": [
                {"functionCall": {"name": "openApp", "args": {"bundle_identifier": "com.apple.Preferences"}}},
                {"functionCall": {"name": "fetchAccessibilityTree"}}
              ]
            },
            "finishReason": "STOP"
          }]
        }"#;
        let payload: GenerateContentPayload = serde_json::from_str(raw).unwrap();
        match parse_payload(&payload).unwrap() {
            ModelTurnResult::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].name, "openApp");
                assert_eq!(calls[0].call_id, None);
                assert_eq!(calls[1].name, "fetchAccessibilityTree");
                assert!(calls[1].args.is_empty());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_payload_calls_take_precedence_over_text() {
        let raw = r#"{
          "candidates": [{
            "content": {
              "parts": [
                {"text": "Let me open that."},
                {"functionCall": {"name": "openApp", "args": {"bundle_identifier": "com.apple.camera"}}}
              ]
            }
          }]
        }"#;
        let payload: GenerateContentPayload = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            parse_payload(&payload).unwrap(),
            ModelTurnResult::ToolCalls(calls) if calls.len() == 1
        ));
    }

    #[test]
    fn test_parse_payload_text_only_is_terminal() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "Settings is open."}]}}]}"#;
        let payload: GenerateContentPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parse_payload(&payload).unwrap(),
            ModelTurnResult::FinalMessage("Settings is open.".to_string())
        );
    }

    #[test]
    fn test_parse_payload_no_candidates() {
        let payload: GenerateContentPayload = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            parse_payload(&payload),
            Err(ProviderError::EmptyResponse)
        ));
    }
}
