//! OpenAI Responses API strategy.
//!
//! Relies on provider-side conversation history: each call sends only the
//! turns appended since the previous round trip plus the
//! `previous_response_id` continuation token. Requests are made with
//! `parallel_tool_calls: false` and the client surfaces at most one tool
//! invocation per turn; this single-call policy is a deliberate provider
//! behavior difference from the Gemini strategy.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::conversation::{ConversationState, Turn};
use crate::tools::{self, ToolInvocationRequest};

use super::{ModelClient, ModelTurnResult, ProviderError};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/responses";

/// Client for the OpenAI Responses API.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the endpoint, for OpenAI-compatible gateways.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn send(&self, state: &mut ConversationState) -> Result<ModelTurnResult, ProviderError> {
        let body = build_request(&self.model, state);

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ResponsesPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let result = parse_payload(&payload)?;
        state.mark_synced(payload.id);
        Ok(result)
    }
}

/// Serialize the unsynced tail of the transcript into a Responses API
/// request body.
fn build_request(model: &str, state: &ConversationState) -> Value {
    let input: Vec<Value> = state
        .unsynced()
        .iter()
        .filter_map(|turn| match turn {
            Turn::System(text) => Some(json!({"role": "system", "content": text})),
            Turn::User(text) => Some(json!({"role": "user", "content": text})),
            Turn::ToolResult { call, output } => Some(json!({
                "type": "function_call_output",
                "call_id": call,
                "output": output,
            })),
            // The server-side history already contains the model's own
            // output items; resending them is rejected.
            Turn::ModelMessage(_) | Turn::ToolCall(_) => None,
        })
        .collect();

    let mut body = json!({
        "model": model,
        "input": input,
        "tools": tool_definitions(),
        "tool_choice": "auto",
        "parallel_tool_calls": false,
    });
    if let Some(token) = state.continuation() {
        body["previous_response_id"] = json!(token);
    }
    body
}

/// The catalog in Responses API tool shape.
fn tool_definitions() -> Vec<Value> {
    tools::all_declarations()
        .iter()
        .map(|decl| {
            let parameters = if decl.params.is_empty() {
                Value::Null
            } else {
                let mut properties = Map::new();
                for param in decl.params {
                    properties.insert(
                        param.name.to_string(),
                        json!({"type": param.kind.as_str(), "description": param.description}),
                    );
                }
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": decl.required,
                })
            };
            json!({
                "type": "function",
                "name": decl.name.as_str(),
                "description": decl.description,
                "parameters": parameters,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ResponsesPayload {
    id: String,
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    FunctionCall {
        call_id: String,
        name: String,
        arguments: Option<String>,
    },
    Message {
        content: Vec<ContentPart>,
    },
    /// Reasoning items and other output kinds this client does not act on.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Decode a response payload, acting on the first usable output item.
fn parse_payload(payload: &ResponsesPayload) -> Result<ModelTurnResult, ProviderError> {
    for item in &payload.output {
        match item {
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                // Undecodable argument JSON is a tool-level problem for the
                // loop to report back to the model, not a provider failure.
                let args = arguments
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
                    .unwrap_or_default();
                return Ok(ModelTurnResult::ToolCalls(vec![ToolInvocationRequest::new(
                    Some(call_id.clone()),
                    name.clone(),
                    args,
                )]));
            }
            OutputItem::Message { content } => {
                if let Some(text) = content
                    .iter()
                    .find(|part| part.kind == "output_text")
                    .and_then(|part| part.text.clone())
                {
                    return Ok(ModelTurnResult::FinalMessage(text));
                }
            }
            OutputItem::Other => {}
        }
    }
    Err(ProviderError::EmptyResponse)
}
